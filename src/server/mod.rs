//! Everything that talks to the server binary directly.
//!
//! Layout:
//! - `command.rs`: argument normalisation and the help/version short-circuit
//! - `introspect.rs`: effective configuration from `--verbose --help`
//! - `socket.rs`: default-socket symlink reconciliation
//! - `temporary.rs`: data directory initialisation and the bootstrap-only instance

pub mod command;
pub mod introspect;
pub mod socket;
pub mod temporary;

pub use command::ServerCommand;
pub use introspect::{HelpValues, ServerConfig};
pub use socket::SocketLink;
pub use temporary::{ServerState, TemporaryServer};
