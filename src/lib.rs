pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod directories;
pub mod entrypoint;
pub mod error;
pub mod handoff;
pub mod initdb;
pub mod process;
pub mod server;

pub use config::Config;
pub use entrypoint::{Entrypoint, InitializationState, Outcome};
pub use error::EntrypointError;
pub use handoff::Handoff;
