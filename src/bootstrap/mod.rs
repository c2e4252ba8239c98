//! Bootstrap SQL: typed statements, the fixed sequence, and the session that applies it.

pub mod sequencer;
pub mod session;
pub mod sql;
pub mod timezone;

pub use sequencer::{RootPassword, bootstrap_batch, expiry_batch};
pub use session::BootstrapSession;
pub use sql::{Account, GrantScope, Privileges, SqlBatch, Statement};
