//! Terminal step: drop privileges by re-invoking the entrypoint, or replace the
//! process image with the server. Nothing after a successful handoff runs.

use crate::error::EntrypointError;
use crate::process::ChildEnv;
use crate::server::ServerCommand;
use nix::unistd::{User, geteuid};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;

/// Unprivileged identity the server runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

impl ServiceAccount {
    pub fn lookup(name: &str) -> Result<Self, EntrypointError> {
        let user = User::from_name(name)?
            .ok_or_else(|| EntrypointError::UnknownServiceUser(name.to_string()))?;
        Ok(Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
        })
    }
}

pub fn running_privileged() -> bool {
    geteuid().is_root()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    /// Run this same entrypoint again as the service account with the same arguments.
    ReexecAsServiceUser {
        account: ServiceAccount,
        entrypoint: PathBuf,
        argv: Vec<String>,
    },
    /// Replace the process with the final command.
    Exec(ServerCommand),
}

impl Handoff {
    /// Only returns when the exec itself failed.
    pub fn perform(self, env: &ChildEnv) -> EntrypointError {
        match self {
            Handoff::ReexecAsServiceUser {
                account,
                entrypoint,
                argv,
            } => {
                let err = env
                    .std_command(&entrypoint)
                    .args(argv)
                    .uid(account.uid)
                    .gid(account.gid)
                    .env("HOME", &account.home)
                    .env("USER", &account.name)
                    .exec();
                EntrypointError::Handoff {
                    program: entrypoint.display().to_string(),
                    source: err,
                }
            }
            Handoff::Exec(command) => {
                let err = env
                    .std_command(command.program())
                    .args(command.args())
                    .exec();
                EntrypointError::Handoff {
                    program: command.program().to_string(),
                    source: err,
                }
            }
        }
    }
}
