//! The network-isolated server instance that exists only while bootstrap SQL runs.

use super::command::ServerCommand;
use crate::error::EntrypointError;
use crate::process::ChildEnv;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    NotStarted,
    Starting,
    Running,
    StoppingRequested,
    Stopped,
    Failed,
}

/// Create the system schema in an empty data directory.
pub async fn initialize_data_dir(
    command: &ServerCommand,
    env: &ChildEnv,
) -> Result<(), EntrypointError> {
    let extra = [
        "--initialize-insecure".to_string(),
        "--default-time-zone=SYSTEM".to_string(),
    ];
    let status = command
        .command(env, &extra)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| {
            EntrypointError::TemporaryServerFailure(format!(
                "Unable to initialize database files: {e}"
            ))
        })?;
    if !status.success() {
        return Err(EntrypointError::TemporaryServerFailure(format!(
            "Unable to initialize database files ({status})"
        )));
    }
    Ok(())
}

pub struct TemporaryServer<'a> {
    command: &'a ServerCommand,
    env: &'a ChildEnv,
    admin: String,
    socket: PathBuf,
    state: ServerState,
}

impl<'a> TemporaryServer<'a> {
    pub fn new(
        command: &'a ServerCommand,
        env: &'a ChildEnv,
        admin: impl Into<String>,
        socket: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command,
            env,
            admin: admin.into(),
            socket: socket.into(),
            state: ServerState::NotStarted,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Start daemonized with networking off. `--daemonize` makes the launcher exit
    /// only once the server accepts connections, so its exit status is the readiness
    /// signal.
    pub async fn start(&mut self) -> Result<(), EntrypointError> {
        if self.state != ServerState::NotStarted {
            return Err(EntrypointError::TemporaryServerFailure(format!(
                "cannot start temporary server from state {:?}",
                self.state
            )));
        }
        self.state = ServerState::Starting;

        let extra = [
            "--daemonize".to_string(),
            "--skip-networking".to_string(),
            "--default-time-zone=SYSTEM".to_string(),
            format!("--socket={}", self.socket.display()),
        ];
        debug!(socket = %self.socket.display(), "launching temporary server");
        // Inherited stdio: the daemon keeps its descriptors, piping them would never hit EOF.
        let status = self
            .command
            .command(self.env, &extra)
            .stdin(Stdio::null())
            .status()
            .await;

        match status {
            Ok(s) if s.success() => {
                self.state = ServerState::Running;
                Ok(())
            }
            Ok(s) => {
                self.state = ServerState::Failed;
                Err(EntrypointError::TemporaryServerFailure(format!(
                    "Unable to start server ({s})"
                )))
            }
            Err(e) => {
                self.state = ServerState::Failed;
                Err(EntrypointError::TemporaryServerFailure(format!(
                    "Unable to start server: {e}"
                )))
            }
        }
    }

    /// Shut down through the admin client as root on the private socket.
    pub async fn stop(&mut self, root_password: &str) -> Result<(), EntrypointError> {
        if self.state != ServerState::Running {
            return Err(EntrypointError::TemporaryServerFailure(format!(
                "cannot stop temporary server from state {:?}",
                self.state
            )));
        }
        self.state = ServerState::StoppingRequested;

        let mut cmd = self.env.command(&self.admin);
        cmd.arg("shutdown")
            .arg("-uroot")
            .arg(format!("--socket={}", self.socket.display()))
            .stdin(Stdio::null());
        if root_password.is_empty() {
            cmd.env_remove("MYSQL_PWD");
        } else {
            cmd.env("MYSQL_PWD", root_password);
        }

        match cmd.status().await {
            Ok(s) if s.success() => {
                self.state = ServerState::Stopped;
                info!("Temporary server stopped");
                Ok(())
            }
            Ok(s) => {
                self.state = ServerState::Failed;
                Err(EntrypointError::TemporaryServerFailure(format!(
                    "Unable to shut down server ({s})"
                )))
            }
            Err(e) => {
                self.state = ServerState::Failed;
                Err(EntrypointError::TemporaryServerFailure(format!(
                    "Unable to shut down server: {e}"
                )))
            }
        }
    }
}

impl Drop for TemporaryServer<'_> {
    fn drop(&mut self) {
        if matches!(
            self.state,
            ServerState::Running | ServerState::StoppingRequested
        ) {
            warn!(
                socket = %self.socket.display(),
                "temporary server left running after an aborted bootstrap"
            );
        }
    }
}
