//! Boot state machine: resolve credentials, introspect, prepare directories,
//! bootstrap a fresh data directory through the temporary server, then decide
//! how to hand off.

use crate::bootstrap::{
    BootstrapSession, RootPassword, bootstrap_batch, expiry_batch, timezone::time_zone_sql,
};
use crate::config::Config;
use crate::credentials::{CredentialSet, EnvSnapshot};
use crate::directories;
use crate::error::EntrypointError;
use crate::handoff::{Handoff, ServiceAccount, running_privileged};
use crate::initdb::{InitOutcome, InitRunner, MysqlClient};
use crate::process::ChildEnv;
use crate::server::{
    ServerCommand, ServerConfig, SocketLink, TemporaryServer, introspect, socket,
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializationState {
    /// `<datadir>/mysql` exists; nothing is bootstrapped.
    Initialized,
    Fresh,
}

impl InitializationState {
    pub fn detect(cfg: &ServerConfig) -> Self {
        if cfg.is_initialized() {
            Self::Initialized
        } else {
            Self::Fresh
        }
    }
}

/// What a run decided, plus the environment the handoff must apply.
#[derive(Debug)]
pub struct Outcome {
    pub handoff: Handoff,
    pub env: ChildEnv,
    /// `None` when the command was not a server start.
    pub state: Option<InitializationState>,
    pub init_files: Vec<InitOutcome>,
}

pub struct Entrypoint<'a> {
    config: &'a Config,
    env: &'a EnvSnapshot,
    privileged: bool,
    entrypoint_path: Option<PathBuf>,
}

impl<'a> Entrypoint<'a> {
    pub fn new(config: &'a Config, env: &'a EnvSnapshot) -> Self {
        Self {
            config,
            env,
            privileged: running_privileged(),
            entrypoint_path: None,
        }
    }

    /// Override privilege detection.
    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Program re-invoked after dropping privileges; defaults to the current executable.
    pub fn entrypoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.entrypoint_path = Some(path.into());
        self
    }

    pub async fn run(&self, args: Vec<String>) -> Result<Outcome, EntrypointError> {
        let command = ServerCommand::from_args(args, &self.config.server_command);
        if !command.is_server_start(&self.config.server_command) {
            return Ok(Outcome {
                handoff: Handoff::Exec(command),
                env: ChildEnv::default(),
                state: None,
                init_files: Vec::new(),
            });
        }
        info!("Entrypoint script for {} started", command.program());

        // Resolution only reads; running it first keeps `*_FILE` out of every child.
        let resolved = CredentialSet::resolve(self.env)?;
        let creds = resolved.credentials;
        let child_env = ChildEnv::scrubbing(resolved.cleared);

        let values = introspect::introspect(&command, &child_env).await?;
        let server = ServerConfig::from_values(command.program(), &values)?;

        let state = InitializationState::detect(&server);
        if state == InitializationState::Fresh {
            creds.validate_for_fresh()?;
        }

        let owner = if self.privileged {
            Some(ServiceAccount::lookup(&self.config.service_user)?)
        } else {
            None
        };
        directories::prepare(&server, owner.as_ref())?;

        if let Some(account) = owner {
            info!("Switching to dedicated user '{}'", account.name);
            let entrypoint = match &self.entrypoint_path {
                Some(p) => p.clone(),
                None => std::env::current_exe()?,
            };
            // The re-invoked process resolves again; file-sourced values go as literals.
            let reexec_env = creds
                .file_sourced(child_env.removed())
                .into_iter()
                .fold(child_env, |env, (name, value)| env.with_var(name, value));
            return Ok(Outcome {
                handoff: Handoff::ReexecAsServiceUser {
                    account,
                    entrypoint,
                    argv: command.argv(),
                },
                env: reexec_env,
                state: Some(state),
                init_files: Vec::new(),
            });
        }

        let init_files = match state {
            InitializationState::Initialized => {
                self.reconcile_socket(&command, &server, &child_env).await;
                Vec::new()
            }
            InitializationState::Fresh => {
                self.bootstrap(&command, &server, &creds, &child_env).await?
            }
        };

        Ok(Outcome {
            handoff: Handoff::Exec(command),
            env: child_env,
            state: Some(state),
            init_files,
        })
    }

    async fn bootstrap(
        &self,
        command: &ServerCommand,
        server: &ServerConfig,
        creds: &CredentialSet,
        env: &ChildEnv,
    ) -> Result<Vec<InitOutcome>, EntrypointError> {
        info!("Initializing database files");
        crate::server::temporary::initialize_data_dir(command, env).await?;
        info!("Database files initialized");

        info!("Starting temporary server");
        let mut temp = TemporaryServer::new(command, env, &self.config.admin, &server.socket);
        temp.start().await?;
        info!("Temporary server started");

        self.reconcile_socket(command, server, env).await;

        let root = RootPassword::resolve(creds);
        if root.is_generated() {
            info!("GENERATED ROOT PASSWORD: {}", root.value());
        }

        let tz_sql = if creds.skip_tzinfo {
            None
        } else {
            let program = &self.config.tzinfo_to_sql;
            Some(time_zone_sql(program, &self.config.zoneinfo_dir, env).await?)
        };
        let batch = bootstrap_batch(creds, &root, tz_sql)?;

        let mut session = BootstrapSession::connect(&server.socket, None).await?;
        session.apply(&batch).await?;

        let mut script_env = env
            .clone()
            .with_var("MYSQL_UNIX_PORT", server.socket.display().to_string());
        for (key, value) in creds.exports() {
            script_env = script_env.with_var(key, value);
        }
        if !root.value().is_empty() {
            script_env = script_env
                .with_var(crate::credentials::ROOT_PASSWORD, root.value())
                .with_var("MYSQL_PWD", root.value());
        }

        let mut client = MysqlClient::new(
            self.config.client.clone(),
            &server.socket,
            creds.app_database.clone(),
            &script_env,
        );
        let init_files = InitRunner::new(&self.config.init_dir, &self.config.shell, &script_env)
            .run(&mut client)
            .await?;

        if creds.onetime_password_expiry {
            session.apply(&expiry_batch(creds)).await?;
        }
        session.close().await?;

        info!("Stopping temporary server");
        temp.stop(root.value()).await?;

        info!("Init process done. Ready for start up");
        Ok(init_files)
    }

    /// Failure here is logged only; the explicit socket argument still works.
    async fn reconcile_socket(
        &self,
        command: &ServerCommand,
        server: &ServerConfig,
        env: &ChildEnv,
    ) {
        let default = match introspect::default_socket(command.program(), env).await {
            Ok(Some(path)) => path,
            Ok(None) => return,
            Err(e) => {
                warn!("could not determine default socket: {e}");
                return;
            }
        };
        match socket::reconcile(&server.socket, &default) {
            Ok(SocketLink::Linked { link, target }) => {
                info!("linked {} -> {}", link.display(), target.display());
            }
            Ok(SocketLink::Unchanged) => {}
            Err(e) => warn!(
                "could not link {} -> {}: {e}",
                default.display(),
                server.socket.display()
            ),
        }
    }
}
