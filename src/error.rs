use std::path::PathBuf;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum EntrypointError {
    #[error("both {name} and {name}_FILE are set (but are exclusive)")]
    ConfigConflict { name: String },

    #[error("failed to read {name}_FILE from {}: {source}", path.display())]
    CredentialFile {
        name: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Database is uninitialized and password option is not specified; \
         you need to specify one of MYSQL_ROOT_PASSWORD, MYSQL_ALLOW_EMPTY_PASSWORD \
         and MYSQL_RANDOM_ROOT_PASSWORD"
    )]
    MissingCredential,

    #[error("{0}")]
    InvalidCredential(String),

    #[error("{command} failed while attempting to check config: {detail}")]
    IntrospectionFailure { command: String, detail: String },

    #[error("unable to prepare directory {}: {source}", path.display())]
    DirectoryPreparation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    TemporaryServerFailure(String),

    #[error("bootstrap statement `{label}` failed: {detail}")]
    SqlBatchFailure { label: String, detail: String },

    #[error("cannot grant to {account} before it is created or altered in the same batch")]
    UnmaterializedAccount { account: String },

    #[error("init file {} failed: {detail}", path.display())]
    InitScriptFailure { path: PathBuf, detail: String },

    #[error("service account '{0}' does not exist")]
    UnknownServiceUser(String),

    #[error("handoff to {program} failed: {source}")]
    Handoff {
        program: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] figment::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("System error: {0}")]
    Errno(#[from] nix::errno::Errno),
}

impl EntrypointError {
    /// Short taxonomy tag, stable across message wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigConflict { .. } => "ConfigConflict",
            Self::CredentialFile { .. } | Self::InvalidCredential(_) => "InvalidCredential",
            Self::MissingCredential => "MissingCredential",
            Self::IntrospectionFailure { .. } => "IntrospectionFailure",
            Self::DirectoryPreparation { .. } => "DirectoryPreparation",
            Self::TemporaryServerFailure(_) => "TemporaryServerFailure",
            Self::SqlBatchFailure { .. } | Self::UnmaterializedAccount { .. } | Self::Database(_) => {
                "SQLBatchFailure"
            }
            Self::InitScriptFailure { .. } => "InitScriptFailure",
            Self::UnknownServiceUser(_) | Self::Handoff { .. } | Self::Errno(_) => "Handoff",
            Self::Io(_) => "Io",
            Self::Config(_) => "Config",
        }
    }
}
