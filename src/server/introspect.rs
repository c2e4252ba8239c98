//! Effective server configuration, read from `--verbose --help`.
//!
//! The tail of that output is a two column table (`name value`) below a dashed
//! separator. Lines that start with whitespace belong to option descriptions and
//! are ignored; the first occurrence of a key wins.

use super::command::ServerCommand;
use crate::error::EntrypointError;
use crate::process::{ChildEnv, one_line};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tracing::debug;

/// Values the server prints for "not configured".
pub const ABSENT_SENTINELS: &[&str] = &["NULL", "(No default value)"];

/// Parsed key/value view of the help output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpValues {
    values: HashMap<String, String>,
}

impl HelpValues {
    pub fn parse(output: &str) -> Self {
        let lines: Vec<&str> = output.lines().collect();
        let start = lines
            .iter()
            .rposition(|l| is_separator(l))
            .map_or(0, |idx| idx + 1);

        let mut values = HashMap::new();
        for line in &lines[start..] {
            if line.starts_with(char::is_whitespace) {
                continue;
            }
            let Some((key, rest)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            let value = rest.trim();
            if value.is_empty() || ABSENT_SENTINELS.contains(&value) {
                continue;
            }
            values
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
        Self { values }
    }

    /// Case-sensitive lookup; absent when unset or reported as a sentinel.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.contains('-') && trimmed.chars().all(|c| c == '-' || c == ' ')
}

/// Effective server paths. Derived once per run; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub socket: PathBuf,
    pub general_log_file: Option<PathBuf>,
    pub pid_file: Option<PathBuf>,
    pub secure_file_priv: Option<PathBuf>,
    pub slow_query_log_file: Option<PathBuf>,
    pub keyring_file_data: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_values(program: &str, values: &HelpValues) -> Result<Self, EntrypointError> {
        let required = |key: &str| {
            values
                .path(key)
                .ok_or_else(|| EntrypointError::IntrospectionFailure {
                    command: program.to_string(),
                    detail: format!("help output does not report `{key}`"),
                })
        };
        Ok(Self {
            data_dir: required("datadir")?,
            socket: required("socket")?,
            general_log_file: values.path("general-log-file"),
            pid_file: values.path("pid-file"),
            secure_file_priv: values.path("secure-file-priv"),
            slow_query_log_file: values.path("slow-query-log-file"),
            keyring_file_data: values.path("keyring_file_data"),
        })
    }

    /// `<datadir>/mysql` only exists once the system schema has been created.
    pub fn is_initialized(&self) -> bool {
        self.data_dir.join("mysql").is_dir()
    }
}

/// Run the server in help mode with the user's arguments. A failure here usually
/// means a broken option in the configuration, so the server's stderr is surfaced.
pub async fn introspect(
    command: &ServerCommand,
    env: &ChildEnv,
) -> Result<HelpValues, EntrypointError> {
    let probe_index =
        std::env::temp_dir().join(format!("entrypoint-check-{}.index", std::process::id()));
    let extra = [
        "--verbose".to_string(),
        "--help".to_string(),
        format!("--log-bin-index={}", probe_index.display()),
    ];
    run_help(command.command(env, &extra), command.program()).await
}

/// The socket path compiled into the server, ignoring every option file.
pub async fn default_socket(
    program: &str,
    env: &ChildEnv,
) -> Result<Option<PathBuf>, EntrypointError> {
    let mut cmd = env.command(program);
    cmd.args(["--no-defaults", "--verbose", "--help"]);
    Ok(run_help(cmd, program).await?.path("socket"))
}

async fn run_help(
    mut cmd: tokio::process::Command,
    program: &str,
) -> Result<HelpValues, EntrypointError> {
    let failure = |detail: String| EntrypointError::IntrospectionFailure {
        command: program.to_string(),
        detail,
    };
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| failure(e.to_string()))?;
    if !output.status.success() {
        return Err(failure(format!(
            "{}: {}",
            output.status,
            one_line(&output.stderr)
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let values = HelpValues::parse(&stdout);
    if values.is_empty() {
        return Err(failure("help output contained no configuration values".to_string()));
    }
    debug!(count = values.len(), "parsed server configuration values");
    Ok(values)
}
