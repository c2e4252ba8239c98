//! User-supplied init files, processed once on a fresh data directory.
//!
//! Files run in lexical name order. Executable `.sh` files run as children;
//! other `.sh` files are sourced by the configured shell with the entrypoint's
//! environment; SQL files (plain or compressed) stream into a [`SqlSink`].
//! Anything else is skipped with a warning.
//!
//! Sourcing happens in a child shell: a sourced script reads the exported
//! credentials and connection variables, but anything it exports or changes ends
//! with that shell. Later files and the bootstrap steps that follow (password
//! expiry, shutdown) keep using the credentials resolved at startup.

pub mod client;
pub mod kind;

pub use client::{MysqlClient, SqlSink};
pub use kind::{Compression, InitFileKind, classify};

use crate::error::EntrypointError;
use crate::process::ChildEnv;
use std::fs::{self, File};
use std::io::BufReader;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Ran(PathBuf),
    Sourced(PathBuf),
    Streamed(PathBuf),
    Ignored(PathBuf),
}

impl InitOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Ran(p) | Self::Sourced(p) | Self::Streamed(p) | Self::Ignored(p) => p,
        }
    }
}

pub struct InitRunner<'a> {
    dir: &'a Path,
    shell: &'a str,
    env: &'a ChildEnv,
}

impl<'a> InitRunner<'a> {
    pub fn new(dir: &'a Path, shell: &'a str, env: &'a ChildEnv) -> Self {
        Self { dir, shell, env }
    }

    /// Entries sorted by file name. A missing directory means no init files.
    pub fn entries(&self) -> Result<Vec<PathBuf>, EntrypointError> {
        if !self.dir.exists() {
            info!(path = %self.dir.display(), "init directory not found; skipping");
            return Ok(Vec::new());
        }
        let mut paths = fs::read_dir(self.dir)
            .and_then(|entries| {
                entries
                    .map(|entry| entry.map(|e| e.path()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|e| failure(self.dir, e))?;
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }

    pub async fn run<S: SqlSink>(&self, sink: &mut S) -> Result<Vec<InitOutcome>, EntrypointError> {
        let mut outcomes = Vec::new();
        for path in self.entries()? {
            outcomes.push(self.process(&path, sink).await?);
        }
        Ok(outcomes)
    }

    pub async fn process<S: SqlSink>(
        &self,
        path: &Path,
        sink: &mut S,
    ) -> Result<InitOutcome, EntrypointError> {
        let kind = if path.is_file() {
            classify(path)
        } else {
            InitFileKind::Unrecognized
        };

        match kind {
            InitFileKind::Shell if is_executable(path).map_err(|e| failure(path, e))? => {
                info!("running {}", path.display());
                self.run_script(path).await?;
                Ok(InitOutcome::Ran(path.to_path_buf()))
            }
            InitFileKind::Shell => {
                info!("sourcing {}", path.display());
                self.source_script(path).await?;
                Ok(InitOutcome::Sourced(path.to_path_buf()))
            }
            InitFileKind::Sql(compression) => {
                info!("running {}", path.display());
                let file = File::open(path).map_err(|e| failure(path, e))?;
                let mut reader = compression.decoder(BufReader::new(file));
                sink.stream_sql(path, &mut reader).await?;
                Ok(InitOutcome::Streamed(path.to_path_buf()))
            }
            InitFileKind::Unrecognized => {
                warn!("ignoring {}", path.display());
                Ok(InitOutcome::Ignored(path.to_path_buf()))
            }
        }
    }

    async fn run_script(&self, path: &Path) -> Result<(), EntrypointError> {
        let status = self
            .env
            .command(path)
            .stdin(Stdio::null())
            .status()
            .await;
        check(path, status)
    }

    /// `set -Eeo pipefail` applies to the sourced file as it would in the caller.
    async fn source_script(&self, path: &Path) -> Result<(), EntrypointError> {
        let status = self
            .env
            .command(self.shell)
            .arg("-c")
            .arg("set -Eeo pipefail; . \"$1\"")
            .arg("entrypoint")
            .arg(path)
            .stdin(Stdio::null())
            .status()
            .await;
        check(path, status)
    }
}

fn is_executable(path: &Path) -> std::io::Result<bool> {
    Ok(fs::metadata(path)?.permissions().mode() & 0o111 != 0)
}

fn failure(path: &Path, err: std::io::Error) -> EntrypointError {
    EntrypointError::InitScriptFailure {
        path: path.to_path_buf(),
        detail: err.to_string(),
    }
}

fn check(
    path: &Path,
    status: std::io::Result<std::process::ExitStatus>,
) -> Result<(), EntrypointError> {
    match status {
        Ok(s) if s.success() => Ok(()),
        Ok(s) => Err(EntrypointError::InitScriptFailure {
            path: path.to_path_buf(),
            detail: format!("exited with {s}"),
        }),
        Err(e) => Err(failure(path, e)),
    }
}
