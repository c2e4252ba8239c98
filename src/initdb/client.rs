use crate::error::EntrypointError;
use crate::process::{ChildEnv, one_line};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;

const CHUNK: usize = 64 * 1024;

/// Destination for the SQL content of init files.
#[allow(async_fn_in_trait)]
pub trait SqlSink {
    /// Consume `reader` as one SQL script. `origin` names the file for diagnostics.
    async fn stream_sql(&mut self, origin: &Path, reader: &mut dyn Read)
    -> Result<(), EntrypointError>;
}

/// The command-line client against the temporary server's private socket, so
/// client-side directives (`DELIMITER`, `SOURCE`) keep working in user files.
pub struct MysqlClient<'a> {
    program: String,
    socket: PathBuf,
    database: Option<String>,
    env: &'a ChildEnv,
}

impl<'a> MysqlClient<'a> {
    pub fn new(
        program: impl Into<String>,
        socket: impl Into<PathBuf>,
        database: Option<String>,
        env: &'a ChildEnv,
    ) -> Self {
        Self {
            program: program.into(),
            socket: socket.into(),
            database,
            env,
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--protocol=socket".to_string(),
            "-uroot".to_string(),
            "-hlocalhost".to_string(),
            format!("--socket={}", self.socket.display()),
            "--comments".to_string(),
        ];
        if let Some(db) = &self.database {
            args.push(format!("--database={db}"));
        }
        args
    }
}

impl SqlSink for MysqlClient<'_> {
    async fn stream_sql(
        &mut self,
        origin: &Path,
        reader: &mut dyn Read,
    ) -> Result<(), EntrypointError> {
        let failure = |detail: String| EntrypointError::InitScriptFailure {
            path: origin.to_path_buf(),
            detail,
        };

        let mut child = self
            .env
            .command(&self.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failure(format!("{}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| failure("client stdin unavailable".to_string()))?;
        let mut buf = vec![0u8; CHUNK];
        let pumped: std::io::Result<()> = async {
            loop {
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                stdin.write_all(&buf[..n]).await?;
            }
            stdin.shutdown().await
        }
        .await;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| failure(e.to_string()))?;
        if !output.status.success() {
            return Err(failure(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                one_line(&output.stderr)
            )));
        }
        pumped.map_err(|e| failure(format!("streaming failed: {e}")))
    }
}
