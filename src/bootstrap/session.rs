use super::sql::SqlBatch;
use crate::error::EntrypointError;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlSslMode};
use sqlx::{ConnectOptions, Connection};
use std::path::Path;
use tracing::debug;

/// One root connection to the temporary server over its private socket.
pub struct BootstrapSession {
    conn: MySqlConnection,
}

impl BootstrapSession {
    /// Right after `--initialize-insecure` root has no password.
    pub async fn connect(socket: &Path, password: Option<&str>) -> Result<Self, EntrypointError> {
        let mut opts = MySqlConnectOptions::new()
            .socket(socket)
            .username("root")
            .ssl_mode(MySqlSslMode::Disabled);
        if let Some(pw) = password.filter(|pw| !pw.is_empty()) {
            opts = opts.password(pw);
        }
        let conn = opts.connect().await?;
        debug!(socket = %socket.display(), "bootstrap session opened");
        Ok(Self { conn })
    }

    /// Execute statements in order over the text protocol. The first failure stops
    /// the batch; nothing is retried or rolled back.
    pub async fn apply(&mut self, batch: &SqlBatch) -> Result<(), EntrypointError> {
        for stmt in batch {
            let sql = stmt.to_sql();
            sqlx::raw_sql(&sql)
                .execute(&mut self.conn)
                .await
                .map_err(|e| EntrypointError::SqlBatchFailure {
                    label: stmt.label(),
                    detail: e.to_string(),
                })?;
            debug!(statement = %stmt.label(), "applied");
        }
        Ok(())
    }

    pub async fn close(self) -> Result<(), EntrypointError> {
        self.conn.close().await?;
        Ok(())
    }
}
