use crate::error::EntrypointError;
use crate::process::{ChildEnv, one_line};
use std::path::Path;
use std::process::Stdio;
use tracing::debug;

/// zic complaint emitted for the `localtime` entry on hosts without a local zone.
pub const UNKNOWN_LOCAL_ZONE: &str = "Local time zone must be set--see zic manual page";
/// Placeholder abbreviation substituted for it.
pub const PLACEHOLDER_ZONE: &str = "FCTY";

pub fn normalize(sql: &str) -> String {
    sql.replace(UNKNOWN_LOCAL_ZONE, PLACEHOLDER_ZONE)
}

/// Convert the system zoneinfo database into loadable SQL.
pub async fn time_zone_sql(
    program: &str,
    zoneinfo_dir: &Path,
    env: &ChildEnv,
) -> Result<String, EntrypointError> {
    let failure = |detail: String| EntrypointError::SqlBatchFailure {
        label: "load time zone tables".to_string(),
        detail,
    };
    let output = env
        .command(program)
        .arg(zoneinfo_dir)
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| failure(format!("{program}: {e}")))?;
    if !output.status.success() {
        return Err(failure(format!(
            "{program} exited with {}: {}",
            output.status,
            one_line(&output.stderr)
        )));
    }
    let sql = String::from_utf8_lossy(&output.stdout);
    debug!(bytes = sql.len(), "time zone SQL generated");
    Ok(normalize(&sql))
}
