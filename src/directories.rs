use crate::error::EntrypointError;
use crate::handoff::ServiceAccount;
use crate::server::ServerConfig;
use std::collections::BTreeSet;
use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::{DirBuilderExt, MetadataExt, lchown};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DIR_MODE: u32 = 0o755;

/// Data dir, socket parent, the parents of every configured file path, and the
/// secure-file-priv directory itself.
pub fn required_directories(cfg: &ServerConfig) -> BTreeSet<PathBuf> {
    let mut dirs = BTreeSet::new();
    dirs.insert(cfg.data_dir.clone());
    dirs.extend(parent_of(&cfg.socket));

    let files = [
        &cfg.general_log_file,
        &cfg.pid_file,
        &cfg.slow_query_log_file,
        &cfg.keyring_file_data,
    ];
    dirs.extend(files.into_iter().flatten().filter_map(|p| parent_of(p)));
    dirs.extend(cfg.secure_file_priv.clone());
    dirs
}

fn parent_of(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Create every required directory and, when running privileged, hand anything not
/// already owned by the service account over to it. Safe to repeat on every start.
pub fn prepare(
    cfg: &ServerConfig,
    owner: Option<&ServiceAccount>,
) -> Result<BTreeSet<PathBuf>, EntrypointError> {
    let dirs = required_directories(cfg);
    let mut builder = DirBuilder::new();
    builder.recursive(true).mode(DIR_MODE);

    for dir in &dirs {
        builder
            .create(dir)
            .map_err(|source| EntrypointError::DirectoryPreparation {
                path: dir.clone(),
                source,
            })?;
    }

    if let Some(account) = owner {
        let mut changed = 0usize;
        for dir in &dirs {
            changed += chown_tree(dir, account.uid).map_err(|source| {
                EntrypointError::DirectoryPreparation {
                    path: dir.clone(),
                    source,
                }
            })?;
        }
        if changed > 0 {
            info!(user = %account.name, changed, "normalized ownership of server directories");
        }
    }

    debug!(count = dirs.len(), "server directories ready");
    Ok(dirs)
}

/// Recursive `chown --no-dereference` limited to entries with a different owner.
/// Symlinks are re-owned but never followed.
fn chown_tree(path: &Path, uid: u32) -> io::Result<usize> {
    let meta = fs::symlink_metadata(path)?;
    let mut changed = 0;
    if meta.uid() != uid {
        lchown(path, Some(uid), None)?;
        changed += 1;
    }
    if meta.is_dir() {
        for entry in fs::read_dir(path)? {
            changed += chown_tree(&entry?.path(), uid)?;
        }
    }
    Ok(changed)
}
