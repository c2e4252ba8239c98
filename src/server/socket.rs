use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketLink {
    /// Default and configured socket are the same path.
    Unchanged,
    /// `link` now points at `target`.
    Linked { link: PathBuf, target: PathBuf },
}

/// Make clients that only know the compiled-in socket path reach the configured one.
/// An existing file or link at the default path is replaced.
pub fn reconcile(configured: &Path, default: &Path) -> io::Result<SocketLink> {
    if configured == default {
        return Ok(SocketLink::Unchanged);
    }

    match std::fs::symlink_metadata(default) {
        Ok(meta) if meta.is_dir() => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a directory", default.display()),
            ));
        }
        Ok(_) => std::fs::remove_file(default)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    symlink(configured, default)?;
    Ok(SocketLink::Linked {
        link: default.to_path_buf(),
        target: configured.to_path_buf(),
    })
}
