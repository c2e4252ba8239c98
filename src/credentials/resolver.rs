use super::env::EnvSnapshot;
use crate::error::EntrypointError;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const FILE_SUFFIX: &str = "_FILE";

/// Resolves `NAME` / `NAME_FILE` pairs against an environment snapshot and remembers
/// which indirection variables must be hidden from child processes.
#[derive(Debug)]
pub struct Resolver<'a> {
    env: &'a EnvSnapshot,
    cleared: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(env: &'a EnvSnapshot) -> Self {
        Self {
            env,
            cleared: Vec::new(),
        }
    }

    /// Literal value, then the contents of the file named by `NAME_FILE`, then `default`,
    /// then the empty string. Setting both forms is a conflict even if one looks "emptier".
    pub fn resolve(&mut self, name: &str, default: Option<&str>) -> Result<String, EntrypointError> {
        let file_var = format!("{name}{FILE_SUFFIX}");
        if self.env.contains(&file_var) && !self.cleared.contains(&file_var) {
            self.cleared.push(file_var.clone());
        }

        let literal = self.env.get(name);
        let indirect = self.env.get(&file_var);

        match (literal, indirect) {
            (Some(_), Some(_)) => Err(EntrypointError::ConfigConflict {
                name: name.to_string(),
            }),
            (Some(value), None) => Ok(value.to_string()),
            (None, Some(path)) => {
                let path = PathBuf::from(path);
                debug!(variable = name, path = %path.display(), "reading value from file");
                let contents =
                    fs::read_to_string(&path).map_err(|source| EntrypointError::CredentialFile {
                        name: name.to_string(),
                        path,
                        source,
                    })?;
                Ok(contents.trim_end_matches(['\n', '\r']).to_string())
            }
            (None, None) => Ok(default.unwrap_or_default().to_string()),
        }
    }

    /// Resolve to `None` when the outcome is empty.
    pub fn resolve_opt(&mut self, name: &str) -> Result<Option<String>, EntrypointError> {
        let value = self.resolve(name, None)?;
        Ok((!value.is_empty()).then_some(value))
    }

    /// Flags are "on" whenever they resolve to any non-empty value.
    pub fn resolve_flag(&mut self, name: &str) -> Result<bool, EntrypointError> {
        Ok(!self.resolve(name, None)?.is_empty())
    }

    pub fn into_cleared(self) -> Vec<String> {
        self.cleared
    }
}
