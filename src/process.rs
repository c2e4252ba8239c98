//! Child process environment shared by every program the entrypoint spawns.

use std::ffi::OsStr;

/// Environment adjustments applied to every child: indirection variables that were
/// consumed during credential resolution are removed, extra variables are added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildEnv {
    removed: Vec<String>,
    added: Vec<(String, String)>,
}

impl ChildEnv {
    pub fn scrubbing(removed: Vec<String>) -> Self {
        Self {
            removed,
            added: Vec::new(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.added.retain(|(k, _)| *k != key);
        self.added.push((key, value.into()));
        self
    }

    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.added
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn command(&self, program: impl AsRef<OsStr>) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(program);
        for key in &self.removed {
            cmd.env_remove(key);
        }
        cmd.envs(self.added.iter().map(|(k, v)| (k, v)));
        cmd
    }

    /// Blocking variant, used for the final `exec`.
    pub fn std_command(&self, program: impl AsRef<OsStr>) -> std::process::Command {
        let mut cmd = std::process::Command::new(program);
        for key in &self.removed {
            cmd.env_remove(key);
        }
        cmd.envs(self.added.iter().map(|(k, v)| (k, v)));
        cmd
    }
}

/// Flatten captured stderr into one log-friendly line.
pub fn one_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}
