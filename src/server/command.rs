use crate::process::ChildEnv;

/// Arguments that make the server print something and exit; never bootstrap for those.
pub const HELP_FLAGS: &[&str] = &["-?", "--help", "--print-defaults", "-V", "--version"];

/// The command the container was asked to run, normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    program: String,
    args: Vec<String>,
}

impl ServerCommand {
    /// Build from the entrypoint's own argument list. An empty list or a leading
    /// flag means "the server, with these options".
    pub fn from_args(args: Vec<String>, server_command: &str) -> Self {
        let mut iter = args.into_iter().peekable();
        let program = match iter.peek() {
            Some(first) if !first.starts_with('-') => iter.next().unwrap_or_default(),
            _ => server_command.to_string(),
        };
        Self {
            program,
            args: iter.collect(),
        }
    }

    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn wants_help(&self) -> bool {
        self.args.iter().any(|a| HELP_FLAGS.contains(&a.as_str()))
    }

    /// Only a real server start runs the bootstrap flow.
    pub fn is_server_start(&self, server_command: &str) -> bool {
        self.program == server_command && !self.wants_help()
    }

    /// Program plus the user's arguments plus `extra`.
    pub fn command(&self, env: &ChildEnv, extra: &[String]) -> tokio::process::Command {
        let mut cmd = env.command(&self.program);
        cmd.args(&self.args).args(extra);
        cmd
    }

    /// Full argument vector, program first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}
