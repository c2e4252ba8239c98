//! Typed administrative statements and the order-enforcing batch they live in.

use crate::error::EntrypointError;
use std::fmt;

/// Single-quoted string literal. Backslash, quote and newline are escaped.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Backtick-quoted identifier with embedded backticks doubled.
pub fn quote_identifier(value: &str) -> String {
    format!("`{}`", value.replace('`', "``"))
}

/// Database names in grants are patterns; `_` must be escaped to match literally.
pub fn escape_grant_wildcards(db: &str) -> String {
    db.replace('_', "\\_")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account {
    pub user: String,
    pub host: String,
}

impl Account {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", quote_literal(&self.user), quote_literal(&self.host))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privileges {
    All,
    /// Connect only.
    Usage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantScope {
    Global,
    /// Exact database; wildcards in the name are escaped when rendered.
    Database(String),
}

#[derive(Clone, PartialEq, Eq)]
pub enum Statement {
    SetAutocommit,
    DisableBinaryLog,
    UseDatabase(String),
    /// Pre-rendered script, e.g. time zone tables.
    Script { label: String, sql: String },
    AlterPassword {
        account: Account,
        password: String,
    },
    CreateUser {
        account: Account,
        password: Option<String>,
    },
    Grant {
        account: Account,
        privileges: Privileges,
        scope: GrantScope,
        with_grant_option: bool,
    },
    FlushPrivileges,
    DropDatabase(String),
    CreateDatabase(String),
    ExpirePassword(Account),
}

impl Statement {
    pub fn to_sql(&self) -> String {
        match self {
            Self::SetAutocommit => "SET autocommit = 1".to_string(),
            Self::DisableBinaryLog => "SET @@SESSION.SQL_LOG_BIN = 0".to_string(),
            Self::UseDatabase(db) => format!("USE {}", quote_identifier(db)),
            Self::Script { sql, .. } => sql.clone(),
            Self::AlterPassword { account, password } => {
                format!("ALTER USER {account} IDENTIFIED BY {}", quote_literal(password))
            }
            Self::CreateUser { account, password } => match password {
                Some(pw) => format!(
                    "CREATE USER IF NOT EXISTS {account} IDENTIFIED BY {}",
                    quote_literal(pw)
                ),
                None => format!("CREATE USER IF NOT EXISTS {account}"),
            },
            Self::Grant {
                account,
                privileges,
                scope,
                with_grant_option,
            } => {
                let privs = match privileges {
                    Privileges::All => "ALL",
                    Privileges::Usage => "USAGE",
                };
                let target = match scope {
                    GrantScope::Global => "*.*".to_string(),
                    GrantScope::Database(db) => {
                        format!("{}.*", quote_identifier(&escape_grant_wildcards(db)))
                    }
                };
                let option = if *with_grant_option {
                    " WITH GRANT OPTION"
                } else {
                    ""
                };
                format!("GRANT {privs} ON {target} TO {account}{option}")
            }
            Self::FlushPrivileges => "FLUSH PRIVILEGES".to_string(),
            Self::DropDatabase(db) => format!("DROP DATABASE IF EXISTS {}", quote_identifier(db)),
            Self::CreateDatabase(db) => {
                format!("CREATE DATABASE IF NOT EXISTS {}", quote_identifier(db))
            }
            Self::ExpirePassword(account) => format!("ALTER USER {account} PASSWORD EXPIRE"),
        }
    }

    /// Statement text safe for logs: passwords and script bodies are left out.
    pub fn label(&self) -> String {
        match self {
            Self::Script { label, .. } => label.clone(),
            Self::AlterPassword { account, .. } => format!("ALTER USER {account} IDENTIFIED BY ***"),
            Self::CreateUser {
                account,
                password: Some(_),
            } => format!("CREATE USER IF NOT EXISTS {account} IDENTIFIED BY ***"),
            other => other.to_sql(),
        }
    }

    /// Account this statement creates or rewrites, if any.
    pub fn materializes(&self) -> Option<&Account> {
        match self {
            Self::AlterPassword { account, .. } | Self::CreateUser { account, .. } => Some(account),
            _ => None,
        }
    }

    pub fn granted_account(&self) -> Option<&Account> {
        match self {
            Self::Grant { account, .. } => Some(account),
            _ => None,
        }
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Ordered statements. A grant is only accepted for an account that an earlier
/// statement in the same batch created or altered; it is never reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlBatch {
    statements: Vec<Statement>,
    materialized: Vec<Account>,
}

impl SqlBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stmt: Statement) -> Result<&mut Self, EntrypointError> {
        if let Some(account) = stmt.granted_account()
            && !self.materialized.contains(account)
        {
            return Err(EntrypointError::UnmaterializedAccount {
                account: account.to_string(),
            });
        }
        if let Some(account) = stmt.materializes()
            && !self.materialized.contains(account)
        {
            self.materialized.push(account.clone());
        }
        self.statements.push(stmt);
        Ok(self)
    }

    /// Statements that never reference an account.
    pub fn plain(&mut self, stmt: Statement) -> &mut Self {
        debug_assert!(stmt.granted_account().is_none() && stmt.materializes().is_none());
        self.statements.push(stmt);
        self
    }

    pub fn create_user(&mut self, account: Account, password: Option<String>) -> &mut Self {
        if !self.materialized.contains(&account) {
            self.materialized.push(account.clone());
        }
        self.statements
            .push(Statement::CreateUser { account, password });
        self
    }

    pub fn alter_password(&mut self, account: Account, password: String) -> &mut Self {
        if !self.materialized.contains(&account) {
            self.materialized.push(account.clone());
        }
        self.statements
            .push(Statement::AlterPassword { account, password });
        self
    }

    pub fn grant(
        &mut self,
        account: Account,
        privileges: Privileges,
        scope: GrantScope,
        with_grant_option: bool,
    ) -> Result<&mut Self, EntrypointError> {
        self.push(Statement::Grant {
            account,
            privileges,
            scope,
            with_grant_option,
        })
    }

    /// Create-if-absent then grant, always adjacent and in that order.
    pub fn provision(
        &mut self,
        account: Account,
        password: Option<String>,
        privileges: Privileges,
        scope: GrantScope,
        with_grant_option: bool,
    ) -> &mut Self {
        self.create_user(account.clone(), password);
        self.statements.push(Statement::Grant {
            account,
            privileges,
            scope,
            with_grant_option,
        });
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }
}

impl<'a> IntoIterator for &'a SqlBatch {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}
