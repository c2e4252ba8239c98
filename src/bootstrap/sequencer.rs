//! The fixed bootstrap sequence, built as typed batches.
//!
//! Order: session preamble, time zones, root, health probe accounts, sample
//! database removal, application database, application user.

use super::sql::{Account, GrantScope, Privileges, SqlBatch, Statement};
use crate::credentials::CredentialSet;
use crate::error::EntrypointError;
use rand::{Rng, distr::Alphanumeric};
use std::fmt;

pub const ROOT_USER: &str = "root";
pub const PROBE_USER: &str = "ping";
pub const SAMPLE_DATABASE: &str = "test";
pub const GENERATED_PASSWORD_LEN: usize = 32;

/// The password every root operation uses for the rest of the run.
#[derive(Clone, PartialEq, Eq)]
pub struct RootPassword {
    value: String,
    generated: bool,
}

impl RootPassword {
    /// Random when requested, otherwise the configured value (empty when allowed).
    pub fn resolve(creds: &CredentialSet) -> Self {
        if creds.random_root_requested {
            return Self {
                value: generate_password(),
                generated: true,
            };
        }
        Self {
            value: creds.root_password.clone().unwrap_or_default(),
            generated: false,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }
}

impl fmt::Debug for RootPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootPassword")
            .field("generated", &self.generated)
            .finish_non_exhaustive()
    }
}

/// Thread-local CSPRNG, alphanumeric so it survives any quoting layer.
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Dotted IPv4 pattern whose trailing octets are `%`, e.g. `172.%.%.%` or `10.0.%.%`.
pub fn is_private_network_pattern(host: &str) -> bool {
    let octets: Vec<&str> = host.split('.').collect();
    if octets.len() != 4 {
        return false;
    }
    let Some(first_wild) = octets.iter().position(|o| *o == "%") else {
        return false;
    };
    if first_wild == 0 {
        return false;
    }
    let fixed_ok = octets[..first_wild]
        .iter()
        .all(|o| !o.is_empty() && o.len() <= 3 && o.parse::<u8>().is_ok());
    fixed_ok && octets[first_wild..].iter().all(|o| *o == "%")
}

/// Everything applied right after the temporary server comes up.
pub fn bootstrap_batch(
    creds: &CredentialSet,
    root: &RootPassword,
    time_zone_sql: Option<String>,
) -> Result<SqlBatch, EntrypointError> {
    let mut batch = SqlBatch::new();
    batch
        .plain(Statement::SetAutocommit)
        .plain(Statement::DisableBinaryLog);

    if let Some(sql) = time_zone_sql {
        batch
            .plain(Statement::UseDatabase("mysql".to_string()))
            .plain(Statement::Script {
                label: "load time zone tables".to_string(),
                sql,
            });
    }

    root_accounts(&mut batch, creds, root)?;

    if !creds.healthcheck_disabled {
        probe_accounts(&mut batch, creds);
    }

    batch.plain(Statement::DropDatabase(SAMPLE_DATABASE.to_string()));

    if let Some(db) = &creds.app_database {
        batch.plain(Statement::CreateDatabase(db.clone()));
    }

    if let (Some(user), Some(password)) = (&creds.app_user, &creds.app_password) {
        let account = Account::new(user.clone(), "%");
        match &creds.app_database {
            Some(db) => {
                batch.provision(
                    account,
                    Some(password.clone()),
                    Privileges::All,
                    GrantScope::Database(db.clone()),
                    false,
                );
            }
            None => {
                batch.create_user(account, Some(password.clone()));
            }
        }
    }

    Ok(batch)
}

fn root_accounts(
    batch: &mut SqlBatch,
    creds: &CredentialSet,
    root: &RootPassword,
) -> Result<(), EntrypointError> {
    let local = Account::new(ROOT_USER, "localhost");
    batch
        .alter_password(local.clone(), root.value().to_string())
        .grant(local, Privileges::All, GrantScope::Global, true)?;

    if creds.has_remote_root() {
        batch.provision(
            Account::new(ROOT_USER, creds.root_host.clone()),
            Some(root.value().to_string()),
            Privileges::All,
            GrantScope::Global,
            true,
        );
    }
    batch.plain(Statement::FlushPrivileges);
    Ok(())
}

fn probe_accounts(batch: &mut SqlBatch, creds: &CredentialSet) {
    let mut hosts = vec!["localhost".to_string(), "%".to_string()];
    if is_private_network_pattern(&creds.root_host) {
        hosts.push(creds.root_host.clone());
    }
    for host in hosts {
        batch.provision(
            Account::new(PROBE_USER, host),
            None,
            Privileges::Usage,
            GrantScope::Global,
            false,
        );
    }
}

/// Applied after init scripts so they can still log in as root normally.
pub fn expiry_batch(creds: &CredentialSet) -> SqlBatch {
    let mut batch = SqlBatch::new();
    batch.plain(Statement::ExpirePassword(Account::new(ROOT_USER, "localhost")));
    if creds.has_remote_root() {
        batch.plain(Statement::ExpirePassword(Account::new(
            ROOT_USER,
            creds.root_host.clone(),
        )));
    }
    batch
}
