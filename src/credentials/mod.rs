//! Credential resolution.
//!
//! Every recognised variable may be given literally or through a `*_FILE`
//! indirection. Resolution happens once, before anything on disk is touched,
//! and yields an immutable [`CredentialSet`] that the rest of the flow threads
//! through explicitly.

pub mod env;
pub mod resolver;

pub use env::EnvSnapshot;
pub use resolver::Resolver;

use crate::error::EntrypointError;
use std::fmt;
use tracing::warn;

pub const ROOT_PASSWORD: &str = "MYSQL_ROOT_PASSWORD";
pub const ALLOW_EMPTY_PASSWORD: &str = "MYSQL_ALLOW_EMPTY_PASSWORD";
pub const RANDOM_ROOT_PASSWORD: &str = "MYSQL_RANDOM_ROOT_PASSWORD";
pub const ROOT_HOST: &str = "MYSQL_ROOT_HOST";
pub const DATABASE: &str = "MYSQL_DATABASE";
pub const USER: &str = "MYSQL_USER";
pub const PASSWORD: &str = "MYSQL_PASSWORD";
pub const ONETIME_PASSWORD: &str = "MYSQL_ONETIME_PASSWORD";
pub const HEALTHCHECK_DISABLED: &str = "MYSQL_HEALTHCHECK_DISABLED";
pub const SKIP_TZINFO: &str = "MYSQL_INITDB_SKIP_TZINFO";

/// Root host pattern used when `MYSQL_ROOT_HOST` is not given.
pub const DEFAULT_ROOT_HOST: &str = "172.%.%.%";

#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    pub root_password: Option<String>,
    pub root_host: String,
    pub allow_empty_root: bool,
    pub random_root_requested: bool,
    pub app_database: Option<String>,
    pub app_user: Option<String>,
    pub app_password: Option<String>,
    pub onetime_password_expiry: bool,
    pub healthcheck_disabled: bool,
    pub skip_tzinfo: bool,
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("CredentialSet")
            .field("root_password", &redact(&self.root_password))
            .field("root_host", &self.root_host)
            .field("allow_empty_root", &self.allow_empty_root)
            .field("random_root_requested", &self.random_root_requested)
            .field("app_database", &self.app_database)
            .field("app_user", &self.app_user)
            .field("app_password", &redact(&self.app_password))
            .field("onetime_password_expiry", &self.onetime_password_expiry)
            .field("healthcheck_disabled", &self.healthcheck_disabled)
            .field("skip_tzinfo", &self.skip_tzinfo)
            .finish()
    }
}

/// Outcome of resolution: the credentials plus the indirection variables that
/// must not leak into child processes.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub credentials: CredentialSet,
    pub cleared: Vec<String>,
}

impl CredentialSet {
    pub fn resolve(env: &EnvSnapshot) -> Result<ResolvedCredentials, EntrypointError> {
        let mut r = Resolver::new(env);
        let credentials = CredentialSet {
            root_password: r.resolve_opt(ROOT_PASSWORD)?,
            root_host: r.resolve(ROOT_HOST, Some(DEFAULT_ROOT_HOST))?,
            allow_empty_root: r.resolve_flag(ALLOW_EMPTY_PASSWORD)?,
            random_root_requested: r.resolve_flag(RANDOM_ROOT_PASSWORD)?,
            app_database: r.resolve_opt(DATABASE)?,
            app_user: r.resolve_opt(USER)?,
            app_password: r.resolve_opt(PASSWORD)?,
            onetime_password_expiry: r.resolve_flag(ONETIME_PASSWORD)?,
            healthcheck_disabled: r.resolve_flag(HEALTHCHECK_DISABLED)?,
            skip_tzinfo: r.resolve_flag(SKIP_TZINFO)?,
        };
        Ok(ResolvedCredentials {
            credentials,
            cleared: r.into_cleared(),
        })
    }

    /// Minimum set required before a fresh data directory may be bootstrapped.
    pub fn validate_for_fresh(&self) -> Result<(), EntrypointError> {
        if self.root_password.is_none() && !self.allow_empty_root && !self.random_root_requested {
            return Err(EntrypointError::MissingCredential);
        }

        if self.app_user.as_deref() == Some("root") {
            return Err(EntrypointError::InvalidCredential(
                "MYSQL_USER=\"root\", MYSQL_USER and MYSQL_PASSWORD are for configuring a \
                 regular user and cannot be used for the root user"
                    .to_string(),
            ));
        }

        match (&self.app_user, &self.app_password) {
            (Some(_), None) => {
                warn!("MYSQL_USER specified, but missing MYSQL_PASSWORD; MYSQL_USER will not be created")
            }
            (None, Some(_)) => {
                warn!("MYSQL_PASSWORD specified, but missing MYSQL_USER; MYSQL_PASSWORD will be ignored")
            }
            _ => {}
        }
        Ok(())
    }

    /// Root hosts other than localhost get their own account.
    pub fn has_remote_root(&self) -> bool {
        !self.root_host.is_empty() && self.root_host != "localhost"
    }

    /// Literal form of a recognised variable as resolved. Flags come back as `"1"`
    /// when set; unset values are `None`.
    pub fn literal(&self, name: &str) -> Option<String> {
        let flag = |on: bool| on.then(|| "1".to_string());
        match name {
            ROOT_PASSWORD => self.root_password.clone(),
            ROOT_HOST => Some(self.root_host.clone()).filter(|h| !h.is_empty()),
            ALLOW_EMPTY_PASSWORD => flag(self.allow_empty_root),
            RANDOM_ROOT_PASSWORD => flag(self.random_root_requested),
            DATABASE => self.app_database.clone(),
            USER => self.app_user.clone(),
            PASSWORD => self.app_password.clone(),
            ONETIME_PASSWORD => flag(self.onetime_password_expiry),
            HEALTHCHECK_DISABLED => flag(self.healthcheck_disabled),
            SKIP_TZINFO => flag(self.skip_tzinfo),
            _ => None,
        }
    }

    /// Values that were read through `NAME_FILE` and must travel as `NAME` once the
    /// indirection variable is scrubbed.
    pub fn file_sourced(&self, cleared: &[String]) -> Vec<(String, String)> {
        cleared
            .iter()
            .filter_map(|file_var| file_var.strip_suffix(resolver::FILE_SUFFIX))
            .filter_map(|name| self.literal(name).map(|v| (name.to_string(), v)))
            .collect()
    }

    /// Resolved values re-exported to init scripts, which would otherwise only see
    /// the literal form of each variable.
    pub fn exports(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![(ROOT_HOST, self.root_host.clone())];
        let optional = [
            (ROOT_PASSWORD, &self.root_password),
            (DATABASE, &self.app_database),
            (USER, &self.app_user),
            (PASSWORD, &self.app_password),
        ];
        out.extend(
            optional
                .into_iter()
                .filter_map(|(k, v)| v.as_ref().map(|v| (k, v.clone()))),
        );
        out
    }
}
