//! Runtime configuration
//!
//! Environment-only configuration, resolved once at start-up.

use std::env;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::access::{Caller, Role};
use crate::diet::{DietRulesError, RuleSet};

pub const ENV_DATABASE_PATH: &str = "ARCADIA_DATABASE_PATH";
pub const ENV_ROLE: &str = "ARCADIA_ROLE";
pub const ENV_USER_ID: &str = "ARCADIA_USER_ID";
pub const ENV_DIET_RULES: &str = "ARCADIA_DIET_RULES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ARCADIA_USER_ID must be an integer, got '{0}'")]
    InvalidUserId(String),

    #[error(transparent)]
    DietRules(#[from] DietRulesError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub caller: Caller,
    /// Custom rule table; the built-in table is used when unset
    pub diet_rules_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup(ENV_DATABASE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let path = default_database_path();
                info!("{ENV_DATABASE_PATH} not set, using default: {}", path.display());
                path
            });

        let role = match lookup(ENV_ROLE) {
            Some(raw) => {
                let role = Role::from_str(&raw);
                if role == Role::Anonymous && !raw.trim().eq_ignore_ascii_case("anonymous") {
                    warn!("Unknown {ENV_ROLE} '{raw}', running as anonymous");
                }
                role
            }
            None => {
                warn!("{ENV_ROLE} not set, running as anonymous");
                Role::Anonymous
            }
        };

        let user_id = match lookup(ENV_USER_ID) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| ConfigError::InvalidUserId(raw.clone()))?,
            ),
            None => None,
        };

        Ok(Self {
            database_path,
            caller: Caller::new(user_id, role),
            diet_rules_path: lookup(ENV_DIET_RULES).map(PathBuf::from),
        })
    }

    /// Load the configured rule table, or the built-in one
    pub fn load_rules(&self) -> Result<RuleSet, ConfigError> {
        match &self.diet_rules_path {
            Some(path) => {
                let rules = RuleSet::load(path)?;
                info!(
                    "Loaded diet rules from {} ({} species)",
                    path.display(),
                    rules.species.rates.len()
                );
                Ok(rules)
            }
            None => Ok(RuleSet::default()),
        }
    }
}

/// `<project>/data/arcadia.db`, resolved from the executable location
pub fn default_database_path() -> PathBuf {
    let mut path = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("arcadia.db");
    path
}
