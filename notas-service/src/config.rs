use std::env;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const PORT: &str = "NOTAS_PORT";
    /// Comma-separated person ids promoted to the admin role on boot.
    pub const ADMIN_IDS: &str = "NOTAS_ADMIN_IDS";
    /// Maximum rows returned by an ad-hoc query.
    pub const QUERY_ROW_LIMIT: &str = "NOTAS_QUERY_ROW_LIMIT";
    /// Open sessions kept before the least recently used are dropped.
    pub const MAX_SESSIONS: &str = "NOTAS_MAX_SESSIONS";
}

/// Default values
pub mod defaults {
    pub const DATABASE_URL: &str = "./.db/notas.db";
    pub const PORT: u16 = 9110;
    pub const QUERY_ROW_LIMIT: usize = 500;
    pub const MAX_SESSIONS: usize = 10_000;
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub admin_ids: Vec<String>,
    pub query_row_limit: usize,
    pub max_sessions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
            port: defaults::PORT,
            admin_ids: Vec::new(),
            query_row_limit: defaults::QUERY_ROW_LIMIT,
            max_sessions: defaults::MAX_SESSIONS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Unparseable numbers fall back to
    /// their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(env_vars::PORT) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("{} is not a valid port: {:?}, using {}", env_vars::PORT, raw, defaults::PORT);
                defaults::PORT
            }),
            None => defaults::PORT,
        };

        let query_row_limit = positive(&lookup, env_vars::QUERY_ROW_LIMIT, defaults::QUERY_ROW_LIMIT);
        let max_sessions = positive(&lookup, env_vars::MAX_SESSIONS, defaults::MAX_SESSIONS);

        let admin_ids = lookup(env_vars::ADMIN_IDS)
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            database_url: lookup(env_vars::DATABASE_URL)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| defaults::DATABASE_URL.to_string()),
            port,
            admin_ids,
            query_row_limit,
            max_sessions,
        }
    }
}

fn positive<F>(lookup: &F, key: &str, default: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                log::warn!("{} must be a positive number: {:?}, using {}", key, raw, default);
                default
            }
        },
        None => default,
    }
}
