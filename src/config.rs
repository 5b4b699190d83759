use anyhow::Context;

use crate::users::lifecycle::UserDefaults;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_size: 10,
            max_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub host: String,
    pub port: u16,
    pub user_defaults: UserDefaults,
    pub paging: PagingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: 10,
            db_acquire_timeout_secs: 5,
            host: "0.0.0.0".into(),
            port: 8080,
            user_defaults: UserDefaults::default(),
            paging: PagingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let database_url = get("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let db_max_connections =
            parse_or(&get, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?;
        let db_acquire_timeout_secs = parse_or(
            &get,
            "DB_ACQUIRE_TIMEOUT_SECS",
            defaults.db_acquire_timeout_secs,
        )?;
        let host = get("APP_HOST").unwrap_or(defaults.host);
        let port = parse_or(&get, "APP_PORT", defaults.port)?;
        let user_defaults = UserDefaults {
            role: parse_or(&get, "USER_DEFAULT_ROLE", defaults.user_defaults.role)?,
            status: parse_or(&get, "USER_DEFAULT_STATUS", defaults.user_defaults.status)?,
        };
        let paging = PagingConfig {
            default_size: parse_or(&get, "PAGE_SIZE_DEFAULT", defaults.paging.default_size)?,
            max_size: parse_or(&get, "PAGE_SIZE_MAX", defaults.paging.max_size)?,
        };
        anyhow::ensure!(
            paging.default_size >= 1 && paging.default_size <= paging.max_size,
            "PAGE_SIZE_DEFAULT must be between 1 and PAGE_SIZE_MAX ({})",
            paging.max_size
        );

        Ok(Self {
            database_url,
            db_max_connections,
            db_acquire_timeout_secs,
            host,
            port,
            user_defaults,
            paging,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        None => Ok(default),
    }
}
