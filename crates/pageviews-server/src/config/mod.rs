//! Service config loader (strict YAML parsing + environment).
//!
//! The YAML file is optional and only tunes defaults. The database host always
//! comes from `DB_CONNECTION_URI`; startup refuses to continue without it.

pub mod schema;

use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use pageviews_core::error::{PageviewsError, Result};

pub use schema::{DatabaseSection, ServerSection, ServiceConfig};

/// Required: `host[:port]` (or a full `mysql://` URL) of the counter database.
pub const ENV_CONNECTION_URI: &str = "DB_CONNECTION_URI";
/// Optional password for `database.user`.
pub const ENV_PASSWORD: &str = "DB_PASSWORD";
/// Optional path to the YAML config file.
pub const ENV_CONFIG_PATH: &str = "PAGEVIEWS_CONFIG";

pub const DEFAULT_CONFIG_FILE: &str = "pageviews.yaml";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

pub fn load_from_file(path: &str) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PageviewsError::InvalidConfig(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg: ServiceConfig = serde_yaml::from_str(s)
        .map_err(|e| PageviewsError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbEndpoint {
    HostPort { host: String, port: u16 },
    /// Full `mysql://` URL; credentials and database come from the URL itself.
    Url(String),
}

impl DbEndpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PageviewsError::ConfigurationMissing(format!(
                "{ENV_CONNECTION_URI} is empty"
            )));
        }
        if raw.starts_with("mysql://") {
            return Ok(DbEndpoint::Url(raw.to_string()));
        }

        let (host, port) = split_host_port(raw)?;
        if host.is_empty() {
            return Err(PageviewsError::InvalidConfig(format!(
                "{ENV_CONNECTION_URI} has no host: {raw}"
            )));
        }
        Ok(DbEndpoint::HostPort {
            host: host.to_string(),
            port,
        })
    }
}

fn split_host_port(raw: &str) -> Result<(&str, u16)> {
    // [v6]:port
    if let Some(rest) = raw.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| {
            PageviewsError::InvalidConfig(format!("unterminated IPv6 host: {raw}"))
        })?;
        return match tail.strip_prefix(':') {
            Some(p) => Ok((host, parse_port(p, raw)?)),
            None if tail.is_empty() => Ok((host, DEFAULT_MYSQL_PORT)),
            None => Err(PageviewsError::InvalidConfig(format!(
                "unexpected text after IPv6 host: {raw}"
            ))),
        };
    }
    // bare v6 address
    if raw.matches(':').count() > 1 {
        return Ok((raw, DEFAULT_MYSQL_PORT));
    }
    match raw.split_once(':') {
        Some((host, p)) => Ok((host, parse_port(p, raw)?)),
        None => Ok((raw, DEFAULT_MYSQL_PORT)),
    }
}

fn parse_port(p: &str, raw: &str) -> Result<u16> {
    match p.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(PageviewsError::InvalidConfig(format!(
            "invalid port in {ENV_CONNECTION_URI}: {raw}"
        ))),
    }
}

/// Everything needed to open the pool.
#[derive(Clone)]
pub struct DatabaseSettings {
    pub endpoint: DbEndpoint,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl DatabaseSettings {
    /// Log-safe description of the target (never includes credentials).
    pub fn describe(&self) -> String {
        match &self.endpoint {
            DbEndpoint::HostPort { host, port } => format!("{host}:{port}/{}", self.name),
            DbEndpoint::Url(url) => redact_url(url),
        }
    }

    /// A `mysql://` URL carries its own credentials, so `DB_PASSWORD` has no effect.
    pub fn password_ignored(&self) -> bool {
        matches!(self.endpoint, DbEndpoint::Url(_)) && self.password.is_some()
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("target", &self.describe())
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("max_connections", &self.max_connections)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

fn redact_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("mysql://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((_, host_part)) => format!("mysql://***@{host_part}"),
        None => url.to_string(),
    }
}

/// Resolved settings: YAML config merged with environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: SocketAddr,
    pub database: DatabaseSettings,
}

impl Settings {
    /// Merge a validated config with environment values.
    pub fn resolve<F>(cfg: ServiceConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = env(ENV_CONNECTION_URI).ok_or_else(|| {
            PageviewsError::ConfigurationMissing(format!(
                "{ENV_CONNECTION_URI} must be set to the counter database host[:port]"
            ))
        })?;
        let endpoint = DbEndpoint::parse(&raw)?;
        let listen = cfg.server.listen_addr()?;

        let db = cfg.database;
        let database = DatabaseSettings {
            endpoint,
            user: db.user,
            password: env(ENV_PASSWORD),
            name: db.name,
            max_connections: db.max_connections,
            connect_timeout: Duration::from_millis(db.connect_timeout_ms),
        };
        if database.password_ignored() {
            tracing::warn!(
                target_db = %database.describe(),
                "DB_PASSWORD ignored: DB_CONNECTION_URI is a URL and carries its own credentials"
            );
        }

        Ok(Self { listen, database })
    }
}

/// Load the config file (if any) and resolve it against `env`.
///
/// `PAGEVIEWS_CONFIG` must point to a readable file when set. Without it,
/// `pageviews.yaml` is read if present, otherwise defaults apply.
pub fn load<F>(env: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let cfg = match env(ENV_CONFIG_PATH) {
        Some(path) => load_from_file(&path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => load_from_file(DEFAULT_CONFIG_FILE)?,
        None => ServiceConfig::default(),
    };
    Settings::resolve(cfg, env)
}
