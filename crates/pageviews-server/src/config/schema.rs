use std::net::SocketAddr;

use pageviews_core::error::{PageviewsError, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub database: DatabaseSection,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            database: DatabaseSection::default(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PageviewsError::InvalidConfig(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.database.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            PageviewsError::InvalidConfig(format!(
                "server.listen must be a valid SocketAddr ({}): {e}",
                self.listen
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default = "default_db_name")]
    pub name: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            user: default_db_user(),
            name: default_db_name(),
            max_connections: default_max_connections(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl DatabaseSection {
    pub fn validate(&self) -> Result<()> {
        if self.user.trim().is_empty() {
            return Err(PageviewsError::InvalidConfig(
                "database.user must not be empty".into(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(PageviewsError::InvalidConfig(
                "database.name must not be empty".into(),
            ));
        }
        if !(1..=256).contains(&self.max_connections) {
            return Err(PageviewsError::InvalidConfig(
                "database.max_connections must be between 1 and 256".into(),
            ));
        }
        if !(100..=60000).contains(&self.connect_timeout_ms) {
            return Err(PageviewsError::InvalidConfig(
                "database.connect_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:80".into()
}
fn default_db_user() -> String {
    "pageviews".into()
}
fn default_db_name() -> String {
    "pageviews".into()
}
fn default_max_connections() -> u32 {
    10
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
