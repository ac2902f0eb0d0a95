//! Connection settings handed to a driver

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Backend;

/// Where and how to connect.
///
/// Keys use the camelCase names of the client configuration object, so a
/// single JSON/TOML document can carry both these settings and the pool
/// options. Missing keys take their defaults; the port defaults per backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    pub host: String,
    /// `None` means the backend's default port
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    pub database: String,
    pub charset: String,
    /// Handshake timeout in milliseconds
    #[serde(rename = "connectTimeout")]
    pub connect_timeout_ms: u64,
    /// Driver-level connection test timeout in milliseconds
    #[serde(rename = "testTimeout")]
    pub test_timeout_ms: u64,
    /// Per-query timeout in milliseconds, enforced by the driver
    #[serde(rename = "queryTimeout")]
    pub query_timeout_ms: Option<u64>,
    pub ssl_mode: Option<String>,
    pub ssl_root_cert: Option<String>,
}

impl ConnectionSettings {
    /// Port to connect to for the given backend
    pub fn port_for(&self, backend: Backend) -> u16 {
        self.port.unwrap_or_else(|| backend.default_port())
    }

    /// `host:port` for logging
    pub fn address(&self, backend: Backend) -> String {
        format!("{}:{}", self.host, self.port_for(backend))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout_ms)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    /// SSL options in the key format drivers expect (`sslmode`, `sslrootcert`)
    pub fn ssl_options(&self) -> Vec<(&'static str, &str)> {
        let mut options = Vec::new();
        if let Some(mode) = &self.ssl_mode {
            options.push(("sslmode", mode.as_str()));
        }
        if let Some(cert) = &self.ssl_root_cert {
            options.push(("sslrootcert", cert.as_str()));
        }
        options
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            username: "vertx".to_string(),
            password: "password".to_string(),
            database: "testdb".to_string(),
            charset: "UTF-8".to_string(),
            connect_timeout_ms: 10_000,
            test_timeout_ms: 10_000,
            query_timeout_ms: None,
            ssl_mode: None,
            ssl_root_cert: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_backend() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.port_for(Backend::MySql), 3306);
        assert_eq!(settings.port_for(Backend::PostgreSql), 5432);
        assert_eq!(settings.address(Backend::PostgreSql), "localhost:5432");
        assert!(settings.query_timeout().is_none());
        assert!(settings.ssl_options().is_empty());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = serde_json::json!({
            "host": "db.internal",
            "port": 6543,
            "queryTimeout": 2500,
            "sslMode": "require"
        });
        let settings: ConnectionSettings = serde_json::from_value(json).expect("deserialize");

        assert_eq!(settings.host, "db.internal");
        assert_eq!(settings.port_for(Backend::MySql), 6543);
        assert_eq!(settings.username, "vertx");
        assert_eq!(settings.connect_timeout(), Duration::from_millis(10_000));
        assert_eq!(settings.query_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(settings.ssl_options(), vec![("sslmode", "require")]);
    }
}
