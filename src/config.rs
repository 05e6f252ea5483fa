use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DATA_PATH: &str = "data/city_demographics.csv";
pub const DEFAULT_STATIC_DIR: &str = "web";

/// Server settings read from the environment:
/// `HOST`, `PORT`, `CITYPOP_DATA`, `CITYPOP_STATIC_DIR`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_path: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unset or unparsable values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            data_path: lookup("CITYPOP_DATA")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            static_dir: lookup("CITYPOP_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid HOST/PORT: {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_unset() {
        let cfg = ServerConfig::from_lookup(|_| None);
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.socket_addr().unwrap().port(), 8000);
    }

    #[test]
    fn reads_overrides_and_ignores_bad_port() {
        let vars: HashMap<&str, &str> = [
            ("HOST", "127.0.0.1"),
            ("PORT", "not-a-port"),
            ("CITYPOP_DATA", "/srv/pop.csv"),
        ]
        .into_iter()
        .collect();
        let cfg = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.data_path, PathBuf::from("/srv/pop.csv"));
        assert_eq!(cfg.static_dir, PathBuf::from(DEFAULT_STATIC_DIR));
    }

    #[test]
    fn bad_host_is_an_error() {
        let cfg = ServerConfig {
            host: "not a host".into(),
            ..ServerConfig::default()
        };
        assert!(cfg.socket_addr().is_err());
    }
}
