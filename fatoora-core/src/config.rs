use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

/// Server configuration read from the environment (after `.env` loading).
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,

    /// Directory holding uploaded team logos
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is required")?;
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .context("JWT_SECRET is required")?;

        let host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("SERVER_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| anyhow!("Invalid SERVER_PORT: {}", raw))?,
            None => 3000,
        };
        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow!("Invalid DATABASE_MAX_CONNECTIONS: {}", raw))?,
            None => 10,
        };
        let upload_dir = lookup("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("uploads"));

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            jwt_secret,
            upload_dir,
        })
    }

    /// `host:port` to bind the listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/fatoora"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn test_defaults() {
        let cfg = config(&REQUIRED).unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:3000");
        assert_eq!(cfg.database_max_connections, 10);
        assert_eq!(cfg.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn test_missing_required_values() {
        assert!(config(&[("JWT_SECRET", "secret")]).is_err());
        assert!(config(&[("DATABASE_URL", "postgres://localhost/fatoora")]).is_err());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SERVER_PORT", "eighty"));
        assert!(config(&vars).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("SERVER_HOST", "127.0.0.1"),
            ("SERVER_PORT", "8080"),
            ("UPLOAD_DIR", "/var/lib/fatoora/uploads"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ]);
        let cfg = config(&vars).unwrap();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
        assert_eq!(cfg.database_max_connections, 4);
        assert_eq!(cfg.upload_dir, PathBuf::from("/var/lib/fatoora/uploads"));
    }
}
