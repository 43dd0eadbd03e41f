use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

pub const HOST_KEY: &str = "QBITTORRENT_HOST";
pub const PORT_KEY: &str = "QBITTORRENT_PORT";
pub const USERNAME_KEY: &str = "QBITTORRENT_USERNAME";
pub const PASSWORD_KEY: &str = "QBITTORRENT_PASSWORD";

const DEFAULT_PORT: u16 = 8080;

/// Connection settings for the torrent client's Web API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentClientConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl TorrentClientConfig {
    /// Read a key=value file. The process environment is left untouched.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::TorrentConfigMissing(format!(
                "{} not found",
                path.display()
            )));
        }

        let values = dotenvy::from_path_iter(path)
            .map_err(|e| Error::TorrentConfigMissing(format!("{}: {e}", path.display())))?
            .collect::<std::result::Result<HashMap<String, String>, _>>()
            .map_err(|e| Error::TorrentConfigMissing(format!("{}: {e}", path.display())))?;

        Self::from_values(&values)
    }

    pub fn from_values(values: &HashMap<String, String>) -> Result<Self> {
        let required = |key: &str| {
            values
                .get(key)
                .filter(|value| !value.trim().is_empty())
                .cloned()
                .ok_or_else(|| Error::TorrentConfigMissing(format!("{key} is not set")))
        };

        let port = match values.get(PORT_KEY) {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| Error::TorrentConfigMissing(format!("{PORT_KEY} is not a port: {port}")))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: required(HOST_KEY)?,
            port,
            username: required(USERNAME_KEY)?,
            password: required(PASSWORD_KEY)?,
        })
    }

    /// Base URL of the Web API; a bare host gets `http://`.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}:{}", self.port)
        } else {
            format!("http://{host}:{}", self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "QBITTORRENT_HOST=nas.local\nQBITTORRENT_PORT=9090\nQBITTORRENT_USERNAME=admin\nQBITTORRENT_PASSWORD=\"secret pass\"\n",
        )
        .unwrap();

        let config = TorrentClientConfig::from_file(&path).unwrap();
        assert_eq!(config.host, "nas.local");
        assert_eq!(config.port, 9090);
        assert_eq!(config.password, "secret pass");
        assert_eq!(config.base_url(), "http://nas.local:9090");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let result = TorrentClientConfig::from_file(dir.path().join("absent.env"));
        assert!(matches!(result, Err(Error::TorrentConfigMissing(_))));
    }

    #[test]
    fn test_defaults_and_missing_keys() {
        let mut values = HashMap::new();
        values.insert(HOST_KEY.to_string(), "https://seedbox".to_string());
        values.insert(USERNAME_KEY.to_string(), "u".to_string());
        assert!(matches!(
            TorrentClientConfig::from_values(&values),
            Err(Error::TorrentConfigMissing(_))
        ));

        values.insert(PASSWORD_KEY.to_string(), "p".to_string());
        let config = TorrentClientConfig::from_values(&values).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.base_url(), "https://seedbox:8080");

        values.insert(PORT_KEY.to_string(), "eighty".to_string());
        assert!(TorrentClientConfig::from_values(&values).is_err());
    }
}
