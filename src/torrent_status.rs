use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::TorrentClientConfig;
use crate::error::{Error, Result};
use crate::watch_registry::strip_trailing_separator;

/// Source of the directories that still have active downloads.
#[async_trait]
pub trait TorrentStatus: Send + Sync {
    /// Save paths of every torrent currently downloading, trailing separator stripped.
    async fn downloading_paths(&self) -> Result<HashSet<String>>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct TorrentInfo {
    #[serde(default)]
    pub name: String,
    pub save_path: String,
    #[serde(default)]
    pub state: String,
}

/// qBittorrent Web API client.
#[derive(Debug)]
pub struct QBittorrentClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl QBittorrentClient {
    pub fn new(config: &TorrentClientConfig) -> Result<Self> {
        Self::with_base_url(&config.base_url(), &config.username, &config.password)
    }

    pub fn with_base_url(base_url: &str, username: &str, password: &str) -> Result<Self> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Authenticate; the session cookie is kept by the client.
    pub async fn login(&self) -> Result<()> {
        let url = format!("{}/api/v2/auth/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::REFERER, &self.base_url)
            .form(&[("username", self.username.as_str()), ("password", self.password.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(Error::TorrentAuth(
                "too many failed login attempts, client IP is banned".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(Error::TorrentApi(format!("login returned HTTP {status}")));
        }

        let body = response.text().await?;
        if body.trim() != "Ok." {
            return Err(Error::TorrentAuth(body.trim().to_string()));
        }

        tracing::debug!(url = %self.base_url, "logged in to qBittorrent");
        Ok(())
    }

    pub async fn downloading(&self) -> Result<Vec<TorrentInfo>> {
        let url = format!("{}/api/v2/torrents/info", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("filter", "downloading")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(Error::TorrentAuth("session rejected".to_string()));
        }
        if !status.is_success() {
            return Err(Error::TorrentApi(format!("torrent list returned HTTP {status}")));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TorrentStatus for QBittorrentClient {
    async fn downloading_paths(&self) -> Result<HashSet<String>> {
        self.login().await?;
        let torrents = self.downloading().await?;

        for torrent in &torrents {
            tracing::debug!(name = %torrent.name, save_path = %torrent.save_path, state = %torrent.state, "torrent downloading");
        }

        Ok(torrents
            .iter()
            .map(|torrent| strip_trailing_separator(&torrent.save_path).to_string())
            .collect())
    }
}
