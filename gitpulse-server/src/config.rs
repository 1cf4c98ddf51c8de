// Copyright 2025 GitPulse (https://github.com/gitpulse)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// GitPulse Server Configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:48200")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Allowed CORS origins (empty = allow all, use specific origins in production)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    /// API base URL; point at a GitHub Enterprise host to override
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// User-Agent sent upstream (required by the API)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Page size for paginated listings (1..=100)
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Remaining-call threshold under which the guard warns
    #[serde(default = "default_low_rate_watermark")]
    pub low_rate_watermark: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// max-age for activity responses, in seconds
    #[serde(default = "default_cache_max_age")]
    pub max_age_secs: u64,

    /// stale-while-revalidate window, in seconds
    #[serde(default = "default_cache_swr")]
    pub stale_while_revalidate_secs: u64,

    /// Whether responses are per-user (private) or shareable (public)
    #[serde(default = "default_cache_private")]
    pub private: bool,
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:48200".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_enable_cors() -> bool {
    true
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    format!("gitpulse/{}", env!("CARGO_PKG_VERSION"))
}

fn default_per_page() -> u32 {
    100
}

fn default_low_rate_watermark() -> u32 {
    100
}

fn default_cache_max_age() -> u64 {
    300
}

fn default_cache_swr() -> u64 {
    600
}

fn default_cache_private() -> bool {
    true
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            request_timeout_secs: default_request_timeout(),
            enable_cors: default_enable_cors(),
            cors_origins: vec![],
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            user_agent: default_user_agent(),
            per_page: default_per_page(),
            low_rate_watermark: default_low_rate_watermark(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_cache_max_age(),
            stale_while_revalidate_secs: default_cache_swr(),
            private: default_cache_private(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            github: GitHubConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - GITPULSE_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:48200)
    /// - GITPULSE_GITHUB_API_URL: upstream API base URL
    /// - GITPULSE_USER_AGENT: User-Agent sent upstream
    /// - GITPULSE_REQUEST_TIMEOUT: request timeout in seconds (default: 30)
    /// - GITPULSE_ENABLE_CORS: enable CORS (default: true)
    /// - GITPULSE_CACHE_MAX_AGE: response max-age in seconds (default: 300)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("GITPULSE_HTTP_ADDR") {
            config.server.listen_addr = addr;
        }

        if let Ok(timeout) = std::env::var("GITPULSE_REQUEST_TIMEOUT") {
            if let Ok(val) = timeout.parse() {
                config.server.request_timeout_secs = val;
            }
        }

        if let Ok(enable) = std::env::var("GITPULSE_ENABLE_CORS") {
            if let Ok(val) = enable.parse() {
                config.server.enable_cors = val;
            }
        }

        if let Ok(url) = std::env::var("GITPULSE_GITHUB_API_URL") {
            config.github.api_base_url = url;
        }

        if let Ok(agent) = std::env::var("GITPULSE_USER_AGENT") {
            config.github.user_agent = agent;
        }

        if let Ok(max_age) = std::env::var("GITPULSE_CACHE_MAX_AGE") {
            if let Ok(val) = max_age.parse() {
                config.cache.max_age_secs = val;
            }
        }

        config
    }

    /// Load from a file when one is given, otherwise from the environment.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::from_env()),
        }
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.github.per_page == 0 || self.github.per_page > 100 {
            anyhow::bail!(
                "github.per_page must be within 1..=100, got {}",
                self.github.per_page
            );
        }

        if !self.github.api_base_url.starts_with("http") {
            anyhow::bail!(
                "github.api_base_url must be an http(s) URL, got {}",
                self.github.api_base_url
            );
        }

        if self.github.user_agent.trim().is_empty() {
            anyhow::bail!("github.user_agent must not be empty");
        }

        if self.cache.stale_while_revalidate_secs < self.cache.max_age_secs {
            anyhow::bail!(
                "cache.stale_while_revalidate_secs ({}) must be >= cache.max_age_secs ({})",
                self.cache.stale_while_revalidate_secs,
                self.cache.max_age_secs
            );
        }

        Ok(())
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen_addr '{}': {}", self.server.listen_addr, e))
    }
}
