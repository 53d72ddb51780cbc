//! Command-line and environment configuration
//!
//! Every flag has an environment fallback so both commands can be configured
//! from a `.env` file, which `main` loads before parsing.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;

pub const DEFAULT_LASTFM_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";
pub const DEFAULT_PREVIEW_SEARCH_URL: &str = "https://itunes.apple.com/search";
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

/// Last.fm credentials shared by both commands
#[derive(Args, Debug, Clone)]
pub struct LastfmArgs {
    /// Last.fm API key
    #[arg(long, env = "LASTFM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Listener whose scrobbles are looked up
    #[arg(long, env = "LASTFM_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "LASTFM_API_URL", default_value = DEFAULT_LASTFM_API_URL)]
    pub lastfm_url: String,

    /// Timeout for every outbound request, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct PlayerArgs {
    /// Identity-hiding proxy to query instead of Last.fm directly
    #[arg(long, env = "NOW_PLAYING_PROXY_URL")]
    pub proxy_url: Option<String>,

    #[arg(long, env = "PREVIEW_SEARCH_URL", default_value = DEFAULT_PREVIEW_SEARCH_URL)]
    pub preview_url: String,

    #[command(flatten)]
    pub lastfm: LastfmArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ProxyArgs {
    #[arg(long, env = "PROXY_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Extra origins echoed back in CORS headers (comma separated)
    #[arg(long, env = "PROXY_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    #[command(flatten)]
    pub lastfm: LastfmArgs,
}

/// Where the resolver reads the listening history from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryEndpoint {
    /// Credentials and listener identity are injected server-side
    Proxy { url: String },
    Direct {
        api_url: String,
        api_key: String,
        username: String,
    },
}

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    pub history: HistoryEndpoint,
    pub preview_search_url: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct ProxyConfig {
    pub bind: SocketAddr,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub upstream_url: String,
    pub allowed_origins: Vec<String>,
    pub timeout: Duration,
}

impl PlayerArgs {
    pub fn into_config(self) -> Result<ResolverConfig> {
        let timeout = Duration::from_secs(self.lastfm.timeout_secs);

        let history = match self.proxy_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => HistoryEndpoint::Proxy { url },
            None => {
                let api_key = non_empty(self.lastfm.api_key);
                let username = non_empty(self.lastfm.username);
                match (api_key, username) {
                    (Some(api_key), Some(username)) => HistoryEndpoint::Direct {
                        api_url: self.lastfm.lastfm_url,
                        api_key,
                        username,
                    },
                    _ => bail!(
                        "set NOW_PLAYING_PROXY_URL, or both LASTFM_API_KEY and LASTFM_USERNAME"
                    ),
                }
            }
        };

        Ok(ResolverConfig {
            history,
            preview_search_url: self.preview_url,
            timeout,
        })
    }
}

impl ProxyArgs {
    /// Missing credentials are not an error here: the proxy still starts and
    /// answers with a "not configured" payload so the operator can diagnose it.
    pub fn into_config(self) -> ProxyConfig {
        let mut allowed_origins: Vec<String> =
            DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect();
        allowed_origins.extend(
            self.allowed_origins
                .into_iter()
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty()),
        );

        ProxyConfig {
            bind: self.bind,
            api_key: non_empty(self.lastfm.api_key),
            username: non_empty(self.lastfm.username),
            upstream_url: self.lastfm.lastfm_url,
            allowed_origins,
            timeout: Duration::from_secs(self.lastfm.timeout_secs),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
