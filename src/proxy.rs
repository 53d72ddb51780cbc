//! Identity-hiding proxy for the scrobble history lookup
//!
//! The browser-facing route takes no parameters: the Last.fm key and the
//! listener identity only exist in the server's environment. The upstream JSON
//! is returned unchanged. Errors come back as small JSON payloads so the
//! operator can tell a missing configuration from an upstream outage.

use std::sync::Arc;

use anyhow::{Result, bail};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use reqwest::Client;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ProxyConfig;

pub const ROUTE: &str = "/api/lastfm";
const CACHE_CONTROL: &str = "s-maxage=60, stale-while-revalidate";
const REDACTED_KEY_CHARS: usize = 8;

#[derive(Clone)]
pub struct ProxyState {
    http: Client,
    config: Arc<ProxyConfig>,
}

impl ProxyState {
    pub fn new(http: Client, config: ProxyConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route(ROUTE, any(recent_tracks))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

pub async fn serve(config: ProxyConfig) -> Result<()> {
    let http = Client::builder().timeout(config.timeout).build()?;
    let bind = config.bind;

    info!(
        has_key = config.api_key.is_some(),
        has_username = config.username.is_some(),
        origins = config.allowed_origins.len(),
        "Proxy configured"
    );

    let app = router(ProxyState::new(http, config));

    info!("Proxy listening on http://{}{}", bind, ROUTE);
    let listener = TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn recent_tracks(
    State(state): State<ProxyState>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let cors = cors_headers(&state.config.allowed_origins, headers.get(header::ORIGIN));

    let response = if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else if method == Method::GET {
        forward(&state).await
    } else {
        warn!(%method, "Rejected non-GET request");
        (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": "Method not allowed" })),
        )
            .into_response()
    };

    (cors, response).into_response()
}

/// Echo the origin when it is allowed, otherwise fall back to `*`
fn cors_headers(allowed_origins: &[String], origin: Option<&HeaderValue>) -> HeaderMap {
    let allow_origin = origin
        .filter(|value| {
            value
                .to_str()
                .is_ok_and(|origin| allowed_origins.iter().any(|allowed| allowed == origin))
        })
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    headers
}

async fn forward(state: &ProxyState) -> Response {
    let config = &state.config;

    let (Some(api_key), Some(username)) = (&config.api_key, &config.username) else {
        let has_key = config.api_key.is_some();
        let has_username = config.username.is_some();
        warn!(has_key, has_username, "Missing Last.fm credentials");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "API not configured",
                "details": { "hasKey": has_key, "hasUsername": has_username }
            })),
        )
            .into_response();
    };

    match fetch_recent_tracks(&state.http, &config.upstream_url, api_key, username).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => {
            error!(error = %e, "Last.fm API error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to fetch track data",
                    "message": e.to_string(),
                    "url": redacted_url(&config.upstream_url, username, api_key),
                })),
            )
                .into_response()
        }
    }
}

async fn fetch_recent_tracks(
    http: &Client,
    upstream_url: &str,
    api_key: &str,
    username: &str,
) -> Result<Value> {
    let response = http
        .get(upstream_url)
        .query(&[
            ("method", "user.getrecenttracks"),
            ("user", username),
            ("api_key", api_key),
            ("format", "json"),
            ("limit", "1"),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        bail!("Last.fm API error: {}", status);
    }

    Ok(response.json::<Value>().await?)
}

/// The upstream URL for diagnostics, with the key cut down to a prefix
fn redacted_url(upstream_url: &str, username: &str, api_key: &str) -> String {
    let key_prefix: String = api_key.chars().take(REDACTED_KEY_CHARS).collect();
    format!(
        "{}?method=user.getrecenttracks&user={}&api_key={}...&format=json&limit=1",
        upstream_url, username, key_prefix
    )
}
