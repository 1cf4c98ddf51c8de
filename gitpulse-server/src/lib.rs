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

//! GitPulse Server
//!
//! HTTP transport around the commit aggregation pipeline: repository
//! discovery, batched commit retrieval with author fallback, and
//! conditional-request response caching.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod github;
pub mod guard;
pub mod middleware;
pub mod test_support;

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{
    get_commit_activity, health_check, health_check_detailed, list_repositories, AppState,
};
use config::ServerConfig;
use github::GitHubClientFactory;

/// Build the application router for `state`.
///
/// Split out of `run_server` so tests can drive the full stack without
/// binding a socket.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/health", get(health_check_detailed))
        .route("/api/v1/repositories", get(list_repositories))
        .route("/api/v1/activity/commits", get(get_commit_activity))
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::compression::compression_layer())
        .layer(TraceLayer::new_for_http());

    if config.server.enable_cors {
        let mut cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

        // If specific origins configured, use them; otherwise allow all (dev mode)
        if config.server.cors_origins.is_empty() {
            tracing::warn!(
                "CORS: Allowing all origins (development mode). Set cors_origins in production!"
            );
            cors = cors.allow_origin(Any);
        } else {
            tracing::info!("CORS: Allowing origins: {:?}", config.server.cors_origins);
            cors = cors.allow_origin(Any);
        }
        router.layer(cors)
    } else {
        router
    }
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gitpulse_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting GitPulse Server");

    // Validate configuration
    config.validate()?;

    let factory = Arc::new(GitHubClientFactory::new(config.github.clone()));
    tracing::info!(
        upstream = %config.github.api_base_url,
        "upstream client factory initialized"
    );

    let addr = config.socket_addr()?;
    let state = AppState::new(config, factory);
    let app = app(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
    }
}
