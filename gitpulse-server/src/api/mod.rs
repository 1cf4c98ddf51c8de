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

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use gitpulse_core::{Credential, GitPulseError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;
use crate::github::ClientFactory;

pub mod activity;
pub mod health;
pub mod repositories;

pub use activity::get_commit_activity;
pub use health::{health_check, health_check_detailed};
pub use repositories::list_repositories;

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Seconds until the upstream quota resets.
        retry_after_secs: Option<u64>,
    },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<GitPulseError> for ApiError {
    fn from(err: GitPulseError) -> Self {
        let message = err.user_message();
        match err {
            GitPulseError::Configuration(_) => Self::Internal(message),
            GitPulseError::Auth(_) => Self::Unauthorized(message),
            GitPulseError::AuthScope(_) => Self::Forbidden(message),
            GitPulseError::RateLimit { reset_at } => {
                let retry_after_secs = (reset_at - Utc::now()).num_seconds().try_into().ok();
                Self::RateLimited {
                    message,
                    retry_after_secs,
                }
            }
            GitPulseError::NotFound(_) => Self::NotFound(message),
            GitPulseError::UpstreamApi { .. } => Self::UpstreamUnavailable(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::RateLimited {
                message,
                retry_after_secs,
            } => (StatusCode::TOO_MANY_REQUESTS, message, retry_after_secs),
            ApiError::UpstreamUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let mut response = (status, Json(ErrorResponse { error: message })).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub clients: Arc<dyn ClientFactory>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, clients: Arc<dyn ClientFactory>) -> Self {
        Self {
            config: Arc::new(config),
            clients,
            started_at: Instant::now(),
        }
    }
}

/// Pull the request credential out of the headers.
///
/// `Authorization: Bearer <token>` supplies the token; an
/// `X-Installation-Id` header upgrades it to an installation identity, which
/// takes priority over the OAuth form.
pub fn extract_credential(headers: &HeaderMap) -> Result<Credential, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

    let installation = match headers.get("x-installation-id") {
        Some(value) => {
            let id: u64 = value
                .to_str()
                .ok()
                .and_then(|raw| raw.trim().parse().ok())
                .ok_or_else(|| ApiError::BadRequest("invalid X-Installation-Id header".into()))?;
            Some(Credential::Installation {
                installation_id: id,
                token: token.to_string(),
            })
        }
        None => None,
    };

    let oauth = Credential::OAuth {
        token: token.to_string(),
    };

    match Credential::resolve(Some(oauth), installation) {
        Some(credential) => Ok(credential),
        None => Err(ApiError::Unauthorized("missing bearer token".into())),
    }
}
