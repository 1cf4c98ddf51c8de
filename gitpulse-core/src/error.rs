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

//! Error taxonomy for the aggregation pipeline.
//!
//! Every failure surfaced by the pipeline is one of these kinds. The split
//! drives both retry behavior (configuration and auth errors are never
//! retried, rate limits are retryable after the reset instant) and the HTTP
//! status mapping in the server crate.

use chrono::{DateTime, Utc};

/// Result alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, GitPulseError>;

#[derive(Debug, thiserror::Error)]
pub enum GitPulseError {
    /// Missing client or credentials. Always fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The token itself was rejected upstream (401, or a 403 that is not a
    /// rate-limit response).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The token is valid but lacks a mandatory permission scope.
    #[error("insufficient permission scope: {0}")]
    AuthScope(String),

    /// Upstream call budget exhausted. Carries the instant the quota resets.
    #[error("rate limit exhausted, resets at {reset_at}")]
    RateLimit { reset_at: DateTime<Utc> },

    /// Repository is inaccessible or does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Catch-all for other upstream failures. `status` is `None` when the
    /// request never produced a response (connect failure, timeout).
    #[error("upstream api failure: {message}")]
    UpstreamApi {
        status: Option<u16>,
        message: String,
    },
}

impl GitPulseError {
    /// Whether this error indicates the credential itself is the problem.
    ///
    /// The rate/scope guard swallows probe failures except for these, which
    /// always propagate: retrying with the same token cannot succeed.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::AuthScope(_))
    }

    /// Actionable message for the end user, without raw upstream error text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(_) => "The service is misconfigured. Contact the administrator.".into(),
            Self::Auth(_) => "Your session is no longer valid. Please re-authenticate.".into(),
            Self::AuthScope(scope) => format!(
                "Your token is missing the '{scope}' permission. Re-authenticate and grant it."
            ),
            Self::RateLimit { reset_at } => format!(
                "The upstream API rate limit was reached. Retry after {}.",
                reset_at.to_rfc3339()
            ),
            Self::NotFound(what) => format!("{what} was not found or is not accessible."),
            Self::UpstreamApi { .. } => "The upstream API is unavailable. Try again shortly.".into(),
        }
    }
}
