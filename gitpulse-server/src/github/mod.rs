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

//! Upstream source-control API client.
//!
//! `SourceClient` is the seam between the aggregation pipeline and the hosted
//! git API. The production implementation (`GitHubClient`) talks to the
//! GitHub REST v3 API over reqwest; tests substitute an in-memory fake.
//! All paginated operations are exhausted internally, so callers never see
//! page mechanics.

use chrono::{DateTime, Utc};
use gitpulse_core::{Credential, DateWindow, Repository, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

mod client;
pub mod models;

pub use client::{GitHubClient, GitHubClientFactory};

/// A commit as fetched from one repository, before the aggregation engine
/// attaches the source-repository reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitData {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_date: DateTime<Utc>,
    pub author_login: Option<String>,
    pub author_avatar_url: Option<String>,
    pub html_url: String,
}

/// Remaining call budget as reported by upstream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait SourceClient: Send + Sync {
    /// Repositories visible to the authenticated user: owned, collaborator,
    /// and organization-member affiliations in a single pass.
    async fn list_repositories_for_user(&self) -> Result<Vec<Repository>>;

    /// Repositories accessible to an app installation.
    async fn list_repositories_for_installation(&self) -> Result<Vec<Repository>>;

    /// Commits for one repository within `window`, optionally filtered by
    /// author login, in upstream (reverse-chronological) order.
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        window: &DateWindow,
        author: Option<&str>,
    ) -> Result<Vec<CommitData>>;

    /// Current rate-limit budget.
    async fn rate_limit(&self) -> Result<RateLimitStatus>;

    /// Permission scopes granted to the token. Installation tokens carry no
    /// scope header; implementations return an empty list for them.
    async fn granted_scopes(&self) -> Result<Vec<String>>;
}

/// Builds a `SourceClient` for a request's credential.
///
/// One client is constructed per request; the underlying connection pool is
/// shared through the factory, so construction stays cheap.
pub trait ClientFactory: Send + Sync {
    fn client_for(&self, credential: &Credential) -> Result<Arc<dyn SourceClient>>;
}
