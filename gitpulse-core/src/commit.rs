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

//! Commit projection returned by the aggregation engine.
//!
//! A commit's identity is `(sha, source_repository.full_name)`: the same sha
//! can legitimately appear once per repository when forks are aggregated
//! together, but never twice for the same repository in one result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to the repository a commit was fetched from.
///
/// Attached by the aggregation engine after the fetch; it is not part of the
/// upstream commit payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoRef {
    pub full_name: String,
}

impl RepoRef {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Unique within `source_repository`.
    pub sha: String,
    pub message: String,
    /// Display name from the commit signature. May differ from `author_login`.
    pub author_name: String,
    pub author_date: DateTime<Utc>,
    /// Platform login, when upstream could resolve the signature to an account.
    pub author_login: Option<String>,
    pub author_avatar_url: Option<String>,
    pub html_url: String,
    pub source_repository: RepoRef,
}

impl Commit {
    /// Identity tuple for deduplication across repositories.
    pub fn identity(&self) -> (&str, &str) {
        (&self.sha, &self.source_repository.full_name)
    }
}
