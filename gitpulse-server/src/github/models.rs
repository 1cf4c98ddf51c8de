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

//! Wire types for the GitHub REST v3 API.
//!
//! These mirror the upstream JSON shapes and are converted into the domain
//! projections immediately after deserialization; nothing outside the client
//! touches them.

use super::CommitData;
use chrono::{DateTime, Utc};
use gitpulse_core::Repository;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RawOwner {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct RawRepository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: RawOwner,
    pub private: bool,
    pub language: Option<String>,
    pub html_url: String,
}

impl From<RawRepository> for Repository {
    fn from(raw: RawRepository) -> Self {
        Repository {
            id: raw.id,
            name: raw.name,
            full_name: raw.full_name,
            owner: raw.owner.login,
            private: raw.private,
            language: raw.language,
            html_url: raw.html_url,
        }
    }
}

/// Envelope returned by `GET /installation/repositories`.
#[derive(Debug, Deserialize)]
pub struct RawInstallationRepositories {
    pub repositories: Vec<RawRepository>,
}

#[derive(Debug, Deserialize)]
pub struct RawCommitSignature {
    pub name: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RawCommitDetail {
    pub message: String,
    pub author: RawCommitSignature,
}

/// The resolved platform account for a commit author. Absent when upstream
/// cannot match the signature to an account.
#[derive(Debug, Deserialize)]
pub struct RawActor {
    pub login: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawCommitItem {
    pub sha: String,
    pub commit: RawCommitDetail,
    pub author: Option<RawActor>,
    pub html_url: String,
}

impl From<RawCommitItem> for CommitData {
    fn from(raw: RawCommitItem) -> Self {
        let (author_login, author_avatar_url) = match raw.author {
            Some(actor) => (Some(actor.login), actor.avatar_url),
            None => (None, None),
        };
        CommitData {
            sha: raw.sha,
            message: raw.commit.message,
            author_name: raw.commit.author.name,
            author_date: raw.commit.author.date,
            author_login,
            author_avatar_url,
            html_url: raw.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawRateWindow {
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds.
    pub reset: i64,
}

/// Envelope returned by `GET /rate_limit`.
#[derive(Debug, Deserialize)]
pub struct RawRateLimit {
    pub rate: RawRateWindow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_item_maps_unresolved_author() {
        let json = r#"{
            "sha": "abc123",
            "html_url": "https://github.com/acme/api/commit/abc123",
            "commit": {
                "message": "fix build",
                "author": { "name": "Alice", "date": "2024-01-15T10:30:00Z" }
            },
            "author": null
        }"#;

        let raw: RawCommitItem = serde_json::from_str(json).expect("Should deserialize");
        let data = CommitData::from(raw);
        assert_eq!(data.author_name, "Alice");
        assert!(data.author_login.is_none());
        assert!(data.author_avatar_url.is_none());
    }

    #[test]
    fn test_repository_flattens_owner() {
        let json = r#"{
            "id": 17,
            "name": "api",
            "full_name": "acme/api",
            "owner": { "login": "acme" },
            "private": false,
            "language": "TypeScript",
            "html_url": "https://github.com/acme/api"
        }"#;

        let raw: RawRepository = serde_json::from_str(json).expect("Should deserialize");
        let repo = Repository::from(raw);
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.full_name, "acme/api");
    }
}
