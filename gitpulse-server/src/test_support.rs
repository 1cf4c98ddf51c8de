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

//! In-memory `SourceClient` for unit and integration tests. No network.

use crate::github::{ClientFactory, CommitData, RateLimitStatus, SourceClient};
use chrono::{TimeZone, Utc};
use gitpulse_core::{Credential, DateWindow, GitPulseError, Repository, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How an injected probe failure should present itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Connection-level failure; the guard tolerates these.
    Transport,
    /// Upstream rejected the token; always propagates.
    Auth,
}

impl ProbeFailure {
    fn into_error(self) -> GitPulseError {
        match self {
            Self::Transport => GitPulseError::UpstreamApi {
                status: None,
                message: "connection reset".into(),
            },
            Self::Auth => GitPulseError::Auth("token rejected by upstream".into()),
        }
    }
}

/// Scriptable fake upstream. Fixtures are keyed by repository full name and
/// author filter; lookups count calls so tests can assert on fan-out.
#[derive(Default)]
pub struct FakeSourceClient {
    user_repositories: Vec<Repository>,
    installation_repositories: Vec<Repository>,
    commits: HashMap<(String, Option<String>), Vec<CommitData>>,
    failing_repositories: HashSet<String>,
    scopes: Vec<String>,
    remaining_budget: u32,
    rate_probe_failure: Option<ProbeFailure>,
    scope_probe_failure: Option<ProbeFailure>,
    commit_calls: AtomicUsize,
    listing_calls: AtomicUsize,
}

impl FakeSourceClient {
    pub fn new() -> Self {
        Self {
            scopes: vec!["repo".into(), "read:org".into()],
            remaining_budget: 5000,
            ..Default::default()
        }
    }

    pub fn with_user_repository(mut self, repo: Repository) -> Self {
        self.user_repositories.push(repo);
        self
    }

    pub fn with_installation_repository(mut self, repo: Repository) -> Self {
        self.installation_repositories.push(repo);
        self
    }

    /// Register commits returned for `full_name` under an author filter.
    /// `author: None` is the unfiltered listing.
    pub fn with_commits(
        mut self,
        full_name: &str,
        author: Option<&str>,
        commits: Vec<CommitData>,
    ) -> Self {
        self.commits
            .insert((full_name.to_string(), author.map(str::to_string)), commits);
        self
    }

    /// Every commit fetch for `full_name` fails with `NotFound`.
    pub fn with_failing_repository(mut self, full_name: &str) -> Self {
        self.failing_repositories.insert(full_name.to_string());
        self
    }

    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.scopes = scopes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_remaining_budget(mut self, remaining: u32) -> Self {
        self.remaining_budget = remaining;
        self
    }

    pub fn with_rate_probe_failure(mut self, failure: ProbeFailure) -> Self {
        self.rate_probe_failure = Some(failure);
        self
    }

    pub fn with_scope_probe_failure(mut self, failure: ProbeFailure) -> Self {
        self.scope_probe_failure = Some(failure);
        self
    }

    /// Number of per-repository commit fetches issued so far.
    pub fn commit_call_count(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    /// Number of repository listing calls issued so far.
    pub fn listing_call_count(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SourceClient for FakeSourceClient {
    async fn list_repositories_for_user(&self) -> Result<Vec<Repository>> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.user_repositories.clone())
    }

    async fn list_repositories_for_installation(&self) -> Result<Vec<Repository>> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.installation_repositories.clone())
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        window: &DateWindow,
        author: Option<&str>,
    ) -> Result<Vec<CommitData>> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);

        let full_name = format!("{owner}/{repo}");
        if self.failing_repositories.contains(&full_name) {
            return Err(GitPulseError::NotFound(format!("repository {full_name}")));
        }

        let commits = self
            .commits
            .get(&(full_name, author.map(str::to_string)))
            .cloned()
            .unwrap_or_default();

        Ok(commits
            .into_iter()
            .filter(|commit| window.contains(commit.author_date))
            .collect())
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus> {
        if let Some(failure) = self.rate_probe_failure {
            return Err(failure.into_error());
        }
        Ok(RateLimitStatus {
            limit: 5000,
            remaining: self.remaining_budget,
            reset_at: Utc::now() + chrono::Duration::minutes(30),
        })
    }

    async fn granted_scopes(&self) -> Result<Vec<String>> {
        if let Some(failure) = self.scope_probe_failure {
            return Err(failure.into_error());
        }
        Ok(self.scopes.clone())
    }
}

/// Factory handing out one pre-built fake regardless of credential.
pub struct FakeClientFactory {
    client: Arc<FakeSourceClient>,
}

impl FakeClientFactory {
    pub fn new(client: Arc<FakeSourceClient>) -> Self {
        Self { client }
    }
}

impl ClientFactory for FakeClientFactory {
    fn client_for(&self, _credential: &Credential) -> Result<Arc<dyn SourceClient>> {
        Ok(self.client.clone())
    }
}

/// Fixture repository with `owner/name` derived from `full_name`.
pub fn repository(id: u64, full_name: &str) -> Repository {
    let (owner, name) = full_name.split_once('/').expect("fixture full_name has an owner");
    Repository {
        id,
        name: name.to_string(),
        full_name: full_name.to_string(),
        owner: owner.to_string(),
        private: false,
        language: Some("Rust".to_string()),
        html_url: format!("https://github.com/{full_name}"),
    }
}

/// Fixture commit dated inside January 2024.
pub fn commit_data(sha: &str, day: u32, author_login: Option<&str>) -> CommitData {
    CommitData {
        sha: sha.to_string(),
        message: format!("commit {sha}"),
        author_name: author_login.unwrap_or("Unknown").to_string(),
        author_date: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
        author_login: author_login.map(str::to_string),
        author_avatar_url: None,
        html_url: format!("https://github.com/example/commit/{sha}"),
    }
}

/// The window every fixture commit falls into.
pub fn january_2024() -> DateWindow {
    DateWindow::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
    )
}
