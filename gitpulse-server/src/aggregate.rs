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

//! Commit Aggregation Engine.
//!
//! Fetches commits from many repositories inside a date window, with bounded
//! fan-out and an author-resolution fallback.
//!
//! ## Batching
//!
//! Repositories are processed in fixed batches of [`BATCH_SIZE`]. Batches run
//! strictly in sequence; within a batch the per-repository fetches run
//! concurrently. The concatenated result is therefore deterministic at the
//! batch level, and commits within one repository keep upstream order.
//!
//! ## Author fallback
//!
//! Upstream author filtering is brittle: display names, committer identities,
//! and logins frequently disagree. When a caller-supplied filter matches
//! nothing, the engine widens the filter instead of returning an empty
//! dashboard:
//!
//! ```text
//! Explicit (caller's filter) -> Owner (first repository's owner) -> Any -> Done
//! ```
//!
//! A stage advances only on an empty result. Errors propagate immediately —
//! the fallback recovers from empty results, not from failures. The first
//! non-empty stage wins outright; stages are never unioned.

use crate::github::{CommitData, SourceClient};
use futures::future;
use gitpulse_core::{Commit, DateWindow, GitPulseError, RepoRef, Result};
use tracing::{debug, info};

/// Repositories fetched concurrently per batch.
pub const BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthorStage {
    Explicit,
    Owner,
    Any,
    Done,
}

impl AuthorStage {
    fn first(has_author: bool) -> Self {
        if has_author {
            Self::Explicit
        } else {
            Self::Any
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Explicit => Self::Owner,
            Self::Owner => Self::Any,
            Self::Any | Self::Done => Self::Done,
        }
    }
}

/// Aggregate commits for `repo_names` within `window`.
///
/// An empty result is a valid outcome, not an error. A failure in any
/// repository aborts the whole aggregation; there is no per-repository
/// isolation at this layer.
pub async fn aggregate(
    client: &dyn SourceClient,
    repo_names: &[String],
    window: &DateWindow,
    author: Option<&str>,
) -> Result<Vec<Commit>> {
    if repo_names.is_empty() {
        return Ok(Vec::new());
    }

    let mut stage = AuthorStage::first(author.is_some());
    while stage != AuthorStage::Done {
        let filter = match stage {
            AuthorStage::Explicit => author.map(str::to_string),
            AuthorStage::Owner => owner_login(&repo_names[0]),
            AuthorStage::Any => None,
            AuthorStage::Done => unreachable!("loop exits before Done"),
        };

        debug!(?stage, filter = filter.as_deref(), "running aggregation stage");
        let commits = fetch_batched(client, repo_names, window, filter.as_deref()).await?;
        if !commits.is_empty() {
            info!(
                ?stage,
                commits = commits.len(),
                repositories = repo_names.len(),
                "aggregation stage produced results"
            );
            return Ok(commits);
        }

        stage = stage.next();
    }

    Ok(Vec::new())
}

/// Fetch all repositories in sequential batches of [`BATCH_SIZE`], with
/// concurrent fetches inside each batch.
async fn fetch_batched(
    client: &dyn SourceClient,
    repo_names: &[String],
    window: &DateWindow,
    author: Option<&str>,
) -> Result<Vec<Commit>> {
    let mut all = Vec::new();
    for batch in repo_names.chunks(BATCH_SIZE) {
        let fetches = batch
            .iter()
            .map(|name| fetch_repository(client, name, window, author));
        for commits in future::try_join_all(fetches).await? {
            all.extend(commits);
        }
    }
    Ok(all)
}

async fn fetch_repository(
    client: &dyn SourceClient,
    full_name: &str,
    window: &DateWindow,
    author: Option<&str>,
) -> Result<Vec<Commit>> {
    let (owner, repo) = full_name
        .split_once('/')
        .ok_or_else(|| GitPulseError::NotFound(format!("repository {full_name}")))?;

    let fetched = client.list_commits(owner, repo, window, author).await?;
    let source = RepoRef::new(full_name);
    Ok(fetched
        .into_iter()
        .map(|data| attach_source(data, source.clone()))
        .collect())
}

fn attach_source(data: CommitData, source: RepoRef) -> Commit {
    Commit {
        sha: data.sha,
        message: data.message,
        author_name: data.author_name,
        author_date: data.author_date,
        author_login: data.author_login,
        author_avatar_url: data.author_avatar_url,
        html_url: data.html_url,
        source_repository: source,
    }
}

/// Owner segment of the first repository identifier, lowercased (logins are
/// case-insensitive upstream).
fn owner_login(full_name: &str) -> Option<String> {
    full_name
        .split_once('/')
        .map(|(owner, _)| owner.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{commit_data, january_2024, FakeSourceClient};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_input_makes_zero_calls() {
        let client = FakeSourceClient::new();
        let commits = aggregate(&client, &[], &january_2024(), Some("alice"))
            .await
            .unwrap();
        assert!(commits.is_empty());
        assert_eq!(client.commit_call_count(), 0);
    }

    #[tokio::test]
    async fn test_explicit_author_hit_runs_one_stage() {
        let client = FakeSourceClient::new()
            .with_commits("acme/api", Some("alice"), vec![commit_data("a1", 10, Some("alice"))])
            .with_commits("acme/web", Some("alice"), vec![]);

        let commits = aggregate(
            &client,
            &names(&["acme/api", "acme/web"]),
            &january_2024(),
            Some("alice"),
        )
        .await
        .unwrap();

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].sha, "a1");
        // One fetch per repository, no fallback stages.
        assert_eq!(client.commit_call_count(), 2);
    }

    #[tokio::test]
    async fn test_owner_fallback_returns_owner_stage_alone() {
        // "alice" matches nothing, but the owner login does. The engine must
        // return exactly the owner-stage commits, tagged with their source.
        let client = FakeSourceClient::new()
            .with_commits("acme/api", Some("acme"), vec![
                commit_data("c1", 5, Some("acme")),
                commit_data("c2", 6, Some("acme")),
            ])
            .with_commits("acme/web", Some("acme"), vec![commit_data("c3", 7, Some("acme"))]);

        let commits = aggregate(
            &client,
            &names(&["acme/api", "acme/web"]),
            &january_2024(),
            Some("alice"),
        )
        .await
        .unwrap();

        assert_eq!(commits.len(), 3);
        assert_eq!(commits[0].source_repository.full_name, "acme/api");
        assert_eq!(commits[2].source_repository.full_name, "acme/web");
        // Two repositories, two stages (explicit then owner).
        assert_eq!(client.commit_call_count(), 4);
    }

    #[tokio::test]
    async fn test_final_fallback_drops_the_filter() {
        let client = FakeSourceClient::new()
            .with_commits("acme/api", None, vec![commit_data("n1", 20, None)]);

        let commits = aggregate(&client, &names(&["acme/api"]), &january_2024(), Some("alice"))
            .await
            .unwrap();

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].sha, "n1");
        // Explicit, owner, then unfiltered.
        assert_eq!(client.commit_call_count(), 3);
    }

    #[tokio::test]
    async fn test_owner_login_is_lowercased() {
        let client = FakeSourceClient::new()
            .with_commits("Acme/api", Some("acme"), vec![commit_data("c1", 5, Some("acme"))]);

        let commits = aggregate(&client, &names(&["Acme/api"]), &january_2024(), Some("alice"))
            .await
            .unwrap();
        assert_eq!(commits.len(), 1);
    }

    #[tokio::test]
    async fn test_all_stages_empty_is_a_valid_outcome() {
        let client = FakeSourceClient::new();
        let commits = aggregate(
            &client,
            &names(&["acme/api", "acme/web"]),
            &january_2024(),
            Some("alice"),
        )
        .await
        .unwrap();

        assert!(commits.is_empty());
        // Two repositories across three stages.
        assert_eq!(client.commit_call_count(), 6);
    }

    #[tokio::test]
    async fn test_no_author_runs_single_unfiltered_stage() {
        let client = FakeSourceClient::new();
        let commits = aggregate(&client, &names(&["acme/api"]), &january_2024(), None)
            .await
            .unwrap();
        assert!(commits.is_empty());
        assert_eq!(client.commit_call_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_order_is_deterministic() {
        let repo_names: Vec<String> = (1..=10).map(|i| format!("acme/r{i}")).collect();
        let mut client = FakeSourceClient::new();
        for (i, name) in repo_names.iter().enumerate() {
            client = client.with_commits(
                name,
                None,
                vec![commit_data(&format!("sha{}", i + 1), 10, None)],
            );
        }

        let commits = aggregate(&client, &repo_names, &january_2024(), None)
            .await
            .unwrap();
        assert_eq!(commits.len(), 10);

        // Everything from the first batch precedes everything from the second.
        let first_batch: Vec<&str> = commits[..5]
            .iter()
            .map(|c| c.source_repository.full_name.as_str())
            .collect();
        for i in 1..=5 {
            assert!(first_batch.contains(&format!("acme/r{i}").as_str()));
        }
        let second_batch: Vec<&str> = commits[5..]
            .iter()
            .map(|c| c.source_repository.full_name.as_str())
            .collect();
        for i in 6..=10 {
            assert!(second_batch.contains(&format!("acme/r{i}").as_str()));
        }
    }

    #[tokio::test]
    async fn test_single_bad_repository_aborts_the_aggregation() {
        let client = FakeSourceClient::new()
            .with_commits("acme/api", None, vec![commit_data("c1", 10, None)])
            .with_failing_repository("acme/gone");

        let err = aggregate(
            &client,
            &names(&["acme/api", "acme/gone"]),
            &january_2024(),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GitPulseError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_repository_name_is_not_found() {
        let client = FakeSourceClient::new();
        let err = aggregate(&client, &names(&["no-slash"]), &january_2024(), None)
            .await
            .unwrap_err();
        match err {
            GitPulseError::NotFound(what) => assert!(what.contains("no-slash")),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert_eq!(client.commit_call_count(), 0);
    }

    #[tokio::test]
    async fn test_commits_outside_window_are_excluded() {
        let client = FakeSourceClient::new().with_commits(
            "acme/api",
            None,
            vec![commit_data("in", 15, None), {
                let mut c = commit_data("out", 1, None);
                c.author_date = chrono::Utc::now() + chrono::Duration::days(365);
                c
            }],
        );

        let commits = aggregate(&client, &names(&["acme/api"]), &january_2024(), None)
            .await
            .unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].sha, "in");
    }
}
