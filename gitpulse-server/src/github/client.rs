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

//! GitHub REST v3 implementation of `SourceClient`.
//!
//! One instance per request credential; the reqwest connection pool is shared
//! through `GitHubClientFactory`. Pagination walks `page`/`per_page` until a
//! short page returns, so every listing is exhausted before it is handed to
//! the pipeline.

use super::models::{
    RawCommitItem, RawInstallationRepositories, RawRateLimit, RawRepository,
};
use super::{ClientFactory, CommitData, RateLimitStatus, SourceClient};
use crate::config::GitHubConfig;
use chrono::{DateTime, TimeZone, Utc};
use gitpulse_core::{Credential, DateWindow, GitPulseError, Repository, Result};
// reqwest re-exports its own http types; axum's `http` 1.x types are a
// different crate version and must not be mixed in here.
use reqwest::header::{HeaderMap, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Upstream error bodies are truncated to this many bytes before they are
/// carried in an error; they are logged, never shown to end users.
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    user_agent: String,
    per_page: u32,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, config: &GitHubConfig, credential: &Credential) -> Result<Self> {
        let token = credential.token().trim().to_string();
        if token.is_empty() {
            return Err(GitPulseError::Configuration(
                "credential token is empty".into(),
            ));
        }

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token,
            user_agent: config.user_agent.clone(),
            per_page: config.per_page,
        })
    }

    /// Issue one GET and return the response after status classification.
    /// `context` names the resource for not-found and permission errors.
    async fn get(&self, path: &str, query: &[(&str, String)], context: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT, "application/vnd.github+json")
            .query(query)
            .send()
            .await
            .map_err(|err| GitPulseError::UpstreamApi {
                status: None,
                message: format!("request to {path} failed: {err}"),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &headers, context, &body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<T> {
        let response = self.get(path, query, context).await?;
        response.json::<T>().await.map_err(|err| GitPulseError::UpstreamApi {
            status: None,
            message: format!("invalid response body from {path}: {err}"),
        })
    }

    /// Walk every page of a listing. `extract` unwraps the page payload into
    /// its item list (some endpoints wrap items in an envelope).
    async fn paginate<P, T, F>(
        &self,
        path: &str,
        base_query: &[(&str, String)],
        context: &str,
        extract: F,
    ) -> Result<Vec<T>>
    where
        P: DeserializeOwned,
        F: Fn(P) -> Vec<T>,
    {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut query: Vec<(&str, String)> = base_query.to_vec();
            query.push(("per_page", self.per_page.to_string()));
            query.push(("page", page.to_string()));

            let payload: P = self.get_json(path, &query, context).await?;
            let batch = extract(payload);
            let fetched = batch.len();
            items.extend(batch);

            if (fetched as u32) < self.per_page {
                break;
            }
            page += 1;
        }

        debug!(path, pages = page, total = items.len(), "paginated listing exhausted");
        Ok(items)
    }
}

#[async_trait::async_trait]
impl SourceClient for GitHubClient {
    async fn list_repositories_for_user(&self) -> Result<Vec<Repository>> {
        let query = [
            ("affiliation", "owner,collaborator,organization_member".to_string()),
            ("visibility", "all".to_string()),
            ("sort", "updated".to_string()),
        ];
        self.paginate::<Vec<RawRepository>, _, _>(
            "/user/repos",
            &query,
            "repository listing",
            |page| page.into_iter().map(Repository::from).collect(),
        )
        .await
    }

    async fn list_repositories_for_installation(&self) -> Result<Vec<Repository>> {
        self.paginate::<RawInstallationRepositories, _, _>(
            "/installation/repositories",
            &[],
            "installation repository listing",
            |envelope| {
                envelope
                    .repositories
                    .into_iter()
                    .map(Repository::from)
                    .collect()
            },
        )
        .await
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        window: &DateWindow,
        author: Option<&str>,
    ) -> Result<Vec<CommitData>> {
        let path = format!("/repos/{owner}/{repo}/commits");
        let context = format!("repository {owner}/{repo}");

        let mut query = vec![
            ("since", window.since.to_rfc3339()),
            ("until", window.until.to_rfc3339()),
        ];
        if let Some(author) = author {
            query.push(("author", author.to_string()));
        }

        self.paginate::<Vec<RawCommitItem>, _, _>(&path, &query, &context, |page| {
            page.into_iter().map(CommitData::from).collect()
        })
        .await
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus> {
        let payload: RawRateLimit = self.get_json("/rate_limit", &[], "rate limit").await?;
        Ok(RateLimitStatus {
            limit: payload.rate.limit,
            remaining: payload.rate.remaining,
            reset_at: epoch_to_datetime(payload.rate.reset),
        })
    }

    async fn granted_scopes(&self) -> Result<Vec<String>> {
        let response = self.get("/user", &[], "authenticated user").await?;
        let scopes = response
            .headers()
            .get("x-oauth-scopes")
            .and_then(|value| value.to_str().ok())
            .map(parse_scopes)
            .unwrap_or_default();
        Ok(scopes)
    }
}

/// Shares one connection pool across all per-request clients.
pub struct GitHubClientFactory {
    http: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubClientFactory {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

impl ClientFactory for GitHubClientFactory {
    fn client_for(&self, credential: &Credential) -> Result<Arc<dyn SourceClient>> {
        let client = GitHubClient::new(self.http.clone(), &self.config, credential)?;
        Ok(Arc::new(client))
    }
}

/// Map a non-2xx upstream status to the error taxonomy.
///
/// A 403 is a rate-limit exhaustion when `x-ratelimit-remaining` is zero;
/// every other 403 is a permission problem.
fn classify_status(status: StatusCode, headers: &HeaderMap, context: &str, body: &str) -> GitPulseError {
    match status {
        StatusCode::UNAUTHORIZED => GitPulseError::Auth("token rejected by upstream".into()),
        StatusCode::FORBIDDEN => {
            if header_u32(headers, "x-ratelimit-remaining") == Some(0) {
                let reset_at = header_i64(headers, "x-ratelimit-reset")
                    .map(epoch_to_datetime)
                    .unwrap_or_else(Utc::now);
                GitPulseError::RateLimit { reset_at }
            } else {
                GitPulseError::AuthScope(format!("access to {context} denied"))
            }
        }
        StatusCode::NOT_FOUND => GitPulseError::NotFound(context.to_string()),
        other => {
            let mut message = body.to_string();
            message.truncate(MAX_ERROR_BODY);
            GitPulseError::UpstreamApi {
                status: Some(other.as_u16()),
                message,
            }
        }
    }
}

fn parse_scopes(header: &str) -> Vec<String> {
    header
        .split(',')
        .map(|scope| scope.trim().to_string())
        .filter(|scope| !scope.is_empty())
        .collect()
}

fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

fn epoch_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_401_is_auth() {
        let err = classify_status(StatusCode::UNAUTHORIZED, &HeaderMap::new(), "x", "");
        assert!(matches!(err, GitPulseError::Auth(_)));
    }

    #[test]
    fn test_403_with_exhausted_budget_is_rate_limit() {
        let hdrs = headers(&[
            ("x-ratelimit-remaining", "0"),
            ("x-ratelimit-reset", "1717243200"),
        ]);
        let err = classify_status(StatusCode::FORBIDDEN, &hdrs, "x", "");
        match err {
            GitPulseError::RateLimit { reset_at } => {
                assert_eq!(reset_at, epoch_to_datetime(1717243200));
            }
            other => panic!("expected RateLimit, got {other:?}"),
        }
    }

    #[test]
    fn test_403_with_budget_left_is_scope_error() {
        let hdrs = headers(&[("x-ratelimit-remaining", "37")]);
        let err = classify_status(StatusCode::FORBIDDEN, &hdrs, "repository acme/api", "");
        match err {
            GitPulseError::AuthScope(msg) => assert!(msg.contains("acme/api")),
            other => panic!("expected AuthScope, got {other:?}"),
        }
    }

    #[test]
    fn test_404_carries_context() {
        let err = classify_status(StatusCode::NOT_FOUND, &HeaderMap::new(), "repository acme/gone", "");
        match err {
            GitPulseError::NotFound(what) => assert_eq!(what, "repository acme/gone"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_other_statuses_truncate_body() {
        let body = "e".repeat(5000);
        let err = classify_status(StatusCode::BAD_GATEWAY, &HeaderMap::new(), "x", &body);
        match err {
            GitPulseError::UpstreamApi { status, message } => {
                assert_eq!(status, Some(502));
                assert!(message.len() <= MAX_ERROR_BODY);
            }
            other => panic!("expected UpstreamApi, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_scopes() {
        assert_eq!(
            parse_scopes("repo, read:org, gist"),
            vec!["repo", "read:org", "gist"]
        );
        assert!(parse_scopes("").is_empty());
        assert_eq!(parse_scopes("repo"), vec!["repo"]);
    }

    #[test]
    fn test_empty_token_is_configuration_error() {
        let config = GitHubConfig::default();
        let credential = Credential::OAuth { token: "  ".into() };
        let err = GitHubClient::new(reqwest::Client::new(), &config, &credential).unwrap_err();
        assert!(matches!(err, GitPulseError::Configuration(_)));
    }
}
