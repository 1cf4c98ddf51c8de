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

//! Commit activity endpoint: the full pipeline behind one GET.
//!
//! credential -> guard preflight -> discovery (unless the caller pins a
//! repository list) -> batched aggregation -> cache-layer response with
//! conditional-request handling.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use chrono::{DateTime, NaiveDate, Utc};
use gitpulse_core::redact::mask_login;
use gitpulse_core::{Commit, DateWindow};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::api::{extract_credential, ApiError, AppState};
use crate::cache::{self, CacheOptions};
use crate::{aggregate, discovery, guard};

/// Query parameters for the activity endpoint
#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    /// Window start: RFC 3339 instant or plain date (start of day)
    pub since: String,

    /// Window end: RFC 3339 instant or plain date (end of day)
    pub until: String,

    /// Author login to filter by
    pub author: Option<String>,

    /// Comma-separated `owner/name` list; defaults to every visible repository
    pub repos: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub total: usize,
    pub window: DateWindow,
    pub author: Option<String>,
    pub commits: Vec<Commit>,
}

/// GET /api/v1/activity/commits - aggregated commit activity
pub async fn get_commit_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ActivityQuery>,
) -> Result<Response, ApiError> {
    let credential = extract_credential(&headers)?;
    let window = parse_window(&query.since, &query.until)?;
    let author = query
        .author
        .as_deref()
        .map(str::trim)
        .filter(|author| !author.is_empty());

    let client = state.clients.client_for(&credential)?;
    guard::preflight(
        client.as_ref(),
        &credential,
        state.config.github.low_rate_watermark,
    )
    .await?;

    let repo_names: Vec<String> = match &query.repos {
        Some(csv) => csv
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        None => discovery::discover(client.as_ref(), &credential)
            .await?
            .into_iter()
            .map(|repo| repo.full_name)
            .collect(),
    };

    let commits = aggregate::aggregate(client.as_ref(), &repo_names, &window, author).await?;

    let payload = ActivityResponse {
        total: commits.len(),
        window,
        author: author.map(str::to_string),
        commits,
    };

    let key = cache::cache_key(
        &json!({
            "since": query.since,
            "until": query.until,
            "author": author,
            "repos": repo_names,
        }),
        Some("activity"),
    );

    let etag = cache::etag(&payload);
    let cache_cfg = &state.config.cache;
    let control = cache::cache_control(
        cache_cfg.max_age_secs,
        Some(cache_cfg.stale_while_revalidate_secs),
        cache_cfg.private,
    );
    let masked_author = author.map(mask_login);
    debug!(
        cache_key = %key,
        etag = %etag,
        author = masked_author.as_deref(),
        commits = payload.total,
        "serving commit activity"
    );

    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());
    if cache::is_fresh(if_none_match, &etag) {
        return Ok(cache::not_modified(&etag, &control));
    }

    Ok(cache::respond(
        &payload,
        StatusCode::OK,
        &CacheOptions {
            max_age_secs: cache_cfg.max_age_secs,
            stale_while_revalidate_secs: Some(cache_cfg.stale_while_revalidate_secs),
            private: cache_cfg.private,
            etag: Some(etag),
            extra_headers: Vec::new(),
        },
    ))
}

/// Parse the inclusive window bounds. Plain dates expand to the start (since)
/// or end (until) of the day, UTC.
fn parse_window(since: &str, until: &str) -> Result<DateWindow, ApiError> {
    let window = DateWindow::new(parse_bound(since, false)?, parse_bound(until, true)?);

    if window.is_inverted() {
        return Err(ApiError::BadRequest(format!(
            "'since' ({}) must not be after 'until' ({})",
            window.since, window.until
        )));
    }

    Ok(window)
}

fn parse_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest(format!(
            "'{raw}' is not an RFC 3339 instant or YYYY-MM-DD date"
        ))
    })?;

    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59).expect("valid wall-clock time")
    } else {
        date.and_hms_opt(0, 0, 0).expect("valid wall-clock time")
    };
    Ok(DateTime::from_naive_utc_and_offset(time, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_window_accepts_plain_dates() {
        let window = parse_window("2024-01-01", "2024-01-31").unwrap();
        assert_eq!(window.since.hour(), 0);
        assert_eq!(window.until.hour(), 23);
        assert!(!window.is_inverted());
    }

    #[test]
    fn test_parse_window_accepts_rfc3339() {
        let window = parse_window("2024-01-01T08:00:00Z", "2024-01-02T08:00:00+01:00").unwrap();
        assert_eq!(window.since.hour(), 8);
        assert_eq!(window.until.hour(), 7); // normalized to UTC
    }

    #[test]
    fn test_parse_window_rejects_inverted_bounds() {
        let err = parse_window("2024-02-01", "2024-01-01").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_parse_window_rejects_garbage() {
        let err = parse_window("yesterday", "2024-01-31").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
