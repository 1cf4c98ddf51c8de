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

//! Response Cache Layer
//!
//! Deterministic cache keys, content-hash ETags, and conditional-request
//! evaluation. Pure functions with no storage: where the entries live
//! (in-memory, CDN, browser) is the transport layer's business, this module
//! only guarantees the validators are stable.
//!
//! ## Key generation
//!
//! ```text
//! key = namespace:key1:val1:key2:val2...
//! ```
//!
//! Top-level keys are sorted, array values are sorted, nested object keys are
//! sorted recursively, so two logically equal parameter sets produce the same
//! key regardless of construction order.
//!
//! ## Failure policy
//!
//! Key and ETag generation never fail. On a serialization error they degrade
//! to a timestamp-derived value and log a warning: an imperfect cache key
//! costs a cache miss, a crashed response path costs the request.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::warn;

/// Options for building a cacheable response.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub max_age_secs: u64,
    /// Defaults to twice `max_age_secs` when unset.
    pub stale_while_revalidate_secs: Option<u64>,
    pub private: bool,
    /// Precomputed ETag; computed from the payload when unset.
    pub etag: Option<String>,
    pub extra_headers: Vec<(String, String)>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_age_secs: 300,
            stale_while_revalidate_secs: None,
            private: true,
            etag: None,
            extra_headers: Vec::new(),
        }
    }
}

/// Deterministic cache key for a parameter set.
pub fn cache_key<T: Serialize>(params: &T, namespace: Option<&str>) -> String {
    let namespace = namespace.unwrap_or("cache");
    let value = match serde_json::to_value(params) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "cache key serialization failed, using fallback");
            return fallback_key(namespace);
        }
    };

    match value {
        Value::Object(map) => {
            // BTreeMap fixes the key order even if the JSON map type
            // preserves insertion order.
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let mut parts = Vec::with_capacity(sorted.len() * 2);
            for (key, val) in sorted {
                parts.push(key.clone());
                parts.push(key_fragment(val));
            }
            format!("{namespace}:{}", parts.join(":"))
        }
        other => format!("{namespace}:{}", key_fragment(&other)),
    }
}

/// Render one parameter value for the cache key. Arrays are sorted; nested
/// objects are key-sorted recursively.
fn key_fragment(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let mut rendered: Vec<String> = items.iter().map(key_fragment).collect();
            rendered.sort();
            format!("[{}]", rendered.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let rendered: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{k}={}", key_fragment(v)))
                .collect();
            format!("{{{}}}", rendered.join(","))
        }
    }
}

fn fallback_key(namespace: &str) -> String {
    format!("{namespace}:fallback:{}", Utc::now().timestamp_millis())
}

/// Content-hash ETag for a payload, quoted per the header convention.
///
/// The hash covers a canonical serialization with recursively sorted object
/// keys, so logically identical payloads hash identically regardless of map
/// construction order. Array order is content and is preserved.
pub fn etag<T: Serialize>(payload: &T) -> String {
    match serde_json::to_value(payload) {
        Ok(value) => {
            let mut hasher = Sha256::new();
            hash_value(&value, &mut hasher);
            format!("\"{}\"", hex::encode(hasher.finalize()))
        }
        Err(err) => {
            warn!(error = %err, "etag serialization failed, using fallback");
            format!("\"fallback-{}\"", Utc::now().timestamp_millis())
        }
    }
}

fn hash_value(value: &Value, hasher: &mut Sha256) {
    match value {
        Value::Null => hasher.update(b"null"),
        Value::Bool(b) => hasher.update(if *b { b"true".as_ref() } else { b"false".as_ref() }),
        Value::Number(n) => hasher.update(n.to_string().as_bytes()),
        Value::String(s) => {
            hasher.update(b"\"");
            hasher.update(s.as_bytes());
            hasher.update(b"\"");
        }
        Value::Array(items) => {
            hasher.update(b"[");
            for item in items {
                hash_value(item, hasher);
                hasher.update(b",");
            }
            hasher.update(b"]");
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            hasher.update(b"{");
            for (key, val) in sorted {
                hasher.update(key.as_bytes());
                hasher.update(b"=");
                hash_value(val, hasher);
                hasher.update(b",");
            }
            hasher.update(b"}");
        }
    }
}

/// Evaluate an `If-None-Match` header against the current ETag. Handles
/// single and comma-separated values; `*` matches any representation.
pub fn is_fresh(if_none_match: Option<&str>, current_etag: &str) -> bool {
    let Some(header) = if_none_match else {
        return false;
    };
    header
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == current_etag || candidate == "*")
}

/// Build a `Cache-Control` header value.
pub fn cache_control(max_age_secs: u64, stale_while_revalidate_secs: Option<u64>, private: bool) -> String {
    let visibility = if private { "private" } else { "public" };
    let swr = stale_while_revalidate_secs.unwrap_or(max_age_secs * 2);
    format!("{visibility}, max-age={max_age_secs}, stale-while-revalidate={swr}")
}

/// Compose a JSON response with `ETag` and `Cache-Control` validators.
pub fn respond<T: Serialize>(payload: &T, status: StatusCode, options: &CacheOptions) -> Response {
    let etag_value = options.etag.clone().unwrap_or_else(|| etag(payload));
    let control = cache_control(
        options.max_age_secs,
        options.stale_while_revalidate_secs,
        options.private,
    );

    let mut response = (status, axum::Json(payload)).into_response();
    set_validators(&mut response, &etag_value, &control);
    for (name, value) in &options.extra_headers {
        if let (Ok(name), Ok(value)) = (
            name.parse::<header::HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

/// Bodyless 304 carrying the same validators as the 200 it replaces.
pub fn not_modified(etag_value: &str, cache_control_value: &str) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    set_validators(&mut response, etag_value, cache_control_value);
    response
}

fn set_validators(response: &mut Response, etag_value: &str, cache_control_value: &str) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(etag_value) {
        headers.insert(header::ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(cache_control_value) {
        headers.insert(header::CACHE_CONTROL, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_ignores_key_order() {
        let a = json!({"author": "alice", "since": "2024-01-01", "until": "2024-01-31"});
        let b = json!({"until": "2024-01-31", "since": "2024-01-01", "author": "alice"});
        assert_eq!(cache_key(&a, Some("activity")), cache_key(&b, Some("activity")));
    }

    #[test]
    fn test_cache_key_sorts_array_values() {
        let a = json!({"repos": ["acme/web", "acme/api"]});
        let b = json!({"repos": ["acme/api", "acme/web"]});
        assert_eq!(cache_key(&a, None), cache_key(&b, None));
    }

    #[test]
    fn test_cache_key_sorts_nested_object_keys() {
        let a = json!({"window": {"until": "b", "since": "a"}});
        let b = json!({"window": {"since": "a", "until": "b"}});
        assert_eq!(cache_key(&a, None), cache_key(&b, None));
    }

    #[test]
    fn test_cache_key_shape() {
        let params = json!({"author": "alice", "since": "2024-01-01"});
        assert_eq!(
            cache_key(&params, Some("activity")),
            "activity:author:alice:since:2024-01-01"
        );
    }

    #[test]
    fn test_cache_key_distinguishes_values() {
        let a = json!({"author": "alice"});
        let b = json!({"author": "bob"});
        assert_ne!(cache_key(&a, None), cache_key(&b, None));
    }

    #[test]
    fn test_etag_is_stable_across_clones_and_key_order() {
        let payload = json!({"commits": [{"sha": "a1"}], "total": 1});
        let clone = payload.clone();
        assert_eq!(etag(&payload), etag(&clone));

        let reordered = json!({"total": 1, "commits": [{"sha": "a1"}]});
        assert_eq!(etag(&payload), etag(&reordered));
    }

    #[test]
    fn test_etag_differs_for_different_payloads() {
        assert_ne!(etag(&json!({"total": 1})), etag(&json!({"total": 2})));
        // Array order is content, not construction noise.
        assert_ne!(
            etag(&json!({"shas": ["a", "b"]})),
            etag(&json!({"shas": ["b", "a"]}))
        );
    }

    #[test]
    fn test_etag_is_quoted() {
        let value = etag(&json!({"k": "v"}));
        assert!(value.starts_with('"') && value.ends_with('"'));
    }

    #[test]
    fn test_is_fresh_single_and_multi_value() {
        let current = "\"abc\"";
        assert!(is_fresh(Some("\"abc\""), current));
        assert!(is_fresh(Some("\"zzz\", \"abc\""), current));
        assert!(is_fresh(Some("*"), current));
        assert!(!is_fresh(Some("\"zzz\""), current));
        assert!(!is_fresh(None, current));
    }

    #[test]
    fn test_cache_control_defaults_swr_to_double_max_age() {
        assert_eq!(
            cache_control(300, None, true),
            "private, max-age=300, stale-while-revalidate=600"
        );
        assert_eq!(
            cache_control(60, Some(3600), false),
            "public, max-age=60, stale-while-revalidate=3600"
        );
    }

    #[test]
    fn test_respond_sets_validators() {
        let payload = json!({"total": 3});
        let response = respond(&payload, StatusCode::OK, &CacheOptions::default());

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get(header::ETAG).unwrap(), etag(&payload).as_str());
        assert_eq!(
            headers.get(header::CACHE_CONTROL).unwrap(),
            "private, max-age=300, stale-while-revalidate=600"
        );
        assert!(headers
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("application/json"));
    }

    #[test]
    fn test_not_modified_carries_validators() {
        let response = not_modified("\"abc\"", "private, max-age=300, stale-while-revalidate=600");
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers().get(header::ETAG).unwrap(), "\"abc\"");
        assert!(response.headers().get(header::CACHE_CONTROL).is_some());
    }

    #[test]
    fn test_respond_honors_extra_headers() {
        let options = CacheOptions {
            extra_headers: vec![("x-total-count".into(), "3".into())],
            ..Default::default()
        };
        let response = respond(&json!({"total": 3}), StatusCode::OK, &options);
        assert_eq!(response.headers().get("x-total-count").unwrap(), "3");
    }
}
