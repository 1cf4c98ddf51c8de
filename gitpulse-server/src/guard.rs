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

//! Rate & Scope Guard.
//!
//! Runs before any bulk work: probes the remaining call budget and the
//! granted permission scopes. Both probes are best-effort — a failed probe is
//! logged and ignored, because the guard is advisory, with one exception: a
//! probe failure that itself signals an auth problem propagates, since every
//! downstream call would hit the same wall.
//!
//! The guard reads the counters upstream reports; it keeps no local quota
//! tracker and therefore cannot prevent mid-flight exhaustion, only warn
//! ahead of it.

use crate::github::SourceClient;
use gitpulse_core::redact::redact_tokens;
use gitpulse_core::{Credential, GitPulseError, Result};
use tracing::{debug, warn};

/// Scope that must be granted for private-repository access.
pub const REQUIRED_SCOPE: &str = "repo";

/// Scope that improves organization coverage; its absence is only logged.
pub const ORG_SCOPE: &str = "read:org";

/// Validate budget and scopes ahead of discovery and aggregation.
///
/// Fails only on a missing mandatory scope or on probe failures that are
/// themselves auth failures.
pub async fn preflight(
    client: &dyn SourceClient,
    credential: &Credential,
    low_rate_watermark: u32,
) -> Result<()> {
    check_budget(client, low_rate_watermark).await?;
    check_scopes(client, credential).await
}

async fn check_budget(client: &dyn SourceClient, low_rate_watermark: u32) -> Result<()> {
    match client.rate_limit().await {
        Ok(status) => {
            if status.remaining < low_rate_watermark {
                warn!(
                    remaining = status.remaining,
                    limit = status.limit,
                    reset_at = %status.reset_at.to_rfc3339(),
                    "upstream call budget is low"
                );
            }
            Ok(())
        }
        Err(err) if err.is_auth() => Err(err),
        Err(err) => {
            // Upstream error text can quote request details; scrub before logging.
            warn!(error = %redact_tokens(&err.to_string()), "rate-limit probe failed, continuing");
            Ok(())
        }
    }
}

async fn check_scopes(client: &dyn SourceClient, credential: &Credential) -> Result<()> {
    // Installation tokens carry no scope header; their permissions are fixed
    // at install time.
    if credential.is_installation() {
        debug!("installation credential, skipping scope check");
        return Ok(());
    }

    let scopes = match client.granted_scopes().await {
        Ok(scopes) => scopes,
        Err(err) if err.is_auth() => return Err(err),
        Err(err) => {
            warn!(error = %redact_tokens(&err.to_string()), "scope probe failed, continuing");
            return Ok(());
        }
    };

    if !scopes.iter().any(|scope| scope == REQUIRED_SCOPE) {
        return Err(GitPulseError::AuthScope(REQUIRED_SCOPE.into()));
    }

    if !scopes.iter().any(|scope| scope == ORG_SCOPE) {
        warn!(
            scope = ORG_SCOPE,
            "token lacks organization read scope, organization repositories may be missing"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeSourceClient, ProbeFailure};

    fn oauth() -> Credential {
        Credential::OAuth {
            token: "gho_test".into(),
        }
    }

    fn installation() -> Credential {
        Credential::Installation {
            installation_id: 7,
            token: "ghs_test".into(),
        }
    }

    #[tokio::test]
    async fn test_passes_with_full_scopes_and_budget() {
        let client = FakeSourceClient::new();
        assert!(preflight(&client, &oauth(), 100).await.is_ok());
    }

    #[tokio::test]
    async fn test_low_budget_warns_but_does_not_abort() {
        let client = FakeSourceClient::new().with_remaining_budget(3);
        assert!(preflight(&client, &oauth(), 100).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_mandatory_scope_aborts() {
        let client = FakeSourceClient::new().with_scopes(&["gist"]);
        let err = preflight(&client, &oauth(), 100).await.unwrap_err();
        match err {
            GitPulseError::AuthScope(scope) => assert_eq!(scope, REQUIRED_SCOPE),
            other => panic!("expected AuthScope, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_org_scope_only_warns() {
        let client = FakeSourceClient::new().with_scopes(&["repo"]);
        assert!(preflight(&client, &oauth(), 100).await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_transport_failures_are_tolerated() {
        let client = FakeSourceClient::new()
            .with_rate_probe_failure(ProbeFailure::Transport)
            .with_scope_probe_failure(ProbeFailure::Transport);
        assert!(preflight(&client, &oauth(), 100).await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_auth_failures_propagate() {
        let client = FakeSourceClient::new().with_rate_probe_failure(ProbeFailure::Auth);
        let err = preflight(&client, &oauth(), 100).await.unwrap_err();
        assert!(err.is_auth());

        let client = FakeSourceClient::new().with_scope_probe_failure(ProbeFailure::Auth);
        let err = preflight(&client, &oauth(), 100).await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_installation_skips_scope_check() {
        // No scopes at all, but the credential is an installation.
        let client = FakeSourceClient::new().with_scopes(&[]);
        assert!(preflight(&client, &installation(), 100).await.is_ok());
    }
}
