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

//! Repository Discovery Service.
//!
//! Resolves the full set of repositories a credential can reach. The OAuth
//! path is a single combined listing (owner + collaborator +
//! organization-member affiliations, all visibility levels); a separate
//! per-organization enumeration pass used to exist and was removed as
//! redundant. The installation path lists the fixed set granted to the app
//! installation.

use crate::github::SourceClient;
use gitpulse_core::{Credential, Repository, Result};
use std::collections::HashSet;
use tracing::{debug, info};

/// List every repository reachable by `credential`, deduplicated by
/// `full_name` with the first-seen entry winning.
///
/// The combined listing already returns unique entries, so the dedup pass is
/// a safety net rather than a workhorse.
pub async fn discover(
    client: &dyn SourceClient,
    credential: &Credential,
) -> Result<Vec<Repository>> {
    let listed = if credential.is_installation() {
        debug!("discovering repositories for installation");
        client.list_repositories_for_installation().await?
    } else {
        debug!("discovering repositories for authenticated user");
        client.list_repositories_for_user().await?
    };

    let mut seen = HashSet::with_capacity(listed.len());
    let mut repositories = Vec::with_capacity(listed.len());
    for repo in listed {
        if seen.insert(repo.full_name.clone()) {
            repositories.push(repo);
        }
    }

    info!(count = repositories.len(), "repository discovery complete");
    Ok(repositories)
}
