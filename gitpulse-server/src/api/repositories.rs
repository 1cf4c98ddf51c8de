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

use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use gitpulse_core::Repository;
use serde::Serialize;

use crate::api::{extract_credential, ApiError, AppState};
use crate::discovery;

#[derive(Debug, Serialize)]
pub struct RepositoriesResponse {
    pub total: usize,
    pub repositories: Vec<Repository>,
}

/// GET /api/v1/repositories - repositories reachable by the credential
pub async fn list_repositories(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let credential = extract_credential(&headers)?;
    let client = state.clients.client_for(&credential)?;

    let repositories = discovery::discover(client.as_ref(), &credential).await?;

    Ok(Json(RepositoriesResponse {
        total: repositories.len(),
        repositories,
    }))
}
