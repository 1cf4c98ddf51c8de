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

use serde::{Deserialize, Serialize};

/// Immutable snapshot of a repository visible to a credential.
///
/// Fetched fresh on every discovery call and never cached beyond the
/// aggregation request that produced it. `full_name` (`owner/name`) is
/// globally unique within one credential's visible set and is the
/// deduplication key during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    /// Owner login (the `owner` segment of `full_name`).
    pub owner: String,
    pub private: bool,
    /// Primary language as reported upstream; absent for empty repositories.
    pub language: Option<String>,
    pub html_url: String,
}
