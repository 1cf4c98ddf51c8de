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

use tower_http::compression::CompressionLayer;

/// Create compression layer for responses
///
/// Automatically compresses responses using gzip when the client accepts it
/// (Accept-Encoding header). Aggregated commit payloads are highly
/// repetitive JSON and compress well.
///
/// # Example
/// ```ignore
/// use gitpulse_server::middleware::compression::compression_layer;
/// use axum::{Router, routing::get};
///
/// let app = Router::new()
///     .route("/api/v1/activity/commits", get(get_commit_activity))
///     .layer(compression_layer());
/// ```
pub fn compression_layer() -> CompressionLayer {
    CompressionLayer::new()
}
