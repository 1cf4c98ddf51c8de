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

//! GitPulse Core
//!
//! Domain types shared by the aggregation pipeline: repositories, commits,
//! date windows, credentials, the error taxonomy, and log redaction helpers.
//!
//! Everything here is a read-only projection of upstream state. There is no
//! long-lived repository or commit store; values are reconstructed on every
//! aggregation call and dropped when the response is built.

pub mod commit;
pub mod credential;
pub mod error;
pub mod redact;
pub mod repository;
pub mod window;

pub use commit::{Commit, RepoRef};
pub use credential::Credential;
pub use error::{GitPulseError, Result};
pub use repository::Repository;
pub use window::DateWindow;
