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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive date window for commit retrieval.
///
/// The `since <= until` invariant is enforced at the HTTP boundary, not here.
/// An inverted window is passed through as-is and simply matches nothing
/// upstream; it is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { since, until }
    }

    pub fn is_inverted(&self) -> bool {
        self.since > self.until
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.since <= instant && instant <= self.until
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_contains_is_inclusive() {
        let window = DateWindow::new(day(1), day(31));
        assert!(window.contains(day(1)));
        assert!(window.contains(day(31)));
        assert!(window.contains(day(15)));
        assert!(!window.contains(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_inverted_window_is_representable() {
        let window = DateWindow::new(day(31), day(1));
        assert!(window.is_inverted());
        assert!(!window.contains(day(15)));
    }
}
