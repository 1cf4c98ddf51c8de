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

//! Opaque authorization context for upstream calls.
//!
//! Exactly one of the two forms is active per request. The credential is
//! owned by the auth layer in front of this service; the pipeline only reads
//! it, never mutates or persists it. Tokens are kept out of `Debug` output
//! so a credential can be logged without leaking.

use std::fmt;

#[derive(Clone)]
pub enum Credential {
    /// Per-user OAuth token.
    OAuth { token: String },
    /// App-installation identity, scoped to a fixed repository set.
    Installation { installation_id: u64, token: String },
}

impl Credential {
    /// Pick the active credential when both forms are presented.
    /// Installation identity takes priority.
    pub fn resolve(oauth: Option<Credential>, installation: Option<Credential>) -> Option<Credential> {
        installation.or(oauth)
    }

    pub fn token(&self) -> &str {
        match self {
            Self::OAuth { token } => token,
            Self::Installation { token, .. } => token,
        }
    }

    pub fn is_installation(&self) -> bool {
        matches!(self, Self::Installation { .. })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OAuth { .. } => f.write_str("Credential::OAuth([REDACTED])"),
            Self::Installation { installation_id, .. } => {
                write!(f, "Credential::Installation(id={installation_id}, [REDACTED])")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installation_takes_priority() {
        let oauth = Credential::OAuth {
            token: "gho_user".into(),
        };
        let installation = Credential::Installation {
            installation_id: 42,
            token: "ghs_install".into(),
        };

        let active = Credential::resolve(Some(oauth.clone()), Some(installation)).unwrap();
        assert!(active.is_installation());
        assert_eq!(active.token(), "ghs_install");

        let active = Credential::resolve(Some(oauth), None).unwrap();
        assert!(!active.is_installation());

        assert!(Credential::resolve(None, None).is_none());
    }

    #[test]
    fn test_debug_never_prints_token() {
        let cred = Credential::OAuth {
            token: "gho_supersecret".into(),
        };
        let printed = format!("{cred:?}");
        assert!(!printed.contains("supersecret"));
        assert!(printed.contains("[REDACTED]"));

        let cred = Credential::Installation {
            installation_id: 7,
            token: "ghs_alsosecret".into(),
        };
        let printed = format!("{cred:?}");
        assert!(!printed.contains("alsosecret"));
        assert!(printed.contains("id=7"));
    }
}
