//! Role hierarchy.
//!
//! Roles form a flat total order `Developer < Security < Admin`; a higher role
//! satisfies every requirement a lower one does. Everything here is pure
//! lookup data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Developer,
    Security,
    Admin,
}

/// Rank table, lowest first.
const HIERARCHY: [(Role, u8); 3] = [(Role::Developer, 1), (Role::Security, 2), (Role::Admin, 3)];

/// Federated identity provider role names mapped onto internal roles, in
/// priority order. The first entry present in a token's granted roles wins.
pub const REALM_ROLE_MAPPING: [(&str, Role); 6] = [
    ("gateway-admin", Role::Admin),
    ("admin", Role::Admin),
    ("gateway-security", Role::Security),
    ("security", Role::Security),
    ("gateway-developer", Role::Developer),
    ("developer", Role::Developer),
];

impl Role {
    pub const ALL: [Role; 3] = [Role::Developer, Role::Security, Role::Admin];

    pub fn rank(self) -> u8 {
        HIERARCHY
            .iter()
            .find(|(role, _)| *role == self)
            .map(|(_, rank)| *rank)
            .unwrap_or(0)
    }

    /// Does this role meet a requirement of `required`?
    pub fn satisfies(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Does this role meet at least one of the acceptable roles?
    pub fn satisfies_any(self, acceptable: &[Role]) -> bool {
        acceptable.iter().any(|required| self.satisfies(*required))
    }

    /// Highest-priority internal role granted by a federated role list.
    pub fn from_realm_roles<S: AsRef<str>>(granted: &[S]) -> Option<Role> {
        REALM_ROLE_MAPPING
            .iter()
            .find(|(external, _)| {
                granted
                    .iter()
                    .any(|g| g.as_ref().trim().eq_ignore_ascii_case(external))
            })
            .map(|(_, role)| *role)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Developer => "DEVELOPER",
            Role::Security => "SECURITY",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        let normalized = normalized.strip_prefix("ROLE_").unwrap_or(&normalized);
        match normalized {
            "DEVELOPER" => Ok(Role::Developer),
            "SECURITY" => Ok(Role::Security),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}
