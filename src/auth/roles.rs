//! Tenant member roles
//!
//! Roles are ordered; a check passes when the caller's role is at least
//! the required one. Owners can do everything a manager can, managers
//! everything a member can.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a user within their tenant
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Role {
    /// Regular member - reads and own-record writes
    #[default]
    Member = 0,
    /// Manager - full CRUD on tenant records
    Manager = 1,
    /// Owner - manager plus team and plan administration
    Owner = 2,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Member => write!(f, "member"),
            Role::Manager => write!(f, "manager"),
            Role::Owner => write!(f, "owner"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "manager" => Ok(Role::Manager),
            "owner" => Ok(Role::Owner),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl Role {
    /// Whether this role satisfies the required level
    pub fn at_least(&self, required: Role) -> bool {
        *self >= required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::Owner > Role::Manager);
        assert!(Role::Manager > Role::Member);
    }

    #[test]
    fn test_at_least() {
        assert!(Role::Owner.at_least(Role::Member));
        assert!(Role::Manager.at_least(Role::Manager));
        assert!(!Role::Member.at_least(Role::Manager));
    }

    #[test]
    fn test_parse_round_trip() {
        for role in [Role::Member, Role::Manager, Role::Owner] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}
