//! Actor roles.
//!
//! A role comes from the actor's stored profile record and nowhere else.
//! There is no inference from email addresses or display names; an unknown
//! or missing value falls back to the least-privileged role.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform role, as stored on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Role {
    /// Founder submitting and running a venture (default)
    #[default]
    Entrepreneur,
    /// Screening manager assessing submitted ventures
    SuccessMgr,
    /// Venture manager overseeing the Scale Up tier
    VentureMgr,
    /// Committee member deciding approvals and paperwork
    Committee,
    /// Platform operator
    Admin,
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::parse(&s)
    }
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Entrepreneur,
        Role::SuccessMgr,
        Role::VentureMgr,
        Role::Committee,
        Role::Admin,
    ];

    /// Parse a stored role string. Unknown values become `Entrepreneur`.
    pub fn parse(s: &str) -> Role {
        match s.trim() {
            "success_mgr" | "vsm" | "screening_manager" => Role::SuccessMgr,
            "venture_mgr" => Role::VentureMgr,
            "committee" => Role::Committee,
            "admin" => Role::Admin,
            _ => Role::Entrepreneur,
        }
    }

    /// Canonical wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Entrepreneur => "entrepreneur",
            Role::SuccessMgr => "success_mgr",
            Role::VentureMgr => "venture_mgr",
            Role::Committee => "committee",
            Role::Admin => "admin",
        }
    }

    /// Staff roles that work ventures they do not own.
    pub fn is_manager(&self) -> bool {
        !matches!(self, Role::Entrepreneur)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_falls_back_to_entrepreneur() {
        assert_eq!(Role::parse("superuser"), Role::Entrepreneur);
        assert_eq!(Role::parse(""), Role::Entrepreneur);
        let parsed: Role = serde_json::from_str("\"something_else\"").unwrap();
        assert_eq!(parsed, Role::Entrepreneur);
    }

    #[test]
    fn legacy_spellings_resolve() {
        assert_eq!(Role::parse("vsm"), Role::SuccessMgr);
        assert_eq!(Role::parse("screening_manager"), Role::SuccessMgr);
        let parsed: Role = serde_json::from_str("\"vsm\"").unwrap();
        assert_eq!(parsed, Role::SuccessMgr);
    }

    #[test]
    fn canonical_round_trip() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            let back: Role = serde_json::from_str(&json).unwrap();
            assert_eq!(back, role);
        }
    }

    #[test]
    fn entrepreneur_is_the_default() {
        assert_eq!(Role::default(), Role::Entrepreneur);
        assert!(!Role::default().is_manager());
        assert!(Role::Admin.is_manager());
    }
}
