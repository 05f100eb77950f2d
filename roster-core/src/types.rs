//! Domain types for the membership roster and the mailing-list group.
//!
//! Every record here is rebuilt from upstream systems on each run; nothing
//! is persisted by this crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::timestamp::Instant;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Normalized comparison key derived from a raw address.
///
/// Only [`crate::email::canonicalize`] builds these from raw input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalEmail(pub String);

impl CanonicalEmail {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque identifier the group provider uses to address a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub String);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for MemberId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Address of the mailing-list group (the directory API's `groupKey`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey(pub String);

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for GroupKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One roster row.
///
/// Accepts both `first_name`/`last_name` and `firstName`/`lastName` headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Address as entered on the form, not canonicalized.
    pub email: String,
    /// Moment the membership lapses, seconds since the epoch.
    pub expiry: Instant,
    #[serde(default, alias = "firstName")]
    pub first_name: String,
    #[serde(default, alias = "lastName")]
    pub last_name: String,
}

/// One member as reported by the group provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    /// Provider id; falls back to the raw email when the provider has none.
    #[serde(default, alias = "memberId", skip_serializing_if = "Option::is_none")]
    pub id: Option<MemberId>,
    pub email: String,
}

impl GroupMember {
    pub fn new(id: impl Into<MemberId>, email: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            email: email.into(),
        }
    }

    /// A member whose provider has no id separate from the address.
    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
        }
    }

    /// The identifier to pass to a removal call.
    pub fn member_id(&self) -> MemberId {
        self.id
            .clone()
            .unwrap_or_else(|| MemberId(self.email.clone()))
    }
}

// ---------------------------------------------------------------------------
// Membership types
// ---------------------------------------------------------------------------

/// Membership tier sold on the signup form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    Student,
    Regular,
    Family,
    Summer,
}

impl MembershipType {
    pub fn all() -> &'static [MembershipType] {
        &[
            MembershipType::Student,
            MembershipType::Regular,
            MembershipType::Family,
            MembershipType::Summer,
        ]
    }

    /// Price in whole dollars.
    pub fn amount(self) -> u32 {
        match self {
            MembershipType::Student => 20,
            MembershipType::Regular => 30,
            MembershipType::Family => 40,
            MembershipType::Summer => 10,
        }
    }

    /// Length of the membership in calendar months.
    pub fn months(self) -> u32 {
        match self {
            MembershipType::Summer => 4,
            _ => 12,
        }
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipType::Student => write!(f, "student"),
            MembershipType::Regular => write!(f, "regular"),
            MembershipType::Family => write!(f, "family"),
            MembershipType::Summer => write!(f, "summer"),
        }
    }
}

impl FromStr for MembershipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(MembershipType::Student),
            "regular" => Ok(MembershipType::Regular),
            "family" => Ok(MembershipType::Family),
            "summer" => Ok(MembershipType::Summer),
            other => Err(format!("unknown membership type '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
