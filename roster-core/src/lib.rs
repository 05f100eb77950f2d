//! Roster core library: domain types, email canonicalization, time helpers,
//! configuration.
//!
//! - [`types`]: newtypes and roster / group records
//! - [`email`]: [`canonicalize`]
//! - [`timestamp`]: epoch seconds and spreadsheet day serials
//! - [`config`]: environment selection and resolved run configs
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod email;
pub mod error;
pub mod timestamp;
pub mod types;

pub use config::{ConfigValues, EnrollConfig, Environment, Function, ServiceAccount, SyncConfig};
pub use email::canonicalize;
pub use error::ConfigError;
pub use timestamp::Instant;
pub use types::{CanonicalEmail, GroupKey, GroupMember, MemberId, MemberRecord, MembershipType};
