//! Membership index: roster rows keyed by canonical email.

use std::collections::HashMap;

use roster_core::{canonicalize, CanonicalEmail, Instant, MemberRecord};

/// What the roster says about one canonical address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Address as written on the winning row.
    pub email: String,
    pub expired: bool,
    pub first_name: String,
    pub last_name: String,
}

/// Roster lookup structure, rebuilt on every run.
#[derive(Debug, Clone, Default)]
pub struct MembershipIndex {
    entries: HashMap<CanonicalEmail, IndexEntry>,
}

impl MembershipIndex {
    /// Index `records` as of `now`.
    ///
    /// A record is expired when `expiry < now`. When several rows share a
    /// canonical email the later row wins.
    pub fn build(records: &[MemberRecord], now: Instant) -> Self {
        let mut entries = HashMap::with_capacity(records.len());
        for record in records {
            let key = canonicalize(&record.email);
            let entry = IndexEntry {
                email: record.email.clone(),
                expired: record.expiry < now,
                first_name: record.first_name.clone(),
                last_name: record.last_name.clone(),
            };
            if let Some(previous) = entries.insert(key.clone(), entry) {
                tracing::debug!(
                    "duplicate roster row for {key}: '{}' replaced by a later row",
                    previous.email
                );
            }
        }
        Self { entries }
    }

    pub fn get(&self, key: &CanonicalEmail) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CanonicalEmail) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalEmail, &IndexEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Greeting name for notification emails.
///
/// With no last name the first name is often a full name, so only its first
/// word is used. With a last name the first name is used as is. No entry
/// gives an empty string.
pub fn display_name(entry: Option<&IndexEntry>) -> String {
    let Some(entry) = entry else {
        return String::new();
    };
    if entry.last_name.is_empty() {
        entry
            .first_name
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_string()
    } else {
        entry.first_name.clone()
    }
}
