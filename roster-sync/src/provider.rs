//! Collaborator seams.
//!
//! The reconciliation core only sees these traits. HTTP adapters live in
//! `roster-providers`; in-memory versions live in [`crate::memory`].

use std::collections::HashSet;

use roster_core::{GroupKey, GroupMember, MemberId, MemberRecord};
use roster_notify::Notification;

use crate::error::ProviderError;

/// One page of a group listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberPage {
    pub members: Vec<GroupMember>,
    pub next_page_token: Option<String>,
}

/// Reads every roster row.
pub trait RosterSource {
    fn read_records(&self) -> Result<Vec<MemberRecord>, ProviderError>;
}

/// Appends rows to the roster.
pub trait RosterWriter {
    /// Column names of the roster, in sheet order.
    fn header(&self) -> Result<Vec<String>, ProviderError>;

    /// Append one row of `(column, value)` pairs.
    fn append_row(&self, row: &[(String, String)]) -> Result<(), ProviderError>;
}

/// The mailing-list group.
pub trait GroupProvider {
    fn list_members(
        &self,
        group: &GroupKey,
        page_token: Option<&str>,
    ) -> Result<MemberPage, ProviderError>;

    /// `Err(ProviderError::Conflict)` when the address is already a member.
    fn add_member(&self, group: &GroupKey, email: &str) -> Result<(), ProviderError>;

    fn remove_member(&self, group: &GroupKey, member: &MemberId) -> Result<(), ProviderError>;
}

/// Transactional email.
pub trait Notifier {
    fn send(&self, notification: &Notification) -> Result<(), ProviderError>;
}

/// Payment processor orders.
pub trait PaymentProvider {
    /// Authorized amount of the order's first purchase unit, as sent by the
    /// processor (e.g. `"20.00"`).
    fn order_amount(&self, order_id: &str) -> Result<String, ProviderError>;

    fn capture(&self, order_id: &str) -> Result<(), ProviderError>;
}

/// Follow next-page tokens until the listing is exhausted.
///
/// A group with no members yields an empty vec. A missing or empty token
/// ends the listing, and so does a token already seen in this listing.
pub fn list_all_members(
    provider: &dyn GroupProvider,
    group: &GroupKey,
) -> Result<Vec<GroupMember>, ProviderError> {
    let mut members = Vec::new();
    let mut token: Option<String> = None;
    let mut seen: HashSet<String> = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = provider.list_members(group, token.as_deref())?;
        pages += 1;
        members.extend(page.members);

        match page.next_page_token {
            Some(next) if !next.is_empty() => {
                if !seen.insert(next.clone()) {
                    tracing::warn!("page token '{next}' for {group} repeated; stopping");
                    break;
                }
                token = Some(next);
            }
            _ => break,
        }
    }

    tracing::debug!("listed {} member(s) of {group} in {pages} page(s)", members.len());
    Ok(members)
}
