//! In-memory collaborators.
//!
//! Used by the offline `plan` command and by tests. Interior state sits
//! behind a `Mutex` so the fakes satisfy the `&self` trait methods.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use roster_core::{GroupKey, GroupMember, MemberId, MemberRecord};
use roster_notify::Notification;

use crate::error::ProviderError;
use crate::provider::{
    GroupProvider, MemberPage, Notifier, PaymentProvider, RosterSource, RosterWriter,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryRoster {
    records: Vec<MemberRecord>,
    unavailable: bool,
}

impl MemoryRoster {
    pub fn new(records: Vec<MemberRecord>) -> Self {
        Self {
            records,
            unavailable: false,
        }
    }

    /// Every read fails.
    pub fn unavailable() -> Self {
        Self {
            records: Vec::new(),
            unavailable: true,
        }
    }
}

impl RosterSource for MemoryRoster {
    fn read_records(&self) -> Result<Vec<MemberRecord>, ProviderError> {
        if self.unavailable {
            return Err(ProviderError::Transport("roster unavailable".into()));
        }
        Ok(self.records.clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRosterWriter {
    header: Vec<String>,
    rows: Mutex<Vec<Vec<(String, String)>>>,
    fail_append: bool,
}

impl MemoryRosterWriter {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|s| s.to_string()).collect(),
            rows: Mutex::new(Vec::new()),
            fail_append: false,
        }
    }

    pub fn failing_append(mut self) -> Self {
        self.fail_append = true;
        self
    }

    pub fn rows(&self) -> Vec<Vec<(String, String)>> {
        lock(&self.rows).clone()
    }
}

impl RosterWriter for MemoryRosterWriter {
    fn header(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.header.clone())
    }

    fn append_row(&self, row: &[(String, String)]) -> Result<(), ProviderError> {
        if self.fail_append {
            return Err(ProviderError::Status {
                status: 503,
                message: "append rejected".into(),
            });
        }
        lock(&self.rows).push(row.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct GroupState {
    members: Vec<GroupMember>,
    next_id: usize,
    list_calls: usize,
}

/// A mailing-list group held in memory.
///
/// Failure switches match on the member's email (case-insensitive).
#[derive(Debug, Default)]
pub struct MemoryGroup {
    state: Mutex<GroupState>,
    page_size: Option<usize>,
    unavailable: bool,
    failing: Mutex<HashSet<String>>,
    conflicts: Mutex<HashSet<String>>,
    not_found: Mutex<HashSet<String>>,
}

impl MemoryGroup {
    pub fn new(members: Vec<GroupMember>) -> Self {
        Self {
            state: Mutex::new(GroupState {
                members,
                ..GroupState::default()
            }),
            ..Self::default()
        }
    }

    /// List in pages of `page_size` members.
    pub fn with_page_size(members: Vec<GroupMember>, page_size: usize) -> Self {
        Self {
            page_size: Some(page_size.max(1)),
            ..Self::new(members)
        }
    }

    /// Every listing fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn fail_on(&self, email: &str) {
        lock(&self.failing).insert(email.to_lowercase());
    }

    pub fn conflict_on_add(&self, email: &str) {
        lock(&self.conflicts).insert(email.to_lowercase());
    }

    pub fn not_found_on_add(&self, email: &str) {
        lock(&self.not_found).insert(email.to_lowercase());
    }

    pub fn members(&self) -> Vec<GroupMember> {
        lock(&self.state).members.clone()
    }

    pub fn list_calls(&self) -> usize {
        lock(&self.state).list_calls
    }

    fn is_failing(&self, email: &str) -> bool {
        lock(&self.failing).contains(&email.to_lowercase())
    }
}

impl GroupProvider for MemoryGroup {
    fn list_members(
        &self,
        _group: &GroupKey,
        page_token: Option<&str>,
    ) -> Result<MemberPage, ProviderError> {
        if self.unavailable {
            return Err(ProviderError::Transport("group unavailable".into()));
        }
        let mut state = lock(&self.state);
        state.list_calls += 1;

        let start = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ProviderError::Decode(format!("bad page token '{token}'")))?,
            None => 0,
        };
        let total = state.members.len();
        let end = self.page_size.map_or(total, |size| (start + size).min(total));
        let members = state.members.get(start..end).unwrap_or_default().to_vec();
        let next_page_token = (end < total).then(|| end.to_string());

        Ok(MemberPage {
            members,
            next_page_token,
        })
    }

    fn add_member(&self, _group: &GroupKey, email: &str) -> Result<(), ProviderError> {
        let key = email.to_lowercase();
        if self.is_failing(email) {
            return Err(ProviderError::Status {
                status: 500,
                message: format!("backend error adding {email}"),
            });
        }
        if lock(&self.not_found).contains(&key) {
            return Err(ProviderError::NotFound(format!("member {email}")));
        }
        let mut state = lock(&self.state);
        if lock(&self.conflicts).contains(&key)
            || state.members.iter().any(|m| m.email.to_lowercase() == key)
        {
            return Err(ProviderError::Conflict);
        }
        state.next_id += 1;
        let id = format!("mem-{}", state.next_id);
        state.members.push(GroupMember::new(id, email));
        Ok(())
    }

    fn remove_member(&self, _group: &GroupKey, member: &MemberId) -> Result<(), ProviderError> {
        let mut state = lock(&self.state);
        let position = state
            .members
            .iter()
            .position(|m| &m.member_id() == member)
            .ok_or_else(|| ProviderError::NotFound(format!("member {member}")))?;
        if self.is_failing(&state.members[position].email) {
            return Err(ProviderError::Status {
                status: 500,
                message: format!("backend error removing {member}"),
            });
        }
        state.members.remove(position);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Records every notification instead of sending it.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: bool,
}

impl MemoryNotifier {
    /// Every send fails; nothing is recorded.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        lock(&self.sent).clone()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, notification: &Notification) -> Result<(), ProviderError> {
        if self.failing {
            return Err(ProviderError::Status {
                status: 401,
                message: "email API rejected the key".into(),
            });
        }
        lock(&self.sent).push(notification.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryPayments {
    orders: HashMap<String, String>,
    captured: Mutex<Vec<String>>,
    fail_capture: bool,
}

impl MemoryPayments {
    pub fn with_order(mut self, order_id: &str, amount: &str) -> Self {
        self.orders.insert(order_id.to_string(), amount.to_string());
        self
    }

    pub fn failing_capture(mut self) -> Self {
        self.fail_capture = true;
        self
    }

    pub fn captured(&self) -> Vec<String> {
        lock(&self.captured).clone()
    }
}

impl PaymentProvider for MemoryPayments {
    fn order_amount(&self, order_id: &str) -> Result<String, ProviderError> {
        self.orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("order {order_id}")))
    }

    fn capture(&self, order_id: &str) -> Result<(), ProviderError> {
        if self.fail_capture {
            return Err(ProviderError::Status {
                status: 422,
                message: "order not approved".into(),
            });
        }
        if !self.orders.contains_key(order_id) {
            return Err(ProviderError::NotFound(format!("order {order_id}")));
        }
        lock(&self.captured).push(order_id.to_string());
        Ok(())
    }
}
