//! Reconciliation engine.
//!
//! Classifies every canonical email seen in the group or the roster. The
//! engine is a pure function of its two lookup structures; it never fails
//! and never reads the clock.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use roster_core::{CanonicalEmail, MemberId};

use crate::index::{display_name, MembershipIndex};
use crate::snapshot::GroupSnapshot;

// ---------------------------------------------------------------------------
// Mode / Action
// ---------------------------------------------------------------------------

/// Which synchronizer variant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Add unexpired members missing from the group, remove everyone else.
    #[default]
    Full,
    /// Only remove group members that are expired or unknown to the roster.
    ExpiredOnly,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Full => write!(f, "full"),
            Mode::ExpiredOnly => write!(f, "expired-only"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Mode::Full),
            "expired-only" | "expired" => Ok(Mode::ExpiredOnly),
            other => Err(format!(
                "unknown mode '{other}'. Valid values: full, expired-only"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Add,
    Remove,
    DoNothing,
    Expired,
    NotExpired,
}

impl Action {
    /// Whether applying the plan touches the group for this action.
    pub fn is_change(self) -> bool {
        matches!(self, Action::Add | Action::Remove | Action::Expired)
    }

    /// Expired members are removed, so both map onto a removal.
    pub fn is_removal(self) -> bool {
        matches!(self, Action::Remove | Action::Expired)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Add => "add",
            Action::Remove => "remove",
            Action::DoNothing => "do-nothing",
            Action::Expired => "expired",
            Action::NotExpired => "not-expired",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// The engine's verdict for one canonical email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub email: CanonicalEmail,
    pub action: Action,
    /// Provider id, present whenever the address is in the group.
    pub member_id: Option<MemberId>,
    /// Address to add or to notify: the roster's spelling for adds, the
    /// group's spelling otherwise.
    pub address: String,
    /// Greeting name for the notification email.
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanCounts {
    pub add: usize,
    pub remove: usize,
    pub unchanged: usize,
}

/// One decision per canonical email, ordered by canonical email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub mode: Mode,
    decisions: BTreeMap<CanonicalEmail, Decision>,
}

impl Plan {
    pub fn get(&self, email: &CanonicalEmail) -> Option<&Decision> {
        self.decisions.get(email)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.values()
    }

    /// Decisions that require a provider call, in canonical-email order.
    pub fn changes(&self) -> impl Iterator<Item = &Decision> {
        self.iter().filter(|d| d.action.is_change())
    }

    pub fn counts(&self) -> PlanCounts {
        let mut counts = PlanCounts::default();
        for d in self.iter() {
            match d.action {
                Action::Add => counts.add += 1,
                Action::Remove | Action::Expired => counts.remove += 1,
                Action::DoNothing | Action::NotExpired => counts.unchanged += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// Compute the plan that makes the group match the unexpired roster.
pub fn reconcile(group: &GroupSnapshot, index: &MembershipIndex, mode: Mode) -> Plan {
    let decisions = match mode {
        Mode::Full => reconcile_full(group, index),
        Mode::ExpiredOnly => reconcile_expired(group, index),
    };
    Plan { mode, decisions }
}

fn reconcile_full(
    group: &GroupSnapshot,
    index: &MembershipIndex,
) -> BTreeMap<CanonicalEmail, Decision> {
    let mut decisions = BTreeMap::new();

    // Group members start as removals; roster entries below overwrite them.
    for (email, member) in group.iter() {
        decisions.insert(
            email.clone(),
            Decision {
                email: email.clone(),
                action: Action::Remove,
                member_id: Some(member.member_id.clone()),
                address: member.email.clone(),
                name: display_name(index.get(email)),
            },
        );
    }

    for (email, entry) in index.iter() {
        let member = group.get(email);
        let action = match (entry.expired, member.is_some()) {
            (true, true) => Action::Remove,
            (true, false) => Action::DoNothing,
            (false, true) => Action::DoNothing,
            (false, false) => Action::Add,
        };
        decisions.insert(
            email.clone(),
            Decision {
                email: email.clone(),
                action,
                member_id: member.map(|m| m.member_id.clone()),
                address: member.map_or_else(|| entry.email.clone(), |m| m.email.clone()),
                name: display_name(Some(entry)),
            },
        );
    }

    decisions
}

fn reconcile_expired(
    group: &GroupSnapshot,
    index: &MembershipIndex,
) -> BTreeMap<CanonicalEmail, Decision> {
    group
        .iter()
        .map(|(email, member)| {
            let entry = index.get(email);
            let action = match entry {
                Some(e) if !e.expired => Action::NotExpired,
                _ => Action::Expired,
            };
            let decision = Decision {
                email: email.clone(),
                action,
                member_id: Some(member.member_id.clone()),
                address: member.email.clone(),
                name: display_name(entry),
            };
            (email.clone(), decision)
        })
        .collect()
}
