//! Change applier: executes a [`Plan`] against the group provider.
//!
//! Items are applied one at a time in plan order. A failing item is
//! recorded and the batch moves on; nothing already applied is rolled back.

use serde::Serialize;

use roster_core::{GroupKey, MemberId};
use roster_notify::Notification;

use crate::engine::{Action, Decision, Plan};
use crate::error::ProviderError;
use crate::provider::{GroupProvider, Notifier};

/// Provider operation performed for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Remove,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Add => write!(f, "add"),
            ChangeKind::Remove => write!(f, "remove"),
        }
    }
}

/// Per-item result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ItemResult {
    /// The provider call succeeded.
    Applied,
    /// Add hit a conflict: the address was already a member.
    AlreadyPresent,
    /// `--dry-run`: the call *would* have been made.
    WouldApply,
    Failed(String),
}

impl ItemResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, ItemResult::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    /// Address the call targeted.
    pub email: String,
    pub kind: ChangeKind,
    pub result: ItemResult,
}

/// Aggregate of one apply phase. A single `failed` count covers adds and
/// removes alike.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub added: usize,
    pub removed: usize,
    pub failed: usize,
    pub outcomes: Vec<ItemOutcome>,
}

impl ApplySummary {
    pub fn attempted(&self) -> usize {
        self.added + self.removed + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    fn record(&mut self, email: &str, kind: ChangeKind, result: ItemResult) {
        match (&result, kind) {
            (ItemResult::Failed(_), _) => self.failed += 1,
            (_, ChangeKind::Add) => self.added += 1,
            (_, ChangeKind::Remove) => self.removed += 1,
        }
        self.outcomes.push(ItemOutcome {
            email: email.to_string(),
            kind,
            result,
        });
    }
}

/// Where member notifications come from and which templates they use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyTemplates {
    pub from: String,
    /// `None` skips the welcome email on add.
    pub added: Option<String>,
    pub removed: String,
}

pub struct ChangeApplier<'a> {
    group: &'a dyn GroupProvider,
    notifier: &'a dyn Notifier,
    group_key: &'a GroupKey,
    templates: &'a NotifyTemplates,
    dry_run: bool,
}

impl<'a> ChangeApplier<'a> {
    pub fn new(
        group: &'a dyn GroupProvider,
        notifier: &'a dyn Notifier,
        group_key: &'a GroupKey,
        templates: &'a NotifyTemplates,
    ) -> Self {
        Self {
            group,
            notifier,
            group_key,
            templates,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Apply every change in `plan`.
    pub fn apply(&self, plan: &Plan) -> ApplySummary {
        let mut summary = ApplySummary::default();
        for decision in plan.changes() {
            let (kind, result) = if decision.action.is_removal() {
                (ChangeKind::Remove, self.remove(decision))
            } else {
                (ChangeKind::Add, self.add(decision))
            };
            summary.record(&decision.address, kind, result);
        }
        summary
    }

    fn add(&self, decision: &Decision) -> ItemResult {
        debug_assert_eq!(decision.action, Action::Add);
        let email = decision.address.as_str();
        if self.dry_run {
            tracing::info!("[dry-run] would add {email}");
            return ItemResult::WouldApply;
        }

        tracing::info!("adding {email}");
        match self.group.add_member(self.group_key, email) {
            Ok(()) => {
                if let Some(template) = &self.templates.added {
                    self.notify(Notification::added(
                        email,
                        &decision.name,
                        &self.templates.from,
                        template,
                    ));
                }
                ItemResult::Applied
            }
            Err(ProviderError::Conflict) => {
                tracing::info!("{email} is already a member of {}", self.group_key);
                ItemResult::AlreadyPresent
            }
            Err(err) => {
                tracing::error!("failed to add {email}: {err}");
                ItemResult::Failed(err.to_string())
            }
        }
    }

    fn remove(&self, decision: &Decision) -> ItemResult {
        let email = decision.address.as_str();
        let member_id = decision
            .member_id
            .clone()
            .unwrap_or_else(|| MemberId::from(email));
        if self.dry_run {
            tracing::info!("[dry-run] would remove {email}");
            return ItemResult::WouldApply;
        }

        tracing::info!("removing {email}");
        match self.group.remove_member(self.group_key, &member_id) {
            Ok(()) => {
                self.notify(Notification::removed(
                    email,
                    &decision.name,
                    &self.templates.from,
                    &self.templates.removed,
                ));
                ItemResult::Applied
            }
            Err(err) => {
                tracing::error!("failed to remove {email}: {err}");
                ItemResult::Failed(err.to_string())
            }
        }
    }

    fn notify(&self, notification: Notification) {
        if let Err(err) = self.notifier.send(&notification) {
            tracing::warn!("could not email {}: {err}", notification.to);
        }
    }
}
