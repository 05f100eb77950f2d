//! Synchronizer pipeline shared by `roster sync` and `roster plan`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use roster_core::timestamp::from_seconds;
use roster_core::{GroupKey, Instant, SyncConfig};
use roster_notify::{Notification, Renderer, SummaryContext};

use crate::apply::{ApplySummary, ChangeApplier, ChangeKind, ItemResult, NotifyTemplates};
use crate::engine::{reconcile, Mode, Plan};
use crate::error::SyncError;
use crate::index::MembershipIndex;
use crate::provider::{list_all_members, GroupProvider, Notifier, RosterSource};
use crate::snapshot::GroupSnapshot;

/// External systems a run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub roster: &'a dyn RosterSource,
    pub group: &'a dyn GroupProvider,
    pub notifier: &'a dyn Notifier,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub mode: Mode,
    pub dry_run: bool,
    /// Reference time for expiry checks.
    pub now: Instant,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub plan: Plan,
    pub summary: ApplySummary,
    /// Whether the summary email went out.
    pub summary_sent: bool,
}

/// Read both sides and reconcile them. Nothing is mutated.
pub fn plan(
    roster: &dyn RosterSource,
    group: &dyn GroupProvider,
    group_key: &GroupKey,
    mode: Mode,
    now: Instant,
) -> Result<Plan, SyncError> {
    tracing::info!("listing members of {group_key}");
    let members = list_all_members(group, group_key).map_err(SyncError::GroupRead)?;

    tracing::info!("reading roster");
    let records = roster.read_records().map_err(SyncError::RosterRead)?;

    tracing::info!("calculating changes ({mode} mode)");
    let snapshot = GroupSnapshot::build(&members);
    let index = MembershipIndex::build(&records, now);
    let plan = reconcile(&snapshot, &index, mode);

    let counts = plan.counts();
    tracing::info!(
        "{} group member(s), {} roster entr(ies): {} to add, {} to remove, {} unchanged",
        snapshot.len(),
        index.len(),
        counts.add,
        counts.remove,
        counts.unchanged
    );
    Ok(plan)
}

/// Run the synchronizer end to end.
///
/// Upstream read failures abort before anything is mutated. Per-item
/// failures do not stop the batch; they surface afterwards as
/// [`SyncError::ApplyFailed`] carrying the full report.
pub fn run(
    config: &SyncConfig,
    collaborators: &Collaborators<'_>,
    options: &RunOptions,
) -> Result<RunReport, SyncError> {
    let started_at = from_seconds(options.now).unwrap_or_else(Utc::now);

    let plan = plan(
        collaborators.roster,
        collaborators.group,
        &config.group_key,
        options.mode,
        options.now,
    )?;

    tracing::info!("applying changes");
    let templates = notify_templates(config);
    let summary = ChangeApplier::new(
        collaborators.group,
        collaborators.notifier,
        &config.group_key,
        &templates,
    )
    .dry_run(options.dry_run)
    .apply(&plan);

    let summary_sent = send_summary(config, collaborators.notifier, options, started_at, &summary);

    tracing::info!(
        "done: {} added, {} removed, {} failed",
        summary.added,
        summary.removed,
        summary.failed
    );

    let report = RunReport {
        plan,
        summary,
        summary_sent,
    };
    if report.summary.has_failures() {
        return Err(SyncError::ApplyFailed {
            attempted: report.summary.attempted(),
            failed: report.summary.failed,
            report: Box::new(report),
        });
    }
    Ok(report)
}

pub fn notify_templates(config: &SyncConfig) -> NotifyTemplates {
    NotifyTemplates {
        from: config.no_reply_email.clone(),
        added: config.add_template_id.clone(),
        removed: config.remove_template_id.clone(),
    }
}

/// Build the summary context for a finished apply phase.
pub fn summary_context(
    config: &SyncConfig,
    options: &RunOptions,
    started_at: DateTime<Utc>,
    summary: &ApplySummary,
) -> SummaryContext {
    let mut ctx = SummaryContext::new(
        config.environment,
        &config.group_key.0,
        &options.mode.to_string(),
        options.dry_run,
        started_at,
    );
    for outcome in &summary.outcomes {
        match (&outcome.result, outcome.kind) {
            (ItemResult::Failed(reason), kind) => {
                ctx.push_failed(&outcome.email, &kind.to_string(), reason)
            }
            (_, ChangeKind::Add) => ctx.push_added(&outcome.email),
            (_, ChangeKind::Remove) => ctx.push_removed(&outcome.email),
        }
    }
    ctx
}

/// Best effort: returns whether the summary was sent.
fn send_summary(
    config: &SyncConfig,
    notifier: &dyn Notifier,
    options: &RunOptions,
    started_at: DateTime<Utc>,
    summary: &ApplySummary,
) -> bool {
    let Some(recipient) = config.summary_recipient.as_deref() else {
        return false;
    };
    if options.dry_run || summary.attempted() == 0 {
        return false;
    }

    tracing::info!("sending summary to {recipient}");
    let ctx = summary_context(config, options, started_at, summary);
    let rendered = match Renderer::new().and_then(|r| r.render_summary(&ctx)) {
        Ok(rendered) => rendered,
        Err(err) => {
            tracing::warn!("could not render summary email: {err}");
            return false;
        }
    };

    let notification = Notification::summary(recipient, &config.no_reply_email, rendered);
    match notifier.send(&notification) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("could not send summary email: {err}");
            false
        }
    }
}
