//! `roster plan`: offline reconciliation from YAML snapshots.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use roster_core::timestamp::now_seconds;
use roster_core::{GroupKey, GroupMember, Instant, MemberRecord};
use roster_sync::memory::{MemoryGroup, MemoryRoster};
use roster_sync::{pipeline, Action, Decision, Mode, Plan, PlanCounts};

/// Arguments for `roster plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// YAML list of roster rows (`email`, `expiry`, optional names).
    #[arg(long)]
    pub roster: PathBuf,

    /// YAML list of group members (`id`, `email`).
    #[arg(long)]
    pub group: PathBuf,

    /// Reconciliation mode.
    #[arg(long, default_value = "full")]
    pub mode: Mode,

    /// Reference time in epoch seconds (defaults to now).
    #[arg(long)]
    pub now: Option<Instant>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct PlanJson<'a> {
    mode: Mode,
    now: Instant,
    counts: PlanCounts,
    decisions: Vec<&'a Decision>,
}

#[derive(Tabled)]
struct PlanTableRow {
    #[tabled(rename = "email")]
    email: String,
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "member id")]
    member_id: String,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let records: Vec<MemberRecord> = read_yaml(&self.roster)?;
        let members: Vec<GroupMember> = read_yaml(&self.group)?;
        let now = self.now.unwrap_or_else(now_seconds);

        let roster = MemoryRoster::new(records);
        let group = MemoryGroup::new(members);
        let plan = pipeline::plan(&roster, &group, &GroupKey::from("snapshot"), self.mode, now)
            .context("failed to build plan")?;

        if self.json {
            let payload = PlanJson {
                mode: plan.mode,
                now,
                counts: plan.counts(),
                decisions: plan.iter().collect(),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
            );
            return Ok(());
        }

        print_table(&plan);
        Ok(())
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_table(plan: &Plan) {
    let counts = plan.counts();
    println!(
        "Plan ({}) | {} to add | {} to remove | {} unchanged",
        plan.mode, counts.add, counts.remove, counts.unchanged
    );
    if plan.is_empty() {
        println!("Nothing to reconcile.");
        return;
    }

    let rows: Vec<PlanTableRow> = plan
        .iter()
        .map(|d| PlanTableRow {
            email: d.email.to_string(),
            action: action_label(d.action),
            name: d.name.clone(),
            member_id: d
                .member_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn action_label(action: Action) -> String {
    let label = action.to_string();
    match action {
        Action::Add => label.green().bold().to_string(),
        Action::Remove | Action::Expired => label.red().bold().to_string(),
        Action::DoNothing | Action::NotExpired => label.bright_black().to_string(),
    }
}
