//! `roster sync`: reconcile the live group against the live roster.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use roster_core::timestamp::now_seconds;
use roster_core::{Function, SyncConfig};
use roster_providers::google_auth::{SCOPE_GROUP_MEMBERS, SCOPE_SPREADSHEETS};
use roster_providers::{DirectoryGroups, SendGrid, ServiceAccountAuth, SheetsRoster};
use roster_sync::pipeline::{self, Collaborators, RunOptions, RunReport};
use roster_sync::{ChangeKind, ItemResult, Mode, SyncError};

use super::EnvArgs;

/// Arguments for `roster sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// `full` adds and removes; `expired-only` only removes.
    #[arg(long, default_value = "full")]
    pub mode: Mode,

    /// Show what would change without calling the group API.
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub env: EnvArgs,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let (environment, values) = self.env.load(Function::Synchronizer)?;
        let config =
            SyncConfig::resolve(environment, values).context("incomplete synchronizer config")?;

        let group = DirectoryGroups::new(
            ServiceAccountAuth::new(config.directory_account.clone(), SCOPE_GROUP_MEMBERS)
                .impersonating(&config.admin_email),
        );
        let roster = SheetsRoster::new(
            ServiceAccountAuth::new(config.sheets_account.clone(), SCOPE_SPREADSHEETS),
            &config.spreadsheet_id,
            &config.sheet_name,
        );
        let notifier = SendGrid::new(&config.send_grid_api_key);
        let collaborators = Collaborators {
            roster: &roster,
            group: &group,
            notifier: &notifier,
        };
        let options = RunOptions {
            mode: self.mode,
            dry_run: self.dry_run,
            now: now_seconds(),
        };

        match pipeline::run(&config, &collaborators, &options) {
            Ok(report) => self.print(&config, &report),
            Err(SyncError::ApplyFailed {
                attempted,
                failed,
                report,
            }) => {
                self.print(&config, &report)?;
                bail!("{failed} of {attempted} change(s) failed");
            }
            Err(err) => Err(err).context("sync failed"),
        }
    }

    fn print(&self, config: &SyncConfig, report: &RunReport) -> Result<()> {
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(report).context("failed to serialize run report")?
            );
            return Ok(());
        }

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        let summary = &report.summary;
        if summary.attempted() == 0 {
            println!("{prefix}✓ {}: nothing to do", config.group_key);
            return Ok(());
        }

        let mark = if summary.has_failures() {
            "✗".red().bold()
        } else {
            "✓".green().bold()
        };
        println!(
            "{prefix}{mark} {} synced ({}): {} added, {} removed, {} failed",
            config.group_key, self.mode, summary.added, summary.removed, summary.failed
        );
        for outcome in &summary.outcomes {
            let sign = match outcome.kind {
                ChangeKind::Add => "+",
                ChangeKind::Remove => "-",
            };
            match &outcome.result {
                ItemResult::Applied => println!("  {sign}  {}", outcome.email),
                ItemResult::AlreadyPresent => {
                    println!("  {sign}  {} (already a member)", outcome.email)
                }
                ItemResult::WouldApply => println!("  ~{sign} {}", outcome.email),
                ItemResult::Failed(reason) => {
                    println!("  {}  {} ({reason})", "✗".red(), outcome.email)
                }
            }
        }
        if report.summary_sent {
            println!("Summary emailed.");
        }
        Ok(())
    }
}
