//! `roster enroll`: run the membership form backend for one submission.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;

use roster_core::{EnrollConfig, Function};
use roster_providers::google_auth::SCOPE_SPREADSHEETS;
use roster_providers::{PayPal, ServiceAccountAuth, SheetsRoster};
use roster_sync::Enrollment;

use super::EnvArgs;

/// Arguments for `roster enroll`.
#[derive(Args, Debug)]
pub struct EnrollArgs {
    /// JSON form body (`orderID`, `membership_type` and member fields).
    #[arg(long)]
    pub body: PathBuf,

    /// HTTP method the submission arrived with.
    #[arg(long, default_value = "POST")]
    pub method: String,

    #[command(flatten)]
    pub env: EnvArgs,
}

impl EnrollArgs {
    pub fn run(self) -> Result<()> {
        let raw = std::fs::read_to_string(&self.body)
            .with_context(|| format!("failed to read {}", self.body.display()))?;
        let body: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not JSON", self.body.display()))?;

        let (environment, values) = self.env.load(Function::MembershipForm)?;
        let config = EnrollConfig::resolve(environment, values)
            .context("incomplete membership form config")?;

        let payments = PayPal::new(
            &config.pay_pal_client_id,
            &config.pay_pal_client_secret,
            config.use_sandbox,
        );
        let roster = SheetsRoster::new(
            ServiceAccountAuth::new(config.sheets_account.clone(), SCOPE_SPREADSHEETS),
            &config.spreadsheet_id,
            &config.sheet_name,
        );

        match Enrollment::new(&payments, &roster, &config.success_url).process(
            &self.method,
            &body,
            Utc::now(),
        ) {
            Ok(outcome) => {
                println!("{}", outcome.redirect_url);
                Ok(())
            }
            Err(failure) => {
                tracing::error!("{failure}");
                bail!("HTTP {}: {}", failure.status(), failure.user_message())
            }
        }
    }
}
