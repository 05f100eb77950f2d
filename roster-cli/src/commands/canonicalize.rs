//! `roster canonicalize`: print comparison keys.

use anyhow::Result;
use clap::Args;

use roster_core::canonicalize;

#[derive(Args, Debug)]
pub struct CanonicalizeArgs {
    /// Addresses to canonicalize.
    #[arg(required = true)]
    pub emails: Vec<String>,
}

impl CanonicalizeArgs {
    pub fn run(self) -> Result<()> {
        for email in &self.emails {
            println!("{}", canonicalize(email));
        }
        Ok(())
    }
}
