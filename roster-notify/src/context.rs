//! Summary context: serializable payload for the run summary email.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use roster_core::Environment;

use crate::error::NotifyError;

/// Everything the summary templates can reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryContext {
    pub environment: String,
    pub group: String,
    /// `full` or `expired-only`.
    pub mode: String,
    pub dry_run: bool,
    pub started_at: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub failed: Vec<FailedItemCtx>,
    pub counts: CountsCtx,
    pub meta: MetaCtx,
}

/// One add/remove that the provider rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItemCtx {
    pub email: String,
    pub action: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountsCtx {
    pub added: usize,
    pub removed: usize,
    pub failed: usize,
    pub attempted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    pub roster_version: String,
}

impl SummaryContext {
    pub fn new(
        environment: Environment,
        group: &str,
        mode: &str,
        dry_run: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            environment: environment.to_string(),
            group: group.to_string(),
            mode: mode.to_string(),
            dry_run,
            started_at: started_at.to_rfc3339(),
            added: Vec::new(),
            removed: Vec::new(),
            failed: Vec::new(),
            counts: CountsCtx {
                added: 0,
                removed: 0,
                failed: 0,
                attempted: 0,
            },
            meta: MetaCtx {
                roster_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    pub fn push_added(&mut self, email: &str) {
        self.added.push(email.to_string());
        self.recount();
    }

    pub fn push_removed(&mut self, email: &str) {
        self.removed.push(email.to_string());
        self.recount();
    }

    pub fn push_failed(&mut self, email: &str, action: &str, reason: &str) {
        self.failed.push(FailedItemCtx {
            email: email.to_string(),
            action: action.to_string(),
            reason: reason.to_string(),
        });
        self.recount();
    }

    /// Nothing changed and nothing failed.
    pub fn is_empty(&self) -> bool {
        self.counts.attempted == 0
    }

    fn recount(&mut self) {
        self.counts = CountsCtx {
            added: self.added.len(),
            removed: self.removed.len(),
            failed: self.failed.len(),
            attempted: self.added.len() + self.removed.len() + self.failed.len(),
        };
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, NotifyError> {
        tera::Context::from_serialize(self).map_err(NotifyError::from)
    }
}
