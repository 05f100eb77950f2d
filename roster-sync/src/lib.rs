//! # roster-sync
//!
//! Membership roster to mailing-list reconciliation.
//!
//! [`MembershipIndex`] and [`GroupSnapshot`] key both sides by canonical
//! email, [`reconcile`] classifies every address, and [`ChangeApplier`]
//! executes the resulting [`Plan`]. [`pipeline::run`] wires these together
//! behind the collaborator traits in [`provider`]. The membership form
//! backend lives in [`enroll`].

pub mod apply;
pub mod engine;
pub mod enroll;
pub mod error;
pub mod index;
pub mod memory;
pub mod pipeline;
pub mod provider;
pub mod snapshot;

pub use apply::{ApplySummary, ChangeApplier, ChangeKind, ItemOutcome, ItemResult, NotifyTemplates};
pub use engine::{reconcile, Action, Decision, Mode, Plan, PlanCounts};
pub use enroll::{EnrollFailure, EnrollOutcome, EnrollState, Enrollment};
pub use error::{EnrollError, ProviderError, SyncError};
pub use index::{display_name, IndexEntry, MembershipIndex};
pub use pipeline::{Collaborators, RunOptions, RunReport};
pub use provider::{
    list_all_members, GroupProvider, MemberPage, Notifier, PaymentProvider, RosterSource,
    RosterWriter,
};
pub use snapshot::{GroupSnapshot, SnapshotEntry};
