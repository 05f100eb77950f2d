//! # roster-notify
//!
//! Email payloads for member notifications and a Tera-based renderer for the
//! run summary email.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use roster_core::Environment;
//! use roster_notify::{Notification, Renderer, SummaryContext};
//!
//! fn summary_for(admin: &str) -> Option<Notification> {
//!     let mut ctx =
//!         SummaryContext::new(Environment::Test, "members@utoc.ca", "full", false, Utc::now());
//!     ctx.push_added("new@x.com");
//!     let email = Renderer::new().ok()?.render_summary(&ctx).ok()?;
//!     Some(Notification::summary(admin, "no-reply@utoc.ca", email))
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod message;

pub use context::SummaryContext;
pub use engine::{RenderedEmail, Renderer};
pub use error::NotifyError;
pub use message::{Notification, NotificationBody};
