//! # roster-providers
//!
//! Blocking HTTP adapters implementing the `roster-sync` collaborator
//! traits: the directory group API, the roster spreadsheet, SendGrid,
//! Secret Manager and PayPal.

pub mod directory;
pub mod google_auth;
pub mod http;
pub mod paypal;
pub mod secrets;
pub mod sendgrid;
pub mod sheets;

pub use directory::DirectoryGroups;
pub use google_auth::{MetadataAuth, ServiceAccountAuth, StaticToken, TokenSource};
pub use paypal::PayPal;
pub use secrets::SecretManager;
pub use sendgrid::SendGrid;
pub use sheets::SheetsRoster;
