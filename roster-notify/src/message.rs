//! Outgoing email payloads.
//!
//! A [`Notification`] is either a provider-side dynamic template (member
//! emails) or a pre-rendered body (the run summary). The email adapter
//! decides how to put either on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::RenderedEmail;

/// One email to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub from: String,
    pub body: NotificationBody,
}

/// What the email contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationBody {
    /// Rendered by the email provider from a stored template.
    Template { template_id: String, data: Value },
    /// Rendered locally.
    Rendered {
        subject: String,
        html: String,
        text: String,
    },
}

impl Notification {
    /// Tell a member they were added to the mailing list.
    pub fn added(to: &str, name: &str, from: &str, template_id: &str) -> Self {
        Self::template(to, name, from, template_id)
    }

    /// Tell a member they were removed from the mailing list.
    pub fn removed(to: &str, name: &str, from: &str, template_id: &str) -> Self {
        Self::template(to, name, from, template_id)
    }

    /// Wrap a rendered run summary.
    pub fn summary(to: &str, from: &str, email: RenderedEmail) -> Self {
        Self {
            to: to.to_string(),
            from: from.to_string(),
            body: NotificationBody::Rendered {
                subject: email.subject,
                html: email.html,
                text: email.text,
            },
        }
    }

    fn template(to: &str, name: &str, from: &str, template_id: &str) -> Self {
        Self {
            to: to.to_string(),
            from: from.to_string(),
            body: NotificationBody::Template {
                template_id: template_id.to_string(),
                data: json!({ "email": to, "name": name }),
            },
        }
    }

    pub fn template_id(&self) -> Option<&str> {
        match &self.body {
            NotificationBody::Template { template_id, .. } => Some(template_id),
            NotificationBody::Rendered { .. } => None,
        }
    }
}
