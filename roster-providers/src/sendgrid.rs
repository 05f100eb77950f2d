//! Transactional email through SendGrid's v3 mail endpoint.

use serde_json::{json, Value};

use roster_notify::{Notification, NotificationBody};
use roster_sync::{Notifier, ProviderError};

use crate::http::{agent, bearer, classify};

pub const SENDGRID_URL: &str = "https://api.sendgrid.com";

pub struct SendGrid {
    api_key: String,
    base_url: String,
    agent: ureq::Agent,
}

impl SendGrid {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, SENDGRID_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: agent(),
        }
    }
}

impl std::fmt::Debug for SendGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGrid")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Notifier for SendGrid {
    fn send(&self, notification: &Notification) -> Result<(), ProviderError> {
        tracing::debug!("sending email to {}", notification.to);
        self.agent
            .post(&format!("{}/v3/mail/send", self.base_url))
            .set("Authorization", &bearer(&self.api_key))
            .send_json(request_body(notification))
            .map_err(classify)?;
        Ok(())
    }
}

/// JSON payload for `POST /v3/mail/send`.
pub fn request_body(notification: &Notification) -> Value {
    let to = json!([{ "email": notification.to }]);
    let from = json!({ "email": notification.from });
    match &notification.body {
        NotificationBody::Template { template_id, data } => json!({
            "personalizations": [{ "to": to, "dynamic_template_data": data }],
            "from": from,
            "template_id": template_id,
        }),
        NotificationBody::Rendered {
            subject,
            html,
            text,
        } => json!({
            "personalizations": [{ "to": to }],
            "from": from,
            "subject": subject,
            // text/plain must precede text/html
            "content": [
                { "type": "text/plain", "value": text },
                { "type": "text/html", "value": html },
            ],
        }),
    }
}

#[cfg(test)]
mod tests {
    use roster_notify::RenderedEmail;

    use super::*;
    use crate::http::testing::serve;

    #[test]
    fn template_email_carries_dynamic_data() {
        let n = Notification::added("ann@x.com", "Ann", "no-reply@utoc.ca", "d-add");
        let body = request_body(&n);
        assert_eq!(body["template_id"], "d-add");
        assert_eq!(body["from"]["email"], "no-reply@utoc.ca");
        let p = &body["personalizations"][0];
        assert_eq!(p["to"][0]["email"], "ann@x.com");
        assert_eq!(p["dynamic_template_data"]["name"], "Ann");
        assert_eq!(p["dynamic_template_data"]["email"], "ann@x.com");
    }

    #[test]
    fn rendered_email_lists_plain_text_first() {
        let n = Notification::summary(
            "exec@utoc.ca",
            "no-reply@utoc.ca",
            RenderedEmail {
                subject: "Mailing list sync".into(),
                html: "<p>hi</p>".into(),
                text: "hi".into(),
            },
        );
        let body = request_body(&n);
        assert_eq!(body["subject"], "Mailing list sync");
        assert_eq!(body["content"][0]["type"], "text/plain");
        assert_eq!(body["content"][1]["value"], "<p>hi</p>");
        assert!(body.get("template_id").is_none());
    }

    #[test]
    fn rejected_key_is_a_status_error() {
        let (base, rx) = serve(vec![(
            401,
            r#"{"errors":[{"field":null,"message":"The provided authorization grant is invalid, expired, or revoked"}]}"#,
        )]);
        let sendgrid = SendGrid::with_base_url("SG.bad", &base);
        let n = Notification::removed("a@x.com", "", "no-reply@utoc.ca", "d-rm");

        let err = sendgrid.send(&n).unwrap_err();

        assert!(matches!(err, ProviderError::Status { status: 401, .. }));
        let request = rx.recv().unwrap();
        assert_eq!(request.request_line, "POST /v3/mail/send HTTP/1.1");
        assert!(request.headers.iter().any(|h| h == "Authorization: Bearer SG.bad"));
    }
}
