//! PayPal Orders v2 adapter.

use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};

use roster_sync::{PaymentProvider, ProviderError};

use crate::http::{agent, bearer, classify, read_json};

pub const SANDBOX_URL: &str = "https://api-m.sandbox.paypal.com";
pub const LIVE_URL: &str = "https://api-m.paypal.com";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct PayPal {
    client_id: String,
    client_secret: String,
    base_url: String,
    agent: ureq::Agent,
    token: Mutex<Option<String>>,
}

impl PayPal {
    pub fn new(client_id: &str, client_secret: &str, sandbox: bool) -> Self {
        let base_url = if sandbox { SANDBOX_URL } else { LIVE_URL };
        Self::with_base_url(client_id, client_secret, base_url)
    }

    pub fn with_base_url(client_id: &str, client_secret: &str, base_url: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: agent(),
            token: Mutex::new(None),
        }
    }

    /// Client-credentials token, fetched once per adapter.
    fn access_token(&self) -> Result<String, ProviderError> {
        let mut slot = self.token.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let credentials = STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        let response = self
            .agent
            .post(&format!("{}/v1/oauth2/token", self.base_url))
            .set("Authorization", &format!("Basic {credentials}"))
            .send_form(&[("grant_type", "client_credentials")])
            .map_err(|e| ProviderError::Auth(classify(e).to_string()))?;
        let token = read_json::<TokenResponse>(response)?.access_token;
        *slot = Some(token.clone());
        Ok(token)
    }

    fn order_url(&self, order_id: &str) -> String {
        format!(
            "{}/v2/checkout/orders/{}",
            self.base_url,
            urlencoding::encode(order_id)
        )
    }
}

impl std::fmt::Debug for PayPal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPal")
            .field("client_id", &self.client_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PaymentProvider for PayPal {
    fn order_amount(&self, order_id: &str) -> Result<String, ProviderError> {
        let token = self.access_token()?;
        let response = self
            .agent
            .get(&self.order_url(order_id))
            .set("Authorization", &bearer(&token))
            .call()
            .map_err(classify)?;
        let order: Value = read_json(response)?;
        amount_of(&order)
    }

    fn capture(&self, order_id: &str) -> Result<(), ProviderError> {
        let token = self.access_token()?;
        self.agent
            .post(&format!("{}/capture", self.order_url(order_id)))
            .set("Authorization", &bearer(&token))
            .send_json(json!({}))
            .map_err(classify)?;
        Ok(())
    }
}

/// `purchase_units[0].amount.value` of an order.
fn amount_of(order: &Value) -> Result<String, ProviderError> {
    order
        .pointer("/purchase_units/0/amount/value")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| ProviderError::Decode("order has no purchase unit amount".into()))
}
