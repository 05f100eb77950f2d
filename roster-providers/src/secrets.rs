//! Secret Manager access for per-environment config documents.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

use roster_core::{ConfigValues, Environment, Function};
use roster_sync::ProviderError;

use crate::google_auth::TokenSource;
use crate::http::{agent, bearer, classify, read_json};

pub const SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com";

#[derive(Debug, Deserialize)]
struct AccessResponse {
    payload: Payload,
}

#[derive(Debug, Deserialize)]
struct Payload {
    data: String,
}

pub struct SecretManager<T> {
    auth: T,
    base_url: String,
    agent: ureq::Agent,
}

impl<T: TokenSource> SecretManager<T> {
    pub fn new(auth: T) -> Self {
        Self::with_base_url(auth, SECRET_MANAGER_URL)
    }

    pub fn with_base_url(auth: T, base_url: &str) -> Self {
        Self {
            auth,
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: agent(),
        }
    }

    /// Payload of a secret version, e.g.
    /// `projects/p/secrets/s/versions/latest`.
    pub fn access(&self, name: &str) -> Result<String, ProviderError> {
        let token = self.auth.access_token()?;
        let response = self
            .agent
            .get(&format!("{}/v1/{name}:access", self.base_url))
            .set("Authorization", &bearer(&token))
            .call()
            .map_err(classify)?;
        let body: AccessResponse = read_json(response)?;
        decode_payload(&body.payload.data)
    }

    /// Config values stored for `function` in `environment`. Environments
    /// without a secret yield empty values.
    pub fn load_values(
        &self,
        environment: Environment,
        function: Function,
    ) -> Result<ConfigValues, ProviderError> {
        let Some(secret_id) = environment.secret_id(function) else {
            tracing::debug!("no secret configured for {environment}");
            return Ok(ConfigValues::default());
        };
        tracing::info!("loading config from {secret_id}");
        let payload = self.access(secret_id)?;
        ConfigValues::from_secret_json(&payload).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

fn decode_payload(data: &str) -> Result<String, ProviderError> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| ProviderError::Decode(format!("secret payload is not base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| ProviderError::Decode(format!("secret payload is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google_auth::StaticToken;
    use crate::http::testing::serve;

    #[test]
    fn payload_is_base64_json() {
        let decoded = decode_payload("eyJub1JlcGx5RW1haWwiOiJhQGIuY2EifQ==").unwrap();
        assert_eq!(decoded, r#"{"noReplyEmail":"a@b.ca"}"#);
        assert!(matches!(decode_payload("%%%"), Err(ProviderError::Decode(_))));
    }

    #[test]
    fn access_calls_the_version_resource() {
        let (base, rx) = serve(vec![(
            200,
            r#"{"name":"projects/p/secrets/s/versions/3","payload":{"data":"eyJub1JlcGx5RW1haWwiOiJhQGIuY2EifQ=="}}"#,
        )]);
        let secrets = SecretManager::with_base_url(StaticToken("t".into()), &base);

        let payload = secrets.access("projects/p/secrets/s/versions/latest").unwrap();
        let values = ConfigValues::from_secret_json(&payload).unwrap();

        assert_eq!(values.no_reply_email.as_deref(), Some("a@b.ca"));
        let request = rx.recv().unwrap();
        assert_eq!(
            request.request_line,
            "GET /v1/projects/p/secrets/s/versions/latest:access HTTP/1.1"
        );
    }

    #[test]
    fn test_environment_has_no_secret() {
        let secrets = SecretManager::with_base_url(StaticToken("t".into()), "http://127.0.0.1:9");
        let values = secrets
            .load_values(Environment::Test, Function::Synchronizer)
            .unwrap();
        assert_eq!(values, ConfigValues::default());
    }
}
