//! Google OAuth access tokens.
//!
//! Service accounts sign a short-lived RS256 assertion and exchange it at
//! the token endpoint (JWT bearer grant). Inside a Google runtime the
//! metadata server hands out tokens for the attached account instead.

use std::sync::Mutex;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use roster_core::ServiceAccount;
use roster_sync::ProviderError;

use crate::http::{agent, classify, read_json};

pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

pub const SCOPE_GROUP_MEMBERS: &str =
    "https://www.googleapis.com/auth/admin.directory.group.member";
pub const SCOPE_SPREADSHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";

const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_SLACK_SECS: i64 = 60;

/// Anything that can produce a bearer token.
pub trait TokenSource {
    fn access_token(&self) -> Result<String, ProviderError>;
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct Cached {
    token: String,
    expires_at: i64,
}

#[derive(Debug, Default)]
struct TokenCache(Mutex<Option<Cached>>);

impl TokenCache {
    fn get_or_fetch(
        &self,
        fetch: impl FnOnce() -> Result<TokenResponse, ProviderError>,
    ) -> Result<String, ProviderError> {
        let now = Utc::now().timestamp();
        let mut slot = self.0.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at - EXPIRY_SLACK_SECS > now {
                return Ok(cached.token.clone());
            }
        }
        let fresh = fetch()?;
        let expires_at = now + fresh.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        *slot = Some(Cached {
            token: fresh.access_token.clone(),
            expires_at,
        });
        Ok(fresh.access_token)
    }
}

// ---------------------------------------------------------------------------
// Service account
// ---------------------------------------------------------------------------

/// Token source for a service account key.
#[derive(Debug)]
pub struct ServiceAccountAuth {
    account: ServiceAccount,
    scope: String,
    /// User to impersonate (domain-wide delegation), if any.
    subject: Option<String>,
    token_url: String,
    cache: TokenCache,
}

impl ServiceAccountAuth {
    pub fn new(account: ServiceAccount, scope: &str) -> Self {
        Self {
            account,
            scope: scope.to_string(),
            subject: None,
            token_url: TOKEN_URL.to_string(),
            cache: TokenCache::default(),
        }
    }

    /// Act on behalf of `subject`. The directory API only accepts calls
    /// made as a domain administrator.
    pub fn impersonating(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn with_token_url(mut self, url: &str) -> Self {
        self.token_url = url.to_string();
        self
    }

    /// Signed assertion valid from `now` for one hour.
    pub fn assertion(&self, now: i64) -> Result<String, ProviderError> {
        let claims = AssertionClaims {
            iss: &self.account.email,
            scope: &self.scope,
            aud: &self.token_url,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
            sub: self.subject.as_deref(),
        };
        let key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes()).map_err(|e| {
            ProviderError::Auth(format!(
                "invalid private key for {}: {e}",
                self.account.email
            ))
        })?;
        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| ProviderError::Auth(e.to_string()))
    }

    fn exchange(&self) -> Result<TokenResponse, ProviderError> {
        let assertion = self.assertion(Utc::now().timestamp())?;
        tracing::debug!("requesting access token for {}", self.account.email);
        let response = agent()
            .post(&self.token_url)
            .send_form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &assertion),
            ])
            .map_err(|e| match classify(e) {
                ProviderError::Status { status, message } => {
                    ProviderError::Auth(format!("token endpoint returned {status}: {message}"))
                }
                other => other,
            })?;
        read_json(response)
    }
}

impl TokenSource for ServiceAccountAuth {
    fn access_token(&self) -> Result<String, ProviderError> {
        self.cache.get_or_fetch(|| self.exchange())
    }
}

// ---------------------------------------------------------------------------
// Metadata server
// ---------------------------------------------------------------------------

/// Token source for the runtime's attached service account.
#[derive(Debug)]
pub struct MetadataAuth {
    url: String,
    cache: TokenCache,
}

impl Default for MetadataAuth {
    fn default() -> Self {
        Self::with_url(METADATA_TOKEN_URL)
    }
}

impl MetadataAuth {
    pub fn with_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            cache: TokenCache::default(),
        }
    }
}

impl TokenSource for MetadataAuth {
    fn access_token(&self) -> Result<String, ProviderError> {
        self.cache.get_or_fetch(|| {
            let response = agent()
                .get(&self.url)
                .set("Metadata-Flavor", "Google")
                .call()
                .map_err(|e| ProviderError::Auth(format!("metadata server: {}", classify(e))))?;
            read_json(response)
        })
    }
}

/// A fixed token, for tests and for callers that already hold one.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn access_token(&self) -> Result<String, ProviderError> {
        Ok(self.0.clone())
    }
}
