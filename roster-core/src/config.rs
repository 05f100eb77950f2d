//! Run configuration.
//!
//! # Sources
//!
//! Values are merged from, in order of precedence:
//! 1. an explicit YAML/JSON file (`load_values_at`)
//! 2. the JSON secret for the deployment environment (`from_secret_json`)
//! 3. built-in defaults (`ConfigValues::defaults`)
//!
//! The merged [`ConfigValues`] are then resolved into a [`SyncConfig`] or an
//! [`EnrollConfig`]; a required key that is still empty is a
//! [`ConfigError::MissingKey`]. Resolved configs are plain values passed by
//! reference through the call chain.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::GroupKey;

/// Environment variable that selects the deployment environment.
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

const DEFAULT_NO_REPLY_EMAIL: &str = "no-reply@utoc.ca";
const DEFAULT_REMOVE_TEMPLATE_ID: &str = "d-b23a2ee67d8f4f78bda907112024537a";
const DEFAULT_SUCCESS_URL: &str = "https://utoc.ca/membership-success";

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Development,
    Test,
}

/// Which function's secret to read; each keeps its own config document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Synchronizer,
    MembershipForm,
}

impl Environment {
    /// Read [`ENVIRONMENT_VAR`]. Unset counts as unknown.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(ENVIRONMENT_VAR).unwrap_or_default();
        raw.parse()
    }

    /// Secret Manager resource holding the config JSON, if this environment has one.
    ///
    /// `test` never reads a secret; production secrets are not provisioned and
    /// must come from a config file.
    pub fn secret_id(self, function: Function) -> Option<&'static str> {
        match (self, function) {
            (Environment::Development, Function::Synchronizer) => Some(
                "projects/620400297419/secrets/mailing-list-synchronizer-config/versions/latest",
            ),
            (Environment::Development, Function::MembershipForm) => Some(
                "projects/620400297419/secrets/membership-form-backend-config/versions/latest",
            ),
            (Environment::Production, _) | (Environment::Test, _) => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Environment::Production),
            "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw values
// ---------------------------------------------------------------------------

/// Unresolved config values. Keys match the secret JSON documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigValues {
    pub google_group_email: Option<String>,
    pub admin_email: Option<String>,
    pub database_spreadsheet_id: Option<String>,
    pub database_sheet_name: Option<String>,
    pub google_sheets_service_account_email: Option<String>,
    pub google_sheets_service_account_key: Option<String>,
    pub directory_api_service_account_email: Option<String>,
    pub directory_api_service_account_key: Option<String>,
    pub send_grid_api_key: Option<String>,
    pub no_reply_email: Option<String>,
    pub remove_email_template_id: Option<String>,
    pub add_email_template_id: Option<String>,
    pub summary_email_recipient: Option<String>,
    pub pay_pal_client_id: Option<String>,
    pub pay_pal_client_secret: Option<String>,
    pub use_sandbox: Option<bool>,
    pub success_url: Option<String>,
}

macro_rules! merge_fields {
    ($primary:ident, $fallback:ident, $($field:ident),+ $(,)?) => {
        ConfigValues {
            $($field: $primary.$field.or($fallback.$field),)+
        }
    };
}

impl ConfigValues {
    pub fn defaults() -> Self {
        Self {
            no_reply_email: Some(DEFAULT_NO_REPLY_EMAIL.to_string()),
            remove_email_template_id: Some(DEFAULT_REMOVE_TEMPLATE_ID.to_string()),
            success_url: Some(DEFAULT_SUCCESS_URL.to_string()),
            ..Self::default()
        }
    }

    /// Parse the JSON document stored in the secret store.
    pub fn from_secret_json(payload: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Keep every value set in `self`; fill the gaps from `fallback`.
    pub fn merge(self, fallback: ConfigValues) -> ConfigValues {
        merge_fields!(
            self,
            fallback,
            google_group_email,
            admin_email,
            database_spreadsheet_id,
            database_sheet_name,
            google_sheets_service_account_email,
            google_sheets_service_account_key,
            directory_api_service_account_email,
            directory_api_service_account_key,
            send_grid_api_key,
            no_reply_email,
            remove_email_template_id,
            add_email_template_id,
            summary_email_recipient,
            pay_pal_client_id,
            pay_pal_client_secret,
            use_sandbox,
            success_url,
        )
    }
}

/// Load config values from a YAML (or JSON) file.
pub fn load_values_at(path: &Path) -> Result<ConfigValues, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingKey { key }),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Resolved configs
// ---------------------------------------------------------------------------

/// Service-account credentials for Google APIs.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    pub email: String,
    /// PEM private key. Escaped `\n` sequences from JSON secrets are expanded.
    pub private_key: String,
}

impl ServiceAccount {
    pub fn new(email: String, private_key: String) -> Self {
        Self {
            email,
            private_key: private_key.replace("\\n", "\n"),
        }
    }
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("email", &self.email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Everything the mailing-list synchronizer needs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub environment: Environment,
    pub group_key: GroupKey,
    /// Account impersonated for directory calls.
    pub admin_email: String,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub sheets_account: ServiceAccount,
    pub directory_account: ServiceAccount,
    pub send_grid_api_key: String,
    pub no_reply_email: String,
    pub remove_template_id: String,
    /// No welcome email is sent when unset.
    pub add_template_id: Option<String>,
    /// No summary email is sent when unset.
    pub summary_recipient: Option<String>,
}

impl SyncConfig {
    pub fn resolve(environment: Environment, values: ConfigValues) -> Result<Self, ConfigError> {
        let values = values.merge(ConfigValues::defaults());
        Ok(Self {
            environment,
            group_key: GroupKey(required(values.google_group_email, "googleGroupEmail")?),
            admin_email: required(values.admin_email, "adminEmail")?,
            spreadsheet_id: required(values.database_spreadsheet_id, "databaseSpreadsheetId")?,
            sheet_name: required(values.database_sheet_name, "databaseSheetName")?,
            sheets_account: ServiceAccount::new(
                required(
                    values.google_sheets_service_account_email,
                    "googleSheetsServiceAccountEmail",
                )?,
                required(
                    values.google_sheets_service_account_key,
                    "googleSheetsServiceAccountKey",
                )?,
            ),
            directory_account: ServiceAccount::new(
                required(
                    values.directory_api_service_account_email,
                    "directoryApiServiceAccountEmail",
                )?,
                required(
                    values.directory_api_service_account_key,
                    "directoryApiServiceAccountKey",
                )?,
            ),
            send_grid_api_key: required(values.send_grid_api_key, "sendGridApiKey")?,
            no_reply_email: required(values.no_reply_email, "noReplyEmail")?,
            remove_template_id: required(values.remove_email_template_id, "removeEmailTemplateId")?,
            add_template_id: optional(values.add_email_template_id),
            summary_recipient: optional(values.summary_email_recipient),
        })
    }
}

/// Everything the membership form backend needs.
#[derive(Debug, Clone)]
pub struct EnrollConfig {
    pub environment: Environment,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub sheets_account: ServiceAccount,
    pub pay_pal_client_id: String,
    pub pay_pal_client_secret: String,
    pub use_sandbox: bool,
    pub success_url: String,
}

impl EnrollConfig {
    pub fn resolve(environment: Environment, values: ConfigValues) -> Result<Self, ConfigError> {
        let values = values.merge(ConfigValues::defaults());
        Ok(Self {
            environment,
            spreadsheet_id: required(values.database_spreadsheet_id, "databaseSpreadsheetId")?,
            sheet_name: required(values.database_sheet_name, "databaseSheetName")?,
            sheets_account: ServiceAccount::new(
                required(
                    values.google_sheets_service_account_email,
                    "googleSheetsServiceAccountEmail",
                )?,
                required(
                    values.google_sheets_service_account_key,
                    "googleSheetsServiceAccountKey",
                )?,
            ),
            pay_pal_client_id: required(values.pay_pal_client_id, "payPalClientId")?,
            pay_pal_client_secret: required(values.pay_pal_client_secret, "payPalClientSecret")?,
            use_sandbox: values
                .use_sandbox
                .ok_or(ConfigError::MissingKey { key: "useSandbox" })?,
            success_url: required(values.success_url, "successUrl")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
