//! Membership form backend.
//!
//! Validates a form submission, checks and captures the payment, then
//! appends the new member to the roster. The next synchronizer run adds
//! them to the group.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use roster_core::timestamp::{add_months, to_seconds, to_sheets_serial};
use roster_core::MembershipType;

use crate::error::EnrollError;
use crate::provider::{PaymentProvider, RosterWriter};

// ---------------------------------------------------------------------------
// Progress state
// ---------------------------------------------------------------------------

/// How far a submission got. Shown to the member when something fails so
/// they know whether they were charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollState {
    NotCharged,
    Capturing,
    /// Charged, but the roster row was not written.
    Captured,
}

impl EnrollState {
    pub fn message(self) -> &'static str {
        match self {
            EnrollState::NotCharged => {
                "You have not been charged and you were not added to our database."
            }
            EnrollState::Capturing => "You have not been added to our database.",
            EnrollState::Captured => {
                "Your payment has been processed but you have not been added to our database."
            }
        }
    }
}

/// A rejected submission together with the state it was in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollFailure {
    pub error: EnrollError,
    pub state: EnrollState,
}

impl EnrollFailure {
    pub fn status(&self) -> u16 {
        self.error.status()
    }

    /// HTML-safe line breaks, ready for the response body.
    pub fn user_message(&self) -> String {
        format!(
            "Oops!\n{} An error has occurred, please contact UTOC.\n\nTechnical details:\n{}",
            self.state.message(),
            self.error
        )
        .replace('\n', "<br/>")
    }
}

impl std::fmt::Display for EnrollFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (HTTP {}, {:?})", self.error, self.status(), self.state)
    }
}

impl std::error::Error for EnrollFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

// ---------------------------------------------------------------------------
// Request validation
// ---------------------------------------------------------------------------

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollRequest {
    pub order_id: String,
    pub membership: MembershipType,
    /// Every top-level form field, stringified, ordered by field name.
    pub fields: Vec<(String, String)>,
}

pub fn validate_request(method: &str, body: &Value) -> Result<EnrollRequest, EnrollError> {
    if !method.eq_ignore_ascii_case("POST") {
        return Err(EnrollError::BadRequest(
            "Invalid request. Not using POST method".into(),
        ));
    }

    let order_id = body
        .get("orderID")
        .and_then(Value::as_str)
        .ok_or_else(|| EnrollError::BadRequest("No orderID contained in request.".into()))?;

    let membership = body
        .get("membership_type")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<MembershipType>().ok())
        .ok_or_else(|| {
            EnrollError::BadRequest("No valid membership_type contained in request.".into())
        })?;

    let fields = body
        .as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), field_text(v)))
                .collect()
        })
        .unwrap_or_default();

    Ok(EnrollRequest {
        order_id: order_id.to_string(),
        membership,
        fields,
    })
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Leading integer of `s`, ignoring whatever follows (`"20.00"` is 20).
pub(crate) fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

// ---------------------------------------------------------------------------
// Enrollment
// ---------------------------------------------------------------------------

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollOutcome {
    pub redirect_url: String,
    pub row: Vec<(String, String)>,
}

pub struct Enrollment<'a> {
    payments: &'a dyn PaymentProvider,
    roster: &'a dyn RosterWriter,
    success_url: &'a str,
}

impl<'a> Enrollment<'a> {
    pub fn new(
        payments: &'a dyn PaymentProvider,
        roster: &'a dyn RosterWriter,
        success_url: &'a str,
    ) -> Self {
        Self {
            payments,
            roster,
            success_url,
        }
    }

    /// Handle one submission received at `now`.
    pub fn process(
        &self,
        method: &str,
        body: &Value,
        now: DateTime<Utc>,
    ) -> Result<EnrollOutcome, EnrollFailure> {
        let mut state = EnrollState::NotCharged;
        let fail = |error: EnrollError, state: EnrollState| EnrollFailure { error, state };

        tracing::info!("received membership request");
        let request = validate_request(method, body).map_err(|e| fail(e, state))?;
        tracing::info!("request is valid ({})", request.membership);

        let row = build_row(&request, now).map_err(|e| fail(e, state))?;

        // Every column must exist before the order is captured.
        let header = self
            .roster
            .header()
            .map_err(|e| fail(EnrollError::Roster(e), state))?;
        if let Some((missing, _)) = row.iter().find(|(key, _)| !header.contains(key)) {
            return Err(fail(EnrollError::MissingColumn(missing.clone()), state));
        }

        self.check_amount(&request).map_err(|e| fail(e, state))?;

        state = EnrollState::Capturing;
        self.payments
            .capture(&request.order_id)
            .map_err(|e| fail(EnrollError::Capture(e), state))?;
        state = EnrollState::Captured;
        tracing::info!("payment captured for order {}", request.order_id);

        self.roster
            .append_row(&row)
            .map_err(|e| fail(EnrollError::Roster(e), state))?;
        tracing::info!("account added to database");

        Ok(EnrollOutcome {
            redirect_url: self.success_url.to_string(),
            row,
        })
    }

    fn check_amount(&self, request: &EnrollRequest) -> Result<(), EnrollError> {
        let value = self
            .payments
            .order_amount(&request.order_id)
            .map_err(EnrollError::OrderLookup)?;

        let expected = request.membership.amount();
        let received = leading_integer(&value);
        if received != Some(i64::from(expected)) {
            tracing::warn!(
                "received payment ({value}) doesn't match expected payment ({expected})"
            );
            return Err(EnrollError::PaymentMismatch { expected, received });
        }
        Ok(())
    }
}

/// Form fields plus the bookkeeping columns. `creation_time` is a sheets
/// day serial; `expiry` is epoch seconds, which the synchronizer reads.
fn build_row(
    request: &EnrollRequest,
    now: DateTime<Utc>,
) -> Result<Vec<(String, String)>, EnrollError> {
    let expiry = add_months(now, request.membership.months()).ok_or(EnrollError::Expiry)?;

    let mut row: Vec<(String, String)> = request
        .fields
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "creation_time" | "in_google_group" | "expiry"))
        .cloned()
        .collect();
    row.push((
        "creation_time".into(),
        to_sheets_serial(to_seconds(now)).to_string(),
    ));
    row.push(("in_google_group".into(), "FALSE".into()));
    row.push(("expiry".into(), to_seconds(expiry).to_string()));
    Ok(row)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::memory::{MemoryPayments, MemoryRosterWriter};

    const SUCCESS: &str = "https://utoc.ca/membership-success";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap()
    }

    fn body(kind: &str) -> Value {
        json!({
            "orderID": "ORDER-1",
            "membership_type": kind,
            "email": "new@x.com",
            "first_name": "Nia",
        })
    }

    fn writer() -> MemoryRosterWriter {
        MemoryRosterWriter::new(&[
            "orderID",
            "membership_type",
            "email",
            "first_name",
            "creation_time",
            "in_google_group",
            "expiry",
        ])
    }

    #[rstest]
    #[case("GET", body("student"), "Invalid request. Not using POST method")]
    #[case("POST", json!({ "membership_type": "student" }), "No orderID contained in request.")]
    #[case("POST", json!({ "orderID": 7, "membership_type": "student" }), "No orderID contained in request.")]
    #[case("POST", json!({ "orderID": "o" }), "No valid membership_type contained in request.")]
    #[case("POST", json!({ "orderID": "o", "membership_type": "lifetime" }), "No valid membership_type contained in request.")]
    fn invalid_requests_are_400(
        #[case] method: &str,
        #[case] body: Value,
        #[case] message: &str,
    ) {
        let err = validate_request(method, &body).unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.to_string(), message);
    }

    #[rstest]
    #[case("20.00", Some(20))]
    #[case("20", Some(20))]
    #[case(" 30.99", Some(30))]
    #[case("-5", Some(-5))]
    #[case("abc", None)]
    #[case("", None)]
    fn leading_integers(#[case] input: &str, #[case] expected: Option<i64>) {
        assert_eq!(leading_integer(input), expected);
    }

    #[test]
    fn successful_enrollment_writes_row_and_redirects() {
        let payments = MemoryPayments::default().with_order("ORDER-1", "20.00");
        let roster = writer();

        let outcome = Enrollment::new(&payments, &roster, SUCCESS)
            .process("POST", &body("student"), now())
            .expect("enroll");

        assert_eq!(outcome.redirect_url, SUCCESS);
        assert_eq!(payments.captured(), vec!["ORDER-1".to_string()]);

        let rows = roster.rows();
        assert_eq!(rows.len(), 1);
        let get = |key: &str| {
            rows[0]
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("email"), "new@x.com");
        assert_eq!(get("in_google_group"), "FALSE");
        let expected_expiry = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(get("expiry"), to_seconds(expected_expiry).to_string());
    }

    #[test]
    fn amount_mismatch_is_400_and_not_charged() {
        let payments = MemoryPayments::default().with_order("ORDER-1", "10.00");
        let roster = writer();

        let failure = Enrollment::new(&payments, &roster, SUCCESS)
            .process("POST", &body("family"), now())
            .unwrap_err();

        assert_eq!(failure.status(), 400);
        assert_eq!(failure.state, EnrollState::NotCharged);
        assert!(payments.captured().is_empty());
        assert!(roster.rows().is_empty());
    }

    #[test]
    fn unknown_order_is_500() {
        let payments = MemoryPayments::default();
        let roster = writer();

        let failure = Enrollment::new(&payments, &roster, SUCCESS)
            .process("POST", &body("student"), now())
            .unwrap_err();

        assert_eq!(failure.status(), 500);
        assert_eq!(
            failure.error.to_string(),
            "Failed to retrieve your PayPal Order given the provided ID."
        );
    }

    #[test]
    fn capture_failure_reports_capturing_state() {
        let payments = MemoryPayments::default()
            .with_order("ORDER-1", "20.00")
            .failing_capture();
        let roster = writer();

        let failure = Enrollment::new(&payments, &roster, SUCCESS)
            .process("POST", &body("student"), now())
            .unwrap_err();

        assert_eq!(failure.status(), 500);
        assert_eq!(failure.state, EnrollState::Capturing);
        assert!(failure
            .user_message()
            .starts_with("Oops!<br/>You have not been added to our database."));
    }

    #[test]
    fn missing_column_is_caught_before_charging() {
        let payments = MemoryPayments::default().with_order("ORDER-1", "20.00");
        let roster = MemoryRosterWriter::new(&["email", "expiry"]);

        let failure = Enrollment::new(&payments, &roster, SUCCESS)
            .process("POST", &body("student"), now())
            .unwrap_err();

        assert_eq!(
            failure.error.to_string(),
            "Missing parameter 'first_name' in Google Sheet database header."
        );
        assert_eq!(failure.state, EnrollState::NotCharged);
        assert!(payments.captured().is_empty());
    }

    #[test]
    fn write_failure_reports_charged_state() {
        let payments = MemoryPayments::default().with_order("ORDER-1", "20.00");
        let roster = writer().failing_append();

        let failure = Enrollment::new(&payments, &roster, SUCCESS)
            .process("POST", &body("student"), now())
            .unwrap_err();

        assert_eq!(failure.state, EnrollState::Captured);
        assert_eq!(payments.captured().len(), 1);
        assert!(failure
            .user_message()
            .contains("Your payment has been processed but you have not been added"));
    }
}
