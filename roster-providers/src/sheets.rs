//! Spreadsheet roster adapter (Sheets API v4).
//!
//! The first row of the sheet is the header; every other row is a member.

use serde::Deserialize;
use serde_json::{json, Value};

use roster_core::MemberRecord;
use roster_sync::{ProviderError, RosterSource, RosterWriter};

use crate::google_auth::TokenSource;
use crate::http::{agent, bearer, classify, read_json};

pub const SHEETS_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct SheetsRoster<T> {
    auth: T,
    spreadsheet_id: String,
    sheet_name: String,
    base_url: String,
    agent: ureq::Agent,
}

impl<T: TokenSource> SheetsRoster<T> {
    pub fn new(auth: T, spreadsheet_id: &str, sheet_name: &str) -> Self {
        Self::with_base_url(auth, spreadsheet_id, sheet_name, SHEETS_URL)
    }

    pub fn with_base_url(auth: T, spreadsheet_id: &str, sheet_name: &str, base_url: &str) -> Self {
        Self {
            auth,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: agent(),
        }
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(range)
        )
    }

    fn get_range(&self, range: &str) -> Result<Vec<Vec<Value>>, ProviderError> {
        let token = self.auth.access_token()?;
        let response = self
            .agent
            .get(&self.values_url(range))
            .set("Authorization", &bearer(&token))
            .query("valueRenderOption", "UNFORMATTED_VALUE")
            .call()
            .map_err(classify)?;
        Ok(read_json::<ValueRange>(response)?.values)
    }
}

impl<T: TokenSource> RosterSource for SheetsRoster<T> {
    fn read_records(&self) -> Result<Vec<MemberRecord>, ProviderError> {
        let values = self.get_range(&self.sheet_name)?;
        let records = parse_rows(&values)?;
        tracing::debug!("read {} roster row(s) from {}", records.len(), self.sheet_name);
        Ok(records)
    }
}

impl<T: TokenSource> RosterWriter for SheetsRoster<T> {
    fn header(&self) -> Result<Vec<String>, ProviderError> {
        let values = self.get_range(&format!("{}!1:1", self.sheet_name))?;
        Ok(values
            .into_iter()
            .next()
            .unwrap_or_default()
            .iter()
            .map(cell_text)
            .collect())
    }

    fn append_row(&self, row: &[(String, String)]) -> Result<(), ProviderError> {
        let header = self.header()?;
        let token = self.auth.access_token()?;
        self.agent
            .post(&format!("{}:append", self.values_url(&self.sheet_name)))
            .set("Authorization", &bearer(&token))
            .query("valueInputOption", "USER_ENTERED")
            .query("insertDataOption", "INSERT_ROWS")
            .send_json(json!({ "values": [order_row(&header, row)] }))
            .map_err(classify)?;
        Ok(())
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell_number(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Turn a header row plus data rows into roster records.
///
/// Header names match case-insensitively. A sheet without a header row or
/// without an `email` or `expiry` column is a [`ProviderError::Decode`].
/// Rows with a blank email
/// are skipped. A row whose expiry cannot be read is kept with expiry 0, so
/// it counts as expired.
pub fn parse_rows(values: &[Vec<Value>]) -> Result<Vec<MemberRecord>, ProviderError> {
    let Some((header, rows)) = values.split_first() else {
        return Err(ProviderError::Decode("roster sheet has no header row".into()));
    };
    let header: Vec<String> = header.iter().map(cell_text).collect();
    let email_col = required_column(&header, "email")?;
    let expiry_col = required_column(&header, "expiry")?;
    let first_col = position(&header, &["first_name", "firstName"]);
    let last_col = position(&header, &["last_name", "lastName"]);

    let records: Vec<MemberRecord> = rows
        .iter()
        .filter_map(|row| {
            let email = cell_text(&cell_at(row, Some(email_col)));
            if email.is_empty() {
                return None;
            }
            let expiry = cell_number(&cell_at(row, Some(expiry_col))).unwrap_or_else(|| {
                tracing::warn!("unreadable expiry for {email}; treating as expired");
                0.0
            });
            Some(MemberRecord {
                email,
                expiry,
                first_name: cell_text(&cell_at(row, first_col)),
                last_name: cell_text(&cell_at(row, last_col)),
            })
        })
        .collect();
    Ok(records)
}

fn required_column(header: &[String], name: &str) -> Result<usize, ProviderError> {
    position(header, &[name]).ok_or_else(|| {
        ProviderError::Decode(format!(
            "roster header has no '{name}' column (found: {})",
            header.join(", ")
        ))
    })
}

fn cell_at(row: &[Value], col: Option<usize>) -> Value {
    col.and_then(|c| row.get(c)).cloned().unwrap_or(Value::Null)
}

fn position(header: &[String], names: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|h| names.iter().any(|name| h.trim().eq_ignore_ascii_case(name)))
}

/// Lay out `row` in header order. Columns the row lacks are left blank.
pub fn order_row(header: &[String], row: &[(String, String)]) -> Vec<String> {
    header
        .iter()
        .map(|column| {
            row.iter()
                .find(|(key, _)| key == column)
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google_auth::StaticToken;
    use crate::http::testing::serve;

    #[test]
    fn parses_rows_with_either_name_spelling() {
        let values = vec![
            vec![json!("email"), json!("firstName"), json!("lastName"), json!("expiry")],
            vec![json!("a@x.com"), json!("Ann"), json!("Lee"), json!(1_700_000_000.5)],
            vec![json!(""), json!("Blank"), json!(""), json!(1)],
            vec![json!("b@x.com"), json!("Bo"), json!(""), json!("1700000000")],
            vec![json!("c@x.com")],
        ];

        let records = parse_rows(&values).expect("parse");

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].first_name, "Ann");
        assert_eq!(records[0].last_name, "Lee");
        assert_eq!(records[0].expiry, 1_700_000_000.5);
        assert_eq!(records[1].expiry, 1_700_000_000.0);
        assert_eq!(records[2].expiry, 0.0);
        assert_eq!(records[2].first_name, "");
    }

    #[test]
    fn snake_case_header() {
        let values = vec![
            vec![json!("first_name"), json!("last_name"), json!("email"), json!("expiry")],
            vec![json!("Cy"), json!("Young"), json!("cy@x.com"), json!(5)],
        ];
        let records = parse_rows(&values).expect("parse");
        assert_eq!(records[0].email, "cy@x.com");
        assert_eq!(records[0].last_name, "Young");
    }

    #[test]
    fn header_names_ignore_case_and_padding() {
        let values = vec![
            vec![json!("Email"), json!(" EXPIRY "), json!("First_Name")],
            vec![json!("ann@x.com"), json!(9_999_999_999u64), json!("Ann")],
        ];
        let records = parse_rows(&values).expect("parse");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email, "ann@x.com");
        assert_eq!(records[0].expiry, 9_999_999_999.0);
        assert_eq!(records[0].first_name, "Ann");
    }

    #[test]
    fn header_only_sheet_is_an_empty_roster() {
        let records = parse_rows(&[vec![json!("email"), json!("expiry")]]).expect("parse");
        assert!(records.is_empty());
    }

    #[test]
    fn unusable_header_is_an_error() {
        let no_header = parse_rows(&[]).unwrap_err();
        assert!(matches!(no_header, ProviderError::Decode(_)));

        let no_email = parse_rows(&[vec![json!("name"), json!("expiry")], vec![json!("x")]])
            .unwrap_err();
        assert!(matches!(&no_email, ProviderError::Decode(m) if m.contains("'email'")));

        let no_expiry = parse_rows(&[vec![json!("email")], vec![json!("a@x.com")]]).unwrap_err();
        assert!(matches!(&no_expiry, ProviderError::Decode(m) if m.contains("'expiry'")));
    }

    #[test]
    fn row_follows_header_order() {
        let header: Vec<String> = ["email", "notes", "expiry"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row = vec![
            ("expiry".to_string(), "99".to_string()),
            ("email".to_string(), "a@x.com".to_string()),
        ];
        assert_eq!(order_row(&header, &row), vec!["a@x.com", "", "99"]);
    }

    #[test]
    fn reads_unformatted_values() {
        let (base, rx) = serve(vec![(
            200,
            r#"{"range":"Members!A1:C3","majorDimension":"ROWS","values":[["email","expiry"],["a@x.com",123]]}"#,
        )]);
        let roster =
            SheetsRoster::with_base_url(StaticToken("t".into()), "sheet-1", "Members", &base);

        let records = roster.read_records().expect("read");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].expiry, 123.0);
        let request = rx.recv().unwrap();
        assert!(request.request_line.starts_with(
            "GET /v4/spreadsheets/sheet-1/values/Members?valueRenderOption=UNFORMATTED_VALUE"
        ));
    }

    #[test]
    fn sheet_name_is_encoded_in_the_path() {
        let (base, rx) = serve(vec![(200, r#"{"values":[["email","expiry"]]}"#)]);
        let roster =
            SheetsRoster::with_base_url(StaticToken("t".into()), "sheet-1", "Members #2?", &base);

        roster.read_records().expect("read");

        let request = rx.recv().unwrap();
        assert!(request.request_line.starts_with(
            "GET /v4/spreadsheets/sheet-1/values/Members%20%232%3F?valueRenderOption="
        ));
    }

    #[test]
    fn unrecognised_header_fails_the_read() {
        let (base, _rx) = serve(vec![(
            200,
            r#"{"values":[["mail","expiry"],["ann@x.com",9999999999]]}"#,
        )]);
        let roster =
            SheetsRoster::with_base_url(StaticToken("t".into()), "sheet-1", "Members", &base);

        let err = roster.read_records().unwrap_err();

        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn sync_aborts_when_roster_header_is_unrecognised() {
        use roster_core::{Environment, GroupKey, GroupMember, ServiceAccount, SyncConfig};
        use roster_sync::memory::{MemoryGroup, MemoryNotifier};
        use roster_sync::pipeline::{self, Collaborators, RunOptions};
        use roster_sync::{Mode, SyncError};

        let (base, _rx) = serve(vec![(
            200,
            r#"{"values":[["E-mail","expiry"],["ann@x.com",9999999999],["bob@x.com",9999999999]]}"#,
        )]);
        let roster =
            SheetsRoster::with_base_url(StaticToken("t".into()), "sheet-1", "Members", &base);
        let group = MemoryGroup::new(vec![
            GroupMember::new("g-1", "ann@x.com"),
            GroupMember::new("g-2", "bob@x.com"),
        ]);
        let notifier = MemoryNotifier::default();
        let account = ServiceAccount::new("svc@x.iam".into(), "key".into());
        let config = SyncConfig {
            environment: Environment::Test,
            group_key: GroupKey::from("members@x.com"),
            admin_email: "admin@x.com".into(),
            spreadsheet_id: "sheet-1".into(),
            sheet_name: "Members".into(),
            sheets_account: account.clone(),
            directory_account: account,
            send_grid_api_key: "SG.key".into(),
            no_reply_email: "no-reply@x.com".into(),
            remove_template_id: "d-remove".into(),
            add_template_id: None,
            summary_recipient: None,
        };
        let collaborators = Collaborators {
            roster: &roster,
            group: &group,
            notifier: &notifier,
        };
        let options = RunOptions {
            mode: Mode::Full,
            dry_run: false,
            now: 1_000.0,
        };

        let err = pipeline::run(&config, &collaborators, &options).unwrap_err();

        assert!(matches!(err, SyncError::RosterRead(ProviderError::Decode(_))));
        assert_eq!(group.members().len(), 2);
        assert!(notifier.sent().is_empty());
    }
}
