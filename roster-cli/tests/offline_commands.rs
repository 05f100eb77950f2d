use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn roster_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("roster"));
    cmd.env_remove("ENVIRONMENT").env("NO_COLOR", "1");
    cmd
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path.display().to_string()
}

const ROSTER: &str = r#"
- email: Alice.Smith@gmail.com
  expiry: 2000
  firstName: Alice
  lastName: Smith
- email: bob@utoc.ca
  expiry: 500
  first_name: Bob Jr
- email: carol@utoc.ca
  expiry: 2000
  first_name: Carol Ann
"#;

const GROUP: &str = r#"
- id: "g-1"
  email: alicesmith@gmail.com
- id: "g-2"
  email: bob@utoc.ca
- id: "g-3"
  email: stranger@utoc.ca
"#;

fn fixtures() -> (TempDir, String, String) {
    let dir = TempDir::new().expect("tempdir");
    let roster = write(dir.path(), "roster.yaml", ROSTER);
    let group = write(dir.path(), "group.yaml", GROUP);
    (dir, roster, group)
}

#[test]
fn canonicalize_prints_keys() {
    roster_cmd()
        .args([
            "canonicalize",
            "Smith.Jo.Hn@gmail.com",
            "smith.john@outlook.com",
        ])
        .assert()
        .success()
        .stdout("smithjohn@gmail.com\nsmith.john@outlook.com\n");
}

#[test]
fn canonicalize_requires_an_address() {
    roster_cmd().arg("canonicalize").assert().failure();
}

#[test]
fn plan_table_lists_every_decision() {
    let (_dir, roster, group) = fixtures();
    roster_cmd()
        .args(["plan", "--roster", &roster, "--group", &group, "--now", "1000"])
        .assert()
        .success()
        .stdout(contains("1 to add"))
        .stdout(contains("2 to remove"))
        .stdout(contains("carol@utoc.ca"))
        .stdout(contains("stranger@utoc.ca"))
        .stdout(contains("do-nothing"));
}

#[test]
fn plan_json_is_machine_readable() {
    let (_dir, roster, group) = fixtures();
    let assert = roster_cmd()
        .args([
            "plan", "--roster", &roster, "--group", &group, "--now", "1000", "--json",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");

    assert_eq!(json["mode"], "full");
    assert_eq!(json["counts"]["add"], 1);
    assert_eq!(json["counts"]["remove"], 2);

    let decisions = json["decisions"].as_array().expect("decisions");
    let carol = decisions
        .iter()
        .find(|d| d["email"] == "carol@utoc.ca")
        .expect("carol");
    assert_eq!(carol["action"], "add");
    assert_eq!(carol["name"], "Carol");
    let bob = decisions
        .iter()
        .find(|d| d["email"] == "bob@utoc.ca")
        .expect("bob");
    assert_eq!(bob["action"], "remove");
    assert_eq!(bob["member_id"], "g-2");
}

#[test]
fn plan_expired_only_never_adds() {
    let (_dir, roster, group) = fixtures();
    roster_cmd()
        .args([
            "plan",
            "--roster",
            &roster,
            "--group",
            &group,
            "--now",
            "1000",
            "--mode",
            "expired-only",
        ])
        .assert()
        .success()
        .stdout(contains("0 to add"))
        .stdout(contains("not-expired"))
        .stdout(contains("carol@utoc.ca").not());
}

#[test]
fn plan_rejects_unknown_mode() {
    let (_dir, roster, group) = fixtures();
    roster_cmd()
        .args(["plan", "--roster", &roster, "--group", &group, "--mode", "partial"])
        .assert()
        .failure()
        .stderr(contains("unknown mode 'partial'"));
}

#[test]
fn plan_reports_unreadable_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    let group = write(dir.path(), "group.yaml", GROUP);
    let missing = dir.path().join("nope.yaml").display().to_string();
    roster_cmd()
        .args(["plan", "--roster", &missing, "--group", &group])
        .assert()
        .failure()
        .stderr(contains("failed to read"));
}

#[test]
fn sync_rejects_unknown_environment_before_any_call() {
    roster_cmd()
        .args(["sync", "--env", "staging"])
        .assert()
        .failure()
        .stderr(contains("unknown environment 'staging'"));
}

#[test]
fn sync_reports_missing_config_key() {
    let dir = TempDir::new().expect("tempdir");
    let config = write(dir.path(), "config.yaml", "googleGroupEmail: members@utoc.ca\n");
    roster_cmd()
        .args(["sync", "--env", "test", "--config", &config, "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("missing required config key 'adminEmail'"));
}

#[test]
fn enroll_requires_json_body() {
    let dir = TempDir::new().expect("tempdir");
    let body = write(dir.path(), "body.json", "orderID=1");
    roster_cmd()
        .args(["enroll", "--body", &body, "--env", "test"])
        .assert()
        .failure()
        .stderr(contains("is not JSON"));
}
