use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tandem(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tandem").expect("tandem binary");
    cmd.env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .env_remove("TANDEM_SHEET_TOKEN");
    cmd
}

fn init(home: &TempDir) {
    tandem(home)
        .args(["init", "--spreadsheet-id", "sheet-1", "--database"])
        .arg(home.path().join("roster.db"))
        .assert()
        .success();
}

#[test]
fn init_writes_config_and_roster_table() {
    let home = TempDir::new().unwrap();
    tandem(&home)
        .args(["init", "--spreadsheet-id", "sheet-1", "--database"])
        .arg(home.path().join("roster.db"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    assert!(home.path().join(".tandem").join("config.yaml").exists());
    assert!(home.path().join("roster.db").exists());
}

#[test]
fn init_refuses_to_clobber_without_force() {
    let home = TempDir::new().unwrap();
    init(&home);

    tandem(&home)
        .args(["init", "--spreadsheet-id", "other-sheet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    tandem(&home)
        .args(["init", "--spreadsheet-id", "other-sheet", "--force", "--database"])
        .arg(home.path().join("roster.db"))
        .assert()
        .success();
}

#[test]
fn status_before_first_cycle_reports_never() {
    let home = TempDir::new().unwrap();
    init(&home);

    tandem(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("never"))
        .stdout(predicate::str::contains("sheet-1"));
}

#[test]
fn status_json_is_machine_readable() {
    let home = TempDir::new().unwrap();
    init(&home);

    let output = tandem(&home)
        .args(["status", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).expect("status JSON");
    assert_eq!(report["spreadsheet_id"], "sheet-1");
    assert_eq!(report["database_table"], "employees");
    assert_eq!(report["last_cycle_at"], serde_json::Value::Null);
    assert_eq!(report["last_cycle_age"], "never");
    assert_eq!(report["watermark_gating"], true);
}

#[test]
fn commands_fail_with_guidance_when_config_is_missing() {
    let home = TempDir::new().unwrap();

    tandem(&home)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config not found"));

    tandem(&home)
        .arg("cycle")
        .assert()
        .failure()
        .stderr(predicate::str::contains("tandem init"));
}

#[test]
fn cycle_without_credentials_aborts_before_touching_the_watermark() {
    let home = TempDir::new().unwrap();
    init(&home);

    tandem(&home)
        .arg("cycle")
        .assert()
        .failure()
        .stderr(predicate::str::contains("token"));

    assert!(
        !home.path().join(".tandem").join("watermark.json").exists(),
        "a failed startup must not create a watermark"
    );
}
