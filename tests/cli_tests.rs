use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

mod support;

use support::TempDb;

fn marketsync() -> Command {
    let mut cmd = Command::cargo_bin("marketsync").expect("binary built");
    cmd.env_remove("DATABASE_URL").env("RUST_LOG", "error");
    cmd
}

#[test]
fn help_lists_subcommands() {
    marketsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("assets"))
        .stdout(predicate::str::contains("history"))
        .stdout(predicate::str::contains("migrate"));
}

#[test]
fn migrate_creates_database_from_env_override() {
    let db = TempDb::new();

    marketsync()
        .current_dir(db.dir())
        .env("DATABASE_URL", db.url())
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));

    assert!(db.path().exists());
}

#[test]
fn migrate_reads_database_from_config_file() {
    let db = TempDb::new();
    let config = db.dir().join("config.toml");
    fs::write(&config, format!("database = {:?}\n", db.url())).unwrap();

    marketsync()
        .arg("--config")
        .arg(&config)
        .arg("migrate")
        .assert()
        .success();

    assert!(db.path().exists());
}

#[test]
fn assets_json_on_empty_database() {
    let db = TempDb::new();

    let output = marketsync()
        .env("DATABASE_URL", db.url())
        .args(["assets", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["command"], "assets");
    assert_eq!(value["assets"], serde_json::json!([]));
}

#[test]
fn history_for_unknown_asset_fails() {
    let db = TempDb::new();

    marketsync()
        .env("DATABASE_URL", db.url())
        .args(["history", "dogecoin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dogecoin"));
}

#[test]
fn invalid_config_exits_nonzero() {
    let db = TempDb::new();
    let config = db.dir().join("config.toml");
    fs::write(&config, "[sync]\ntop_n = 0\n").unwrap();

    marketsync()
        .arg("--config")
        .arg(&config)
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("top_n"));
}
