use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

#[test]
fn cli_version_flag() {
    Command::cargo_bin("aws-sso-auditor")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_help_shows_usage() {
    Command::cargo_bin("aws-sso-auditor")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("ACCOUNT_ID").and(contains("--output-format")))
        .stdout(contains("--no-timestamp"));
}
