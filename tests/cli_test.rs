//! CLI-surface behavior (spec §6): exit codes for missing/invalid
//! arguments. Mirrors `xbcsmith-xzatoma`'s use of `assert_cmd` for
//! binary-level exit-code assertions.

use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn missing_url_argument_exits_1() {
    Command::cargo_bin("mcpgate")
        .unwrap()
        .assert()
        .failure()
        .code(1);
}

#[test]
fn help_flag_exits_0() {
    Command::cargo_bin("mcpgate")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("mcpgate"));
}

#[test]
fn version_flag_exits_0() {
    Command::cargo_bin("mcpgate")
        .unwrap()
        .arg("--version")
        .assert()
        .success();
}
