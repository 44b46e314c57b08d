// CLI smoke tests: spawn the compiled binary against temp fixtures.
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use clap::Parser;
use cursorctx::cli::{Cli, Commands};
use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;

mod util;

const SCALE: &str = "\
const a = 1;

function scale(x) {
  const y = x * a;
  log(y);
  return y;
}

const b = 2;
";

fn cctx() -> Command {
    let mut cmd = Command::cargo_bin("cctx").expect("bin");
    cmd.env_remove("CCTX_LOG");
    cmd
}

#[test]
fn sections_flags_parse() {
    // Given
    let argv = [
        "cctx", "sections", "app.js", "--line", "4", "--column", "3", "--budget", "1000",
        "--window", "2", "--debug",
    ];

    // When
    let cli = Cli::parse_from(argv);

    // Then
    match cli.command {
        Commands::Sections(args) => {
            assert_eq!(args.query.line, 4);
            assert_eq!(args.query.column, 3);
            assert_eq!(args.query.budget, Some(1000));
            assert_eq!(args.query.window, Some(2));
            assert!(args.debug);
        }
        _ => panic!("expected Sections command"),
    }
}

#[test]
fn around_json_reports_enclosing_block() {
    let tmp = util::fixture("app.js", SCALE);

    let out = cctx()
        .current_dir(tmp.path())
        .args(["around", "app.js", "--line", "5", "--json"])
        .output()
        .expect("run");
    assert!(out.status.success());

    let v: Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(v["strategy"], "enclosing-block-with-context");
    assert!(v["text"].as_str().unwrap_or("").contains("function scale(x) {"));
    assert!(v["start_line"].as_u64().unwrap_or(99) <= 3);
}

#[test]
fn sections_json_has_every_tier() {
    let tmp = util::fixture("script.js", util::POSTMAN);

    let out = cctx()
        .current_dir(tmp.path())
        .args(["sections", "script.js", "-l", "9", "--window", "0", "--json", "--debug"])
        .output()
        .expect("run");
    assert!(out.status.success());

    let v: Value = serde_json::from_slice(&out.stdout).expect("json");
    for key in ["lines_around_cursor", "declarations", "relevant_lines", "existing_tests"] {
        assert!(v[key].is_string(), "missing {key}");
    }
    assert_eq!(v["meta"]["budgets"]["total"], 8000);
    assert!(v["debug"]["tiers"].is_array());
}

#[test]
fn config_file_sets_defaults() {
    let tmp = util::fixture("script.js", util::POSTMAN);
    tmp.child("cctx.toml")
        .write_str("[extract]\nmax_chars_budget = 1000\n")
        .expect("write config");

    let out = cctx()
        .current_dir(tmp.path())
        .args(["sections", "script.js", "-l", "9", "--json"])
        .output()
        .expect("run");
    assert!(out.status.success());

    let v: Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(v["meta"]["budgets"]["a"], 400);
    assert_eq!(v["meta"]["budgets"]["d"], 100);
}

#[test]
fn human_output_without_color() {
    let tmp = util::fixture("script.js", util::POSTMAN);

    cctx()
        .current_dir(tmp.path())
        .args(["--no-color", "decls", "script.js", "-l", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("== declarations"))
        .stdout(predicate::str::contains("function buildUrl(path) {"))
        .stdout(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn status_reports_a_parsed_tree() {
    let tmp = util::fixture("app.js", SCALE);

    let out = cctx()
        .current_dir(tmp.path())
        .args(["status", "app.js", "--json"])
        .output()
        .expect("run");
    assert!(out.status.success());

    let v: Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(v["has_tree"], true);
    assert_eq!(v["is_dirty"], false);
    assert_eq!(v["pending_edits_count"], 0);
}

#[test]
fn missing_file_fails_with_context() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    cctx()
        .current_dir(tmp.path())
        .args(["around", "nope.js", "--line", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read nope.js"));
}

#[test]
fn init_writes_config_once() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    cctx()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));
    tmp.child("cctx.toml")
        .assert(predicate::str::contains("[extract]"));

    // Second run refuses to clobber without --force
    cctx()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    cctx()
        .current_dir(tmp.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn completions_print_to_stdout() {
    cctx()
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cctx"));
}

#[test]
fn completions_need_exactly_one_target() {
    let none = Cli::try_parse_from(["cctx", "completions", "bash"]);
    assert!(none.is_err());

    let both = Cli::try_parse_from(["cctx", "completions", "bash", "--stdout", "--out-dir", "out"]);
    assert!(both.is_err());

    let cli = Cli::parse_from(["cctx", "completions", "zsh", "--out-dir", "out"]);
    match cli.command {
        Commands::Completions(args) => {
            assert_eq!(args.out_dir, Some(std::path::PathBuf::from("out")));
            assert!(!args.stdout);
        }
        _ => panic!("expected Completions command"),
    }
}

#[test]
fn completions_write_into_out_dir() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    cctx()
        .current_dir(tmp.path())
        .args(["--quiet", "completions", "bash", "--out-dir", "comp"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    tmp.child("comp/cctx.bash")
        .assert(predicate::str::contains("cctx"));
}
