// End-to-end tests for the `prlink` binary.
// Run with: cargo test -p prlink-cli --test cli_tests

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn prlink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_prlink"));
    cmd.env_remove("PRLINK_LOG");
    cmd
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

const PULL_REQUESTS: &str = "\
ID,TITLE,AGENTNAME,BODYSTRING,REPOID
PR-1,Fix buffer overflow,Codex,,R1
PR-2,Add docs,Devin,Improve README,R2
";

const REPOSITORIES: &str = "\
REPOID,LANG,STARS,URL
r1,Rust,10,https://example.com/r1
";

const CLASSIFICATIONS: &str = "\
PRID,PRTITLE,PRTYPE,CONFIDENCE
1,Fix buffer overflow,fix,0.9
";

const COMMITS: &str = "\
PRID,SHA,COMMITMESSAGE
2,abc123,Update docs
";

const CONFIG: &str = r#"
name = "cli fixture"

[inputs]
pull_requests = "prs.csv"
repositories = "repos.csv"
classifications = "cls.csv"
commits = "commits.csv"

[output]
file = "final.csv"
"#;

/// Temp dir with the four tables and a config pointing at them.
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let write = |name: &str, data: &str| std::fs::write(dir.path().join(name), data).unwrap();
    write("prs.csv", PULL_REQUESTS);
    write("repos.csv", REPOSITORIES);
    write("cls.csv", CLASSIFICATIONS);
    write("commits.csv", COMMITS);
    write("link.prlink.toml", CONFIG);
    dir
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_writes_final_table() {
    let dir = workspace();
    let out = prlink()
        .arg("run")
        .arg(dir.path().join("link.prlink.toml"))
        .output()
        .unwrap();

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("wrote"));
    assert_eq!(
        read(&dir.path().join("final.csv")),
        "ID,AGENT,TYPE,CONFIDENCE,SECURITY\nPR-1,Codex,fix,0.9,1\nPR-2,Devin,,,0\n"
    );
    // Logs go to stdout by default
    assert!(stdout(&out).contains("starting linkage run"));
}

#[test]
fn run_json_keeps_stdout_parseable() {
    let dir = workspace();
    let out = prlink()
        .arg("run")
        .arg(dir.path().join("link.prlink.toml"))
        .arg("--json")
        .output()
        .unwrap();

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let report: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(report["meta"]["config_name"], "cli fixture");
    assert_eq!(report["summary"]["primary_rows"], 2);
    assert_eq!(report["summary"]["id_matched"], 1);
    assert_eq!(report["records"][0]["type"], "fix");
    assert_eq!(report["records"][0]["security"], true);
    assert_eq!(report["summary"]["stages"].as_array().unwrap().len(), 8);
    assert!(stderr(&out).contains("starting linkage run"));
}

#[test]
fn run_writes_merged_table_when_asked() {
    let dir = workspace();
    let merged = dir.path().join("merged.csv");
    let out = prlink()
        .arg("run")
        .arg(dir.path().join("link.prlink.toml"))
        .arg("--merged")
        .arg(&merged)
        .output()
        .unwrap();

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let header = read(&merged).lines().next().unwrap().to_string();
    assert!(header.starts_with("ID,TITLE,AGENTNAME"));
    assert!(header.contains("LANG"));
    assert!(header.ends_with("SECURITY"));
}

#[test]
fn run_overrides_paths_from_flags() {
    let dir = workspace();
    let out_path = dir.path().join("custom.csv");
    let out = prlink()
        .arg("run")
        .arg(dir.path().join("link.prlink.toml"))
        .arg("--classifications")
        .arg(dir.path().join("does-not-exist.csv"))
        .arg("--output")
        .arg(&out_path)
        .output()
        .unwrap();

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    // Without classifications nothing gets a type
    assert!(read(&out_path).contains("PR-1,Codex,,,1"));
}

#[test]
fn run_without_config_uses_default_file_names() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("output1.csv"), PULL_REQUESTS).unwrap();
    std::fs::write(dir.path().join("output3.csv"), CLASSIFICATIONS).unwrap();

    let out = prlink().current_dir(dir.path()).arg("run").output().unwrap();

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let final_csv = read(&dir.path().join("final_output.csv"));
    assert!(final_csv.starts_with("ID,AGENT,TYPE,CONFIDENCE,SECURITY\n"));
    assert_eq!(final_csv.lines().count(), 3);
}

#[test]
fn missing_secondary_table_is_a_warning() {
    let dir = workspace();
    std::fs::remove_file(dir.path().join("commits.csv")).unwrap();
    let out = prlink()
        .arg("run")
        .arg(dir.path().join("link.prlink.toml"))
        .output()
        .unwrap();

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("continuing without it"));
    assert!(stderr(&out).contains("warning(s)"));
}

#[test]
fn log_filter_from_env() {
    let dir = workspace();
    let out = prlink()
        .env("PRLINK_LOG", "warn")
        .arg("run")
        .arg(dir.path().join("link.prlink.toml"))
        .output()
        .unwrap();

    assert!(out.status.success());
    let logs = stdout(&out);
    assert!(!logs.contains("starting linkage run"));
    // Commit table lacks most detail columns
    assert!(logs.contains("WARN"));
}

#[test]
fn missing_primary_table_exits_4() {
    let dir = workspace();
    std::fs::remove_file(dir.path().join("prs.csv")).unwrap();
    let out = prlink()
        .arg("run")
        .arg(dir.path().join("link.prlink.toml"))
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("error:"));
    assert!(stderr(&out).contains("hint:"));
}

#[test]
fn primary_without_id_column_exits_4() {
    let dir = workspace();
    std::fs::write(dir.path().join("prs.csv"), "TITLE,BODY\nFix,none\n").unwrap();
    let out = prlink()
        .arg("run")
        .arg(dir.path().join("link.prlink.toml"))
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("pull_requests"));
    assert!(!dir.path().join("final.csv").exists());
}

#[test]
fn invalid_config_exits_3() {
    let dir = workspace();
    let path = dir.path().join("bad.prlink.toml");
    std::fs::write(&path, "[output.headers]\nid = \"X\"\nagent = \"X\"\n").unwrap();
    let out = prlink().arg("run").arg(&path).output().unwrap();

    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("duplicate column name 'X'"));
}

#[test]
fn unknown_config_key_exits_3() {
    let dir = workspace();
    let path = dir.path().join("typo.prlink.toml");
    std::fs::write(&path, "nmae = \"oops\"\n").unwrap();
    let out = prlink().arg("validate").arg(&path).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn missing_config_file_exits_2() {
    let out = prlink().arg("run").arg("/no/such/config.toml").output().unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn unwritable_output_exits_5() {
    let dir = workspace();
    let out = prlink()
        .arg("run")
        .arg(dir.path().join("link.prlink.toml"))
        .arg("--output")
        .arg(dir.path().join("missing-dir").join("final.csv"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(5));
}

// ---------------------------------------------------------------------------
// validate / resolve / classify
// ---------------------------------------------------------------------------

#[test]
fn validate_prints_summary() {
    let dir = workspace();
    let out = prlink()
        .arg("validate")
        .arg(dir.path().join("link.prlink.toml"))
        .output()
        .unwrap();

    assert!(out.status.success());
    let err = stderr(&out);
    assert!(err.contains("valid: 'cli fixture'"));
    assert!(err.contains("ID,AGENT,TYPE,CONFIDENCE,SECURITY"));
}

#[test]
fn resolve_prints_picked_column() {
    let dir = workspace();
    let out = prlink()
        .arg("resolve")
        .arg(dir.path().join("cls.csv"))
        .arg("--candidates")
        .arg("pr_id,prid,id")
        .output()
        .unwrap();

    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "PRID");
}

#[test]
fn resolve_not_found_exits_1() {
    let dir = workspace();
    let out = prlink()
        .arg("resolve")
        .arg(dir.path().join("repos.csv"))
        .arg("--candidates")
        .arg("sha,commit")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("not found"));
}

#[test]
fn classify_text_argument() {
    let out = prlink().arg("classify").arg("Prevent CSRF on login form").output().unwrap();
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "1");

    let out = prlink().arg("classify").arg("Bump version").output().unwrap();
    assert_eq!(stdout(&out).trim(), "0");
}

#[test]
fn classify_reads_stdin() {
    let mut child = prlink()
        .arg("classify")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Handle deadlock in worker pool\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert_eq!(stdout(&out).trim(), "1");
}

#[test]
fn classify_with_config_keywords() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kw.prlink.toml");
    std::fs::write(&path, "[security]\nkeywords = [\"secret\"]\n").unwrap();

    let out = prlink()
        .arg("classify")
        .arg("Rotate SECRET key")
        .arg("--config")
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(stdout(&out).trim(), "1");

    // Default keywords are replaced, not extended
    let out = prlink()
        .arg("classify")
        .arg("Fix XSS")
        .arg("--config")
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(stdout(&out).trim(), "0");
}
