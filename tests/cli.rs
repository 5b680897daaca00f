use std::fs;
use std::path::Path;

use assert_cmd::Command;
use self_heal::ErrorType;
use solution_store::{ErrorContext, SolutionCandidate, SolutionStore};
use tempfile::TempDir;

const PASSING_RUNNER: &str = r#"["sh", "-c", "cat >/dev/null"]"#;
const FAILING_RUNNER: &str =
    r#"["sh", "-c", "cat >/dev/null; echo \"Element not found: '#buy'\" >&2; exit 1"]"#;

fn workspace(runner: Option<&str>, extra: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("config")).unwrap();
    let mut yaml = String::new();
    if let Some(command) = runner {
        yaml.push_str(&format!("executors:\n  snippet:\n    command: {command}\n"));
    }
    yaml.push_str(extra);
    fs::write(dir.path().join("config/replay.yaml"), yaml).unwrap();
    dir
}

fn soulreplay(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("soulreplay").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir)
        .env("RUST_LOG", "error")
        .env_remove("OPENAI_API_KEY")
        .env_remove("SOUL_REPLAY_LLM_API_KEY")
        .env_remove("SOUL_REPLAY_LLM_MODEL")
        .env_remove("SOUL_REPLAY_LLM_API_BASE")
        .env_remove("SOUL_REPLAY_REASONING_ENDPOINT")
        .env_remove("SOUL_REPLAY_REASONING_API_KEY")
        .env_remove("SOUL_REPLAY_SOLUTIONS_PATH")
        .env_remove("CI");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

fn write_spec(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("checkout.yaml");
    fs::write(
        &path,
        r#"
name: checkout
params: [SKU]
steps:
  - name: add to cart
    snippetCode: "await page.click('#add-{{SKU}}')"
    preferredPath: snippet
  - name: buy
    snippetCode: "await page.click('#buy')"
    preferredPath: snippet
"#,
    )
    .unwrap();
    path
}

#[test]
fn info_reports_unconfigured_services() {
    let dir = workspace(None, "");
    let stdout = stdout_of(soulreplay(dir.path()).arg("info"));
    assert!(stdout.contains("SoulBrowser Replay Information"));
    assert!(stdout.contains("Judgment Service: disabled"));
    assert!(stdout.contains("Snippet Runner: not configured"));
    assert!(stdout.contains("CI Environment: no"));
}

#[test]
fn classify_prints_json_analysis() {
    let dir = workspace(None, "");
    let stdout = stdout_of(soulreplay(dir.path()).args([
        "classify",
        "--error",
        "Element not found: '#buy'",
        "--step",
        "buy",
        "--output",
        "json",
    ]));
    let analysis: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(analysis["step_name"], "buy");
    assert_eq!(analysis["error_type"], "selector");
    assert_eq!(analysis["retry_count"], 0);
    assert!(!analysis["suggested_actions"].as_array().unwrap().is_empty());
}

#[test]
fn run_writes_a_successful_report() {
    let dir = workspace(Some(PASSING_RUNNER), "");
    let spec = write_spec(dir.path());
    let report_path = dir.path().join("report.json");

    let stdout = stdout_of(soulreplay(dir.path()).args([
        "run",
        "--spec",
        spec.to_str().unwrap(),
        "--var",
        "SKU=42",
        "--report",
        report_path.to_str().unwrap(),
        "--metrics",
    ]));
    assert!(stdout.contains("Result: success"));
    assert!(stdout.contains("soul_replay_executions_total{result=\"success\"} 1"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["overallSuccess"], true);
    assert_eq!(report["steps"].as_array().unwrap().len(), 2);
    assert_eq!(report["snippetUsageCount"], 2);
    assert_eq!(report["fallbackCount"], 0);
}

#[test]
fn failed_run_exits_non_zero() {
    let dir = workspace(Some(FAILING_RUNNER), "");
    let spec = write_spec(dir.path());

    let assert = soulreplay(dir.path())
        .args(["run", "--spec", spec.to_str().unwrap(), "--output", "json"])
        .assert()
        .failure()
        .code(1);
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["overallSuccess"], false);
    assert_eq!(report["steps"].as_array().unwrap().len(), 1);
    assert!(report["steps"][0]["error"]
        .as_str()
        .unwrap()
        .contains("Element not found"));
}

#[test]
fn rejects_malformed_variables() {
    let dir = workspace(Some(PASSING_RUNNER), "");
    let spec = write_spec(dir.path());
    soulreplay(dir.path())
        .args(["run", "--spec", spec.to_str().unwrap(), "--var", "SKU"])
        .assert()
        .failure();
}

#[test]
fn imported_snapshot_is_persisted() {
    let dir = workspace(None, "solutions:\n  path: solutions.json\n");

    let source = SolutionStore::default();
    source
        .store_new_solution(
            SolutionCandidate::new("click('text=Buy')", "alternate_selector", 0.8),
            &ErrorContext::new("Element not found: '#buy'", ErrorType::Selector),
        )
        .unwrap();
    let snapshot_path = dir.path().join("snapshot.json");
    fs::write(
        &snapshot_path,
        serde_json::to_string(&source.export_snapshot()).unwrap(),
    )
    .unwrap();

    let stdout = stdout_of(soulreplay(dir.path()).args([
        "solutions",
        "import",
        "--file",
        snapshot_path.to_str().unwrap(),
        "--output",
        "json",
    ]));
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["imported"], 1);
    assert_eq!(summary["skipped"], 0);
    assert!(dir.path().join("solutions.json").exists());

    let stdout = stdout_of(soulreplay(dir.path()).args(["solutions", "list", "--output", "json"]));
    let listed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["code"], "click('text=Buy')");

    let exported = dir.path().join("exported.json");
    soulreplay(dir.path())
        .args(["solutions", "export", "--out", exported.to_str().unwrap()])
        .assert()
        .success();
    let snapshot: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(exported).unwrap()).unwrap();
    assert_eq!(snapshot["solutions"].as_array().unwrap().len(), 1);
}
