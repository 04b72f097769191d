use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const QUIZ_TASK: &str = r#"{
    "email": "student@example.com",
    "task": "quiz",
    "round": 1,
    "nonce": "n-42",
    "brief": "Build a one-question quiz.\n\nShow the score after submitting.",
    "checks": ["Button #submit exists", "Input field #answer accepts text"],
    "evaluation_url": "https://example.com/notify",
    "attachments": [
        {"name": "questions.json", "url": "data:application/json;base64,eyJxIjoiMisyIn0="}
    ]
}"#;

/// `pagesmith` with an isolated home and no `PAGESMITH_*` overrides.
fn pagesmith(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pagesmith").unwrap();
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("RUST_LOG", "warn")
        .env_remove("PAGESMITH_SECRET")
        .env_remove("PAGESMITH_GITHUB_TOKEN")
        .env_remove("PAGESMITH_GITHUB_OWNER")
        .env_remove("PAGESMITH_BIND")
        .env_remove("PAGESMITH_READINESS_DELAY_SECS");
    cmd
}

fn write_task(dir: &Path) -> PathBuf {
    let path = dir.join("task.json");
    std::fs::write(&path, QUIZ_TASK).unwrap();
    path
}

#[test]
fn generate_writes_files_into_out_dir() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let task = write_task(work.path());
    let out = work.path().join("site");

    pagesmith(home.path())
        .arg("generate")
        .arg(&task)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("quiz-r1"))
        .stdout(predicate::str::contains("index.html"));

    let index = std::fs::read_to_string(out.join("index.html")).unwrap();
    assert!(index.contains(r#"id="submit""#));
    assert!(index.contains(r#"id="answer""#));
    assert!(out.join("README.md").exists());
    assert!(out.join("LICENSE").exists());
    assert_eq!(
        std::fs::read_to_string(out.join("questions.json")).unwrap(),
        r#"{"q":"2+2"}"#
    );

    let leftovers: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".pagesmith.tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temporary files left behind");
}

#[test]
fn generate_json_lists_every_file() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let task = write_task(work.path());

    let output = pagesmith(home.path())
        .arg("generate")
        .arg(&task)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let paths: Vec<&str> = rows.iter().map(|r| r["path"].as_str().unwrap()).collect();
    assert_eq!(paths, vec!["LICENSE", "README.md", "index.html", "questions.json"]);
    assert!(rows.iter().all(|r| r["sha256"].as_str().unwrap().len() == 12));
}

#[test]
fn generate_rejects_malformed_task_file() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let task = work.path().join("task.json");
    std::fs::write(&task, r#"{"task": "quiz"}"#).unwrap();

    pagesmith(home.path())
        .arg("generate")
        .arg(&task)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid task description"));
}

#[test]
fn dry_run_walks_every_stage_without_credentials() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let task = write_task(work.path());

    pagesmith(home.path())
        .arg("run")
        .arg(&task)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run]"))
        .stdout(predicate::str::contains("quiz-r1"))
        .stdout(predicate::str::contains("https://example.com/notify"))
        .stdout(predicate::str::contains("\"pages_url\""))
        .stdout(predicate::str::contains("\"nonce\": \"n-42\""))
        .stdout(predicate::str::contains("delivered"));
}

#[test]
fn dry_run_json_report_reaches_done() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let task = write_task(work.path());

    let output = pagesmith(home.path())
        .arg("run")
        .arg(&task)
        .arg("--dry-run")
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    // The printed payload precedes the report; the report is the last JSON document.
    let start = stdout.rfind("\n{\n  \"task\"").map(|i| i + 1).unwrap_or(0);
    let report: serde_json::Value = serde_json::from_str(&stdout[start..]).unwrap();
    assert_eq!(report["round"], 1);
    assert!(report["failure"].is_null());
    assert_eq!(report["delivery"]["status"], "delivered");
}

#[test]
fn run_without_credentials_is_refused() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let task = write_task(work.path());

    pagesmith(home.path())
        .arg("run")
        .arg(&task)
        .assert()
        .failure()
        .stderr(predicate::str::contains("github.token"));
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let home = TempDir::new().unwrap();

    pagesmith(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.yaml"));
    assert!(home.path().join(".pagesmith").join("config.yaml").exists());

    pagesmith(home.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    pagesmith(home.path())
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn config_show_masks_secrets() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("custom.yaml");
    std::fs::write(
        &config,
        "secret: hunter2\ngithub:\n  token: ghp_supersecret\n  owner: octo\n",
    )
    .unwrap();

    pagesmith(home.path())
        .args(["config", "show", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("owner: octo"))
        .stdout(predicate::str::contains("hunter2").not())
        .stdout(predicate::str::contains("ghp_supersecret").not());
}

#[test]
fn health_fails_when_nothing_is_listening() {
    let home = TempDir::new().unwrap();

    pagesmith(home.path())
        .args(["health", "--url", "http://127.0.0.1:1"])
        .assert()
        .failure();
}
