use assert_cmd::Command;

fn surefoot() -> Command {
    let mut cmd = Command::cargo_bin("surefoot").unwrap();
    cmd.env_remove("SUREFOOT_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("SUREFOOT_MODEL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_config_show_reads_file_and_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("surefoot.yaml");
    std::fs::write(
        &path,
        "llm:\n  model: file-model\nexecution:\n  max_retries: 4\n",
    )
    .unwrap();

    let output = surefoot()
        .env("SUREFOOT_API_KEY", "sk-secretvalue")
        .args(["--config", path.to_str().unwrap(), "config", "show"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("model: file-model"));
    assert!(stdout.contains("max_retries: 4"));
    assert!(stdout.contains("sk-s****"));
    assert!(!stdout.contains("sk-secretvalue"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.yaml");
    surefoot()
        .args(["--config", missing.to_str().unwrap(), "config", "show"])
        .assert()
        .failure();
}

#[test]
fn test_offline_plan_for_search_task() {
    let output = surefoot()
        .args([
            "plan",
            "--task",
            "search for rust borrow checker",
            "--url",
            "https://duckduckgo.com",
            "--offline",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let steps = plan["steps"].as_array().unwrap();
    assert_eq!(steps[0]["action"]["type"], "navigate");
    assert!(steps
        .iter()
        .any(|step| step["action"]["text"] == "rust borrow checker"));
    assert_eq!(plan["description"], "search for rust borrow checker");
}

#[test]
fn test_run_requires_task_and_url() {
    surefoot().args(["run", "--url", "https://example.com"]).assert().failure();
}
