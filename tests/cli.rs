use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ecm_sync_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ecm-sync");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Port 1 is never listening, so every ECM call fails fast.
    let config_content = format!(
        r#"[db]
path = "{}/data/amanda.sqlite"

[ecm]
base_url = "http://127.0.0.1:1/api/v1"
username = "loader"
password = "secret"
timeout_secs = 5
workspace_root_id = 2000

[categories]
document_info = 31001
permit = 31002
tax_account = 31003

[folders]
tax_account_path = ["Permits", "Tax Accounts"]
no_tax_account_path = "Permits|No Tax Account"
"#,
        root.display()
    );

    let config_path = config_dir.join("ecm-sync.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ecm_sync(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ecm_sync_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("ECM_PASSWORD")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ecm-sync binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ecm_sync(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("amanda.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ecm_sync(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ecm_sync(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_ecm_sync(&missing, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_invalid_config_fails() {
    let (_tmp, config_path) = setup_test_env();
    let content = fs::read_to_string(&config_path).unwrap();
    fs::write(&config_path, content.replace("tax_account = 31003", "tax_account = 31001")).unwrap();

    let (_, stderr, success) = run_ecm_sync(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("distinct"));
}

#[test]
fn test_check_reports_unreachable_ecm() {
    let (_tmp, config_path) = setup_test_env();
    run_ecm_sync(&config_path, &["init"]);

    let (stdout, stderr, success) = run_ecm_sync(&config_path, &["check"]);
    assert!(!success, "check should fail: stdout={}", stdout);
    assert!(stdout.contains("database"));
    assert!(stdout.contains("ecm session"));
    assert!(stdout.contains("FAILED"));
    assert!(stderr.contains("check(s) failed"));
}

#[test]
fn test_put_missing_file_fails_before_connecting() {
    let (tmp, config_path) = setup_test_env();
    let missing = tmp.path().join("missing.pdf");

    let (_, stderr, success) = run_ecm_sync(
        &config_path,
        &["put", "8801", missing.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("Failed to open"));
}

#[test]
fn test_put_requires_numeric_attachment_id() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_ecm_sync(&config_path, &["put", "abc", "file.pdf"]);
    assert!(!success);
    assert!(stderr.contains("invalid value"));
}
