use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docbot_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docbot");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs_dir = root.join("docs");
    fs::create_dir_all(docs_dir.join("guides")).unwrap();
    fs::write(
        docs_dir.join("staking.md"),
        "# Staking\n\nStake minimum is 100 tokens.\n\nRewards are paid every epoch.",
    )
    .unwrap();
    fs::write(
        docs_dir.join("guides/wallets.txt"),
        "Supported wallets are MetaMask and Phantom.",
    )
    .unwrap();
    fs::write(docs_dir.join("logo.png"), "binary").unwrap();

    let config_content = format!(
        r#"[storage]
data_dir = "{}/data"

[chunking]
chunk_size = 200
chunk_overlap = 20

[embedding]
provider = "hash"

[llm]
provider = "groq"
api_key_env = "DOCBOT_CLI_TEST_KEY"
"#,
        root.display()
    );

    let config_path = config_dir.join("docbot.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docbot(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docbot_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("DOCBOT_CLI_TEST_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docbot binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn docs_path(config_path: &Path) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("docs")
        .to_string_lossy()
        .to_string()
}

#[test]
fn test_ingest_directory_and_list_tenants() {
    let (_tmp, config_path) = setup_test_env();
    let docs = docs_path(&config_path);

    let (stdout, stderr, success) =
        run_docbot(&config_path, &["ingest", &docs, "--tenant", "acme"]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("into tenant 'acme'"));

    let (stdout, _, success) = run_docbot(&config_path, &["tenants"]);
    assert!(success);
    assert!(stdout.contains("acme"));
    assert!(stdout.contains("staking.md"));
    assert!(stdout.contains("guides/wallets.txt"));
    assert!(!stdout.contains("logo.png"));
}

#[test]
fn test_snapshot_written_to_data_dir() {
    let (tmp, config_path) = setup_test_env();
    let docs = docs_path(&config_path);

    run_docbot(&config_path, &["ingest", &docs, "--tenant", "acme"]);
    let snapshot = fs::read_to_string(tmp.path().join("data/documents.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
    assert_eq!(json["version"], 1);
    assert!(json["chunks"].as_array().unwrap().len() >= 2);
    assert_eq!(json["chunks"][0]["tenant_id"], "acme");
    assert_eq!(json["chunks"][0]["model"], "hash-384");
}

#[test]
fn test_clear_tenant_keeps_others() {
    let (_tmp, config_path) = setup_test_env();
    let docs = docs_path(&config_path);

    run_docbot(&config_path, &["ingest", &docs, "--tenant", "one"]);
    run_docbot(&config_path, &["ingest", &docs, "--tenant", "two"]);

    let (stdout, _, success) = run_docbot(&config_path, &["clear", "--tenant", "one"]);
    assert!(success);
    assert!(stdout.contains("from tenant 'one'"));

    let (stdout, _, _) = run_docbot(&config_path, &["tenants"]);
    assert!(!stdout.contains("one "));
    assert!(stdout.contains("two"));

    let (stdout, _, success) = run_docbot(&config_path, &["clear", "--all"]);
    assert!(success);
    assert!(stdout.contains("from all tenants"));
    let (stdout, _, _) = run_docbot(&config_path, &["tenants"]);
    assert!(stdout.contains("No tenants."));
}

#[test]
fn test_clear_requires_target() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_docbot(&config_path, &["clear"]);
    assert!(!success);
    assert!(stderr.contains("--tenant or --all"));
}

#[test]
fn test_tone_round_trip() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_docbot(&config_path, &["tone", "get", "--tenant", "acme"]);
    assert!(success);
    assert_eq!(stdout.trim(), "casual");

    let (_, _, success) = run_docbot(
        &config_path,
        &["tone", "set", "professional", "--tenant", "acme"],
    );
    assert!(success);

    let (stdout, _, _) = run_docbot(&config_path, &["tone", "get", "--tenant", "acme"]);
    assert_eq!(stdout.trim(), "professional");
}

#[test]
fn test_tone_set_rejects_unknown() {
    let (_tmp, config_path) = setup_test_env();
    let (_, _, success) = run_docbot(&config_path, &["tone", "set", "pirate"]);
    assert!(!success);
}

#[test]
fn test_stats() {
    let (_tmp, config_path) = setup_test_env();
    let docs = docs_path(&config_path);
    run_docbot(&config_path, &["ingest", &docs, "--tenant", "acme"]);

    let (stdout, stderr, success) = run_docbot(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("hash-384"));
    assert!(stdout.contains("Tenants:          1"));
}

#[test]
fn test_ask_without_api_key_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_docbot(&config_path, &["ask", "how do I stake?"]);
    assert!(!success);
    assert!(stderr.contains("DOCBOT_CLI_TEST_KEY"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(
        &bad,
        "[storage]\ndata_dir = \"d\"\n[chunking]\nchunk_size = 10\nchunk_overlap = 20\n",
    )
    .unwrap();
    let (_, stderr, success) = run_docbot(&bad, &["tenants"]);
    assert!(!success);
    assert!(stderr.contains("chunk_overlap"));
}

#[test]
fn test_completions_need_no_config() {
    let output = Command::new(docbot_binary())
        .args(["--config", "/nonexistent/docbot.toml", "completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("docbot"));
}
