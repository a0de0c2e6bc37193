//! CLI Integration Tests
//!
//! These tests run the `mtree` binary end-to-end against seed files in a
//! temporary directory.
//!
//! Run with:
//! ```bash
//! cargo test --test cli_integration
//! ```

use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

const SEED: &str = r#"{
    "ns1": {"Hello": "World", "Hi": "There", "Hey": "You", "Hola": "Mundo"},
    "ns2": {"k1": "v1"}
}"#;

/// Run mtree with a config path inside `dir`; returns (stdout, stderr, success)
fn run_mtree(args: &[&str], dir: &Path) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_mtree"))
        .args(["-c", dir.join("mtree.json").to_str().unwrap(), "-f", "json"])
        .args(args)
        .env_remove("MTREE_HASH")
        .env_remove("MTREE_SIGNING_KEY")
        .output()
        .expect("Failed to execute mtree");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn write_seed(dir: &Path) -> String {
    let path = dir.join("seed.json");
    std::fs::write(&path, SEED).unwrap();
    path.to_str().unwrap().to_string()
}

// ============================================================================
// Key Management Tests
// ============================================================================

#[test]
fn test_cli_keygen_writes_key() {
    let dir = tempdir().unwrap();
    let key_path = dir.path().join("signing.key");
    let key_str = key_path.to_str().unwrap();

    let (stdout, _stderr, success) = run_mtree(&["keygen", "--out", key_str], dir.path());

    assert!(success, "keygen should succeed");
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["scheme"], "ed25519");
    assert_eq!(json["public_key"].as_str().unwrap().len(), 64);
    assert!(key_path.exists(), "key file should be created");
}

#[test]
fn test_cli_keygen_refuses_overwrite() {
    let dir = tempdir().unwrap();
    let key_path = dir.path().join("signing.key");
    let key_str = key_path.to_str().unwrap();

    run_mtree(&["keygen", "--out", key_str], dir.path());
    let first = std::fs::read_to_string(&key_path).unwrap();

    let (_stdout, stderr, success) = run_mtree(&["keygen", "--out", key_str], dir.path());
    assert!(!success, "second keygen without --force should fail");
    assert!(stderr.contains("already exists"));
    assert_eq!(std::fs::read_to_string(&key_path).unwrap(), first);

    let (_stdout, _stderr, success) =
        run_mtree(&["keygen", "--out", key_str, "--force"], dir.path());
    assert!(success, "keygen --force should succeed");
    assert_ne!(std::fs::read_to_string(&key_path).unwrap(), first);
}

// ============================================================================
// Proof Tests
// ============================================================================

#[test]
fn test_cli_prove_then_verify() {
    let dir = tempdir().unwrap();
    let seed = write_seed(dir.path());

    let (stdout, stderr, success) = run_mtree(
        &["prove", "--seed", &seed, "--namespace", "ns1", "--key", "Hola"],
        dir.path(),
    );
    assert!(success, "prove should succeed: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["value"], "Mundo");
    let root = json["root"].as_str().unwrap().to_string();

    let path_file = dir.path().join("path.json");
    std::fs::write(&path_file, json["merkle_path"].to_string()).unwrap();
    let path_str = path_file.to_str().unwrap();

    let (stdout, _stderr, success) = run_mtree(
        &[
            "verify", "--key", "Hola", "--value", "Mundo", "--path", path_str, "--root", &root,
        ],
        dir.path(),
    );
    assert!(success, "verify should accept the proven value");
    assert!(stdout.contains("\"valid\":true"));

    let (stdout, _stderr, success) = run_mtree(
        &[
            "verify", "--key", "Hola", "--value", "Mundo!", "--path", path_str, "--root", &root,
        ],
        dir.path(),
    );
    assert!(!success, "verify should reject a different value");
    assert!(stdout.contains("\"valid\":false"));
}

#[test]
fn test_cli_prove_missing_key_fails() {
    let dir = tempdir().unwrap();
    let seed = write_seed(dir.path());

    let (_stdout, stderr, success) = run_mtree(
        &["prove", "--seed", &seed, "--namespace", "ns1", "--key", "Bonjour"],
        dir.path(),
    );
    assert!(!success);
    assert!(stderr.contains("Key not found"));
}

#[test]
fn test_cli_hash_algorithm_from_config() {
    let dir = tempdir().unwrap();
    let seed = write_seed(dir.path());

    let (sha, _, _) = run_mtree(
        &["prove", "--seed", &seed, "--namespace", "ns2", "--key", "k1"],
        dir.path(),
    );
    std::fs::write(
        dir.path().join("mtree.json"),
        r#"{"hash_algorithm": "blake3"}"#,
    )
    .unwrap();
    let (blake, _, success) = run_mtree(
        &["prove", "--seed", &seed, "--namespace", "ns2", "--key", "k1"],
        dir.path(),
    );
    assert!(success);

    let sha: serde_json::Value = serde_json::from_str(&sha).unwrap();
    let blake: serde_json::Value = serde_json::from_str(&blake).unwrap();
    assert_ne!(sha["root"], blake["root"]);
}

// ============================================================================
// Display Tests
// ============================================================================

#[test]
fn test_cli_show_text() {
    let dir = tempdir().unwrap();
    let seed = write_seed(dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_mtree"))
        .args(["-c", dir.path().join("mtree.json").to_str().unwrap()])
        .args(["-f", "text", "show", "--seed", &seed, "--namespace", "ns1"])
        .env_remove("MTREE_HASH")
        .output()
        .expect("Failed to execute mtree");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Root: "));
    for key in ["Hello", "Hi", "Hey", "Hola"] {
        assert!(stdout.contains(&format!("key: {}", key)), "missing {}", key);
    }
}

#[test]
fn test_cli_show_unknown_namespace_fails() {
    let dir = tempdir().unwrap();
    let seed = write_seed(dir.path());

    let (_stdout, stderr, success) =
        run_mtree(&["show", "--seed", &seed, "--namespace", "nsX"], dir.path());
    assert!(!success);
    assert!(stderr.contains("Namespace not found"));
}

#[test]
fn test_cli_default_config_path() {
    let output = Command::new(env!("CARGO_BIN_EXE_mtree"))
        .args(["--help"])
        .output()
        .expect("Failed to execute mtree");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("[default: mtree.json]"),
        "Default config path should be mtree.json, got: {}",
        stdout
    );
}

#[test]
fn test_cli_empty_seed_fails() {
    let dir = tempdir().unwrap();
    let seed = dir.path().join("empty.json");
    std::fs::write(&seed, r#"{"ns1": {}}"#).unwrap();

    let (_stdout, stderr, success) = run_mtree(
        &["prove", "--seed", seed.to_str().unwrap(), "--namespace", "ns1", "--key", "k"],
        dir.path(),
    );
    assert!(!success);
    assert!(stderr.contains("has no entries"));
}
