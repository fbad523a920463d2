//! End-to-end runs of the application entry point

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vaultshelf::{Invocation, OutputFormat, RunMode, execute};

fn write_config(dir: &Path, vault: &Path, url: &str) -> PathBuf {
    let path = dir.join("vaultshelf.json");
    let json = serde_json::json!({
        "vault": { "path": vault },
        "remote": {
            "url": url,
            "token_id": "id",
            "token_secret": "secret",
            "timeout_secs": 2
        }
    });
    std::fs::write(&path, json.to_string()).unwrap();
    path
}

fn invocation(config: PathBuf) -> Invocation {
    Invocation {
        config,
        mode: RunMode::DryRun,
        test_connection: false,
        output: OutputFormat::Human,
    }
}

#[tokio::test]
async fn test_vault_without_markdown_exits_nonzero() {
    let temp = TempDir::new().unwrap();
    let vault = temp.path().join("vault");
    std::fs::create_dir(&vault).unwrap();
    std::fs::write(vault.join("picture.png"), "png").unwrap();
    let config = write_config(temp.path(), &vault, "https://docs.example.com");

    let outcome = execute(&invocation(config)).await.unwrap();

    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.output.contains("VaultEmpty"));
}

#[tokio::test]
async fn test_json_output_is_parseable() {
    let temp = TempDir::new().unwrap();
    let vault = temp.path().join("vault");
    std::fs::create_dir(&vault).unwrap();
    let config = write_config(temp.path(), &vault, "https://docs.example.com");

    let mut request = invocation(config);
    request.output = OutputFormat::Json;
    let outcome = execute(&request).await.unwrap();

    let value: serde_json::Value = serde_json::from_str(&outcome.output).unwrap();
    assert_eq!(value["mode"], "dry-run");
    assert_eq!(value["state"], "completed");
    assert_eq!(value["failures"][0]["kind"], "VaultEmpty");
}

#[tokio::test]
async fn test_missing_config_is_an_error() {
    let temp = TempDir::new().unwrap();
    let result = execute(&invocation(temp.path().join("absent.json"))).await;

    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("absent.json"));
}

#[tokio::test]
async fn test_invalid_remote_rejected_before_run() {
    let temp = TempDir::new().unwrap();
    let vault = temp.path().join("vault");
    std::fs::create_dir(&vault).unwrap();
    std::fs::write(vault.join("note.md"), "text").unwrap();
    let config = write_config(temp.path(), &vault, "docs.example.com");

    let result = execute(&invocation(config)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_connection_failure_exits_nonzero() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &temp.path().join("unused"), "http://127.0.0.1:9");

    let mut request = invocation(config);
    request.test_connection = true;
    let outcome = execute(&request).await.unwrap();

    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.output.contains("failed"));
}
