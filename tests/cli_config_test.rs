use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn faqstore(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_faqstore"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to run faqstore")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn workspace_with_abc() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("data")).unwrap();
    fs::write(
        temp_dir.path().join("data/abc.csv"),
        "pregunta|respuesta\n\
         ¿Qué es el ABC?|Un trámite de alta\n\
         ¿Cómo pago la cuota mensual?|Con el volante de pago\n\
         ¿Qué es el ABC?|Repetida\n",
    )
    .unwrap();
    temp_dir
}

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();

    let output = faqstore(temp_dir.path(), &["init"]);
    assert!(output.status.success());

    let config_path = temp_dir.path().join(".faqstore/settings.toml");
    assert!(config_path.exists());

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[database]"));
    assert!(content.contains("[datasets.abc]"));

    // Second init without --force refuses.
    let output = faqstore(temp_dir.path(), &["init"]);
    assert!(!output.status.success());
    let output = faqstore(temp_dir.path(), &["init", "--force"]);
    assert!(output.status.success());
}

#[test]
fn test_config_command_reads_workspace_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join(".faqstore")).unwrap();
    fs::write(
        temp_dir.path().join(".faqstore/settings.toml"),
        "[query]\nn_results = 9\n",
    )
    .unwrap();

    let output = faqstore(temp_dir.path(), &["config"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("n_results = 9"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = faqstore(temp_dir.path(), &["--config", "absent.toml", "config"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.toml"));
}

#[test]
fn test_datasets_inspect_json() {
    let temp_dir = workspace_with_abc();

    let output = faqstore(temp_dir.path(), &["datasets", "inspect", "abc", "--json"]);
    assert!(output.status.success());

    let payload: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(payload["collection_name"], "abc_collection");
    assert_eq!(payload["count"], 2);
    assert_eq!(payload["documents"].as_array().unwrap().len(), 2);
}

#[test]
fn test_build_query_delete_roundtrip() {
    let temp_dir = workspace_with_abc();

    let output = faqstore(
        temp_dir.path(),
        &["collections", "build", "abc", "--no-progress"],
    );
    assert!(output.status.success());
    assert!(stdout(&output).contains("abc_collection: 2/2 inserted"));
    assert!(temp_dir.path().join("database/collections/abc_collection.json").exists());

    let output = faqstore(
        temp_dir.path(),
        &["query", "abc", "cuota mensual", "--n-results", "1", "--json"],
    );
    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(result["documents"][0][0], "¿Cómo pago la cuota mensual?");

    let output = faqstore(temp_dir.path(), &["collections", "delete", "abc_collection", "--yes"]);
    assert!(output.status.success());
    assert!(!temp_dir.path().join("database/collections/abc_collection.json").exists());

    let output = faqstore(temp_dir.path(), &["query", "abc", "cuota"]);
    assert!(!output.status.success());
}
