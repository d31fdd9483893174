use sca_upload::load_config::{load_config, read_file_config, ProcessEnv};
use sca_upload_core::config::MapEnv;
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn ci_env() -> MapEnv {
    MapEnv::new()
        .with("INPUT_API_URL", "https://env.example/api/")
        .with("INPUT_API_KEY", "sca2099-01-01toolabc")
        .with("INPUT_EXCLUDED_PATHS", "vendor/")
        .with("GITHUB_WORKSPACE", "/env/workspace")
        .with("GITHUB_REPOSITORY", "acme/widgets")
}

/// YAML settings win over the environment; untouched fields fall through.
#[test]
fn yaml_overrides_environment_for_non_secret_settings() {
    let config_yaml = r#"
api_url: "https://file.example/api/"
excluded_paths: "build/, dist/"
repository_root: /file/workspace
results_url: "https://results.example/scan/"
upload_timeout_secs: 90
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let config = load_config(Some(config_file.path()), &ci_env()).expect("Config should load");

    assert_eq!(config.api_url, "https://file.example/api/");
    assert_eq!(config.excluded_paths, "build/, dist/");
    assert_eq!(config.repository_root, PathBuf::from("/file/workspace"));
    assert_eq!(config.working_dir, PathBuf::from("/file/workspace"));
    assert_eq!(config.results_url, "https://results.example/scan/");
    assert_eq!(config.upload_timeout, Some(Duration::from_secs(90)));
    assert_eq!(config.api_key, "sca2099-01-01toolabc");
    assert_eq!(config.identity.repository_name, "acme/widgets");
}

#[test]
fn no_file_means_environment_only() {
    let config = load_config(None, &ci_env()).expect("Config should load");
    assert_eq!(config.api_url, "https://env.example/api/");
    assert_eq!(config.excluded_paths, "vendor/");
    assert_eq!(config.upload_timeout, None);
}

#[test]
fn empty_file_is_an_empty_config() {
    let config_file = NamedTempFile::new().expect("temp file");
    let file = read_file_config(config_file.path()).expect("empty file should load");
    assert!(file.api_url.is_none());
    assert!(file.upload_timeout_secs.is_none());
}

/// Secrets are not accepted from the file.
#[test]
fn rejects_unknown_fields_such_as_api_key() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "api_key: sca2099-01-01toolabc\n").unwrap();

    let err = load_config(Some(config_file.path()), &ci_env()).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("Failed to parse config YAML"), "got: {msg}");
}

#[test]
fn errors_for_invalid_yaml() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), b"not-yaml: [:::").unwrap();

    let err = load_config(Some(config_file.path()), &ci_env()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
fn errors_for_missing_file() {
    let err = load_config(
        Some(std::path::Path::new("/definitely/not/here.yaml")),
        &ci_env(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn missing_api_url_is_reported() {
    let env = MapEnv::new().with("INPUT_API_KEY", "sca2099-01-01toolabc");
    let err = load_config(None, &env).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("INPUT_API_URL"), "got: {msg}");
}

#[test]
#[serial]
fn reads_the_process_environment() {
    env::set_var("INPUT_API_URL", "https://process.example/api/");
    env::set_var("INPUT_API_KEY", "sca2099-01-01toolxyz");
    env::set_var("GITHUB_WORKSPACE", "/process/workspace");

    let config = load_config(None, &ProcessEnv).expect("Config should load");

    env::remove_var("INPUT_API_URL");
    env::remove_var("INPUT_API_KEY");
    env::remove_var("GITHUB_WORKSPACE");

    assert_eq!(config.api_url, "https://process.example/api/");
    assert_eq!(config.identity.api_key, "sca2099-01-01toolxyz");
    assert_eq!(config.repository_root, PathBuf::from("/process/workspace"));
}
