use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use mockall::predicate::eq;
use sca_upload_core::config::{MapEnv, RunConfig};
use sca_upload_core::contract::{
    FileGroupSet, FileTypeGroup, MockFileUploader, MockGroupFetcher, MockNotifier, MockOutputSink,
};
use sca_upload_core::pipeline::{Pipeline, FILES_OUTPUT};
use sca_upload_core::{ErrorClass, RunError};
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn groups(list: &[&[&str]]) -> FileGroupSet {
    FileGroupSet::new(
        list.iter()
            .map(|g| FileTypeGroup::new(g.iter().map(|s| s.to_string()).collect()))
            .collect(),
    )
}

fn repo(files: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for rel in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "data").unwrap();
    }
    dir
}

fn config(root: &Path, api_key: &str) -> RunConfig {
    let env = MapEnv::new()
        .with("INPUT_API_URL", "https://api.example.com/")
        .with("INPUT_API_KEY", api_key)
        .with("INPUT_EXCLUDED_PATHS", "vendor/**")
        .with("GITHUB_WORKSPACE", &root.display().to_string());
    RunConfig::from_env_source(&env).unwrap()
}

fn fetcher_returning(set: FileGroupSet) -> MockGroupFetcher {
    let mut fetcher = MockGroupFetcher::new();
    fetcher
        .expect_fetch_groups()
        .with(eq("https://api.example.com/integration/file-list"))
        .times(1)
        .returning(move |_| Ok(set.clone()));
    fetcher
}

#[tokio::test]
async fn happy_path_uploads_resolved_files_and_notifies() {
    let dir = repo(&["a.sarif", "docs/a.pdf", "vendor/x.pdf", "node_modules/m/y.sarif", "README.md"]);
    let config = config(dir.path(), "sca2099-01-01toolABC");
    let fetcher = fetcher_returning(groups(&[&["*.pdf", "*.sarif"], &["*.json", "*.lock"]]));

    let uploaded: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
    let seen = Arc::clone(&uploaded);
    let mut uploader = MockFileUploader::new();
    uploader
        .expect_upload()
        .withf(|url, _| url == "https://api.example.com/integration/ci-triggered-upload")
        .times(1)
        .returning(move |_, files| {
            seen.lock().unwrap().extend_from_slice(files);
            Ok("scan-99".to_string())
        });

    let mut output = MockOutputSink::new();
    output
        .expect_set_output()
        .withf(|name, value| name == FILES_OUTPUT && value.contains("a.sarif") && value.contains("a.pdf"))
        .times(1)
        .returning(|_, _| Ok(()));

    let mut notifier = MockNotifier::new();
    notifier
        .expect_notify()
        .withf(|report| report.server_response == "scan-99" && report.files.len() == 2)
        .times(1)
        .returning(|_| Ok(()));

    let pipeline = Pipeline {
        fetcher: &fetcher,
        uploader: &uploader,
        notifier: &notifier,
        output: &output,
    };
    let report = pipeline.run(&config, today()).await.expect("run should succeed");

    assert_eq!(report.server_response, "scan-99");
    assert_eq!(report.key_expires_on, NaiveDate::from_ymd_opt(2099, 1, 1).unwrap());
    let uploaded = uploaded.lock().unwrap();
    let names: Vec<_> = uploaded
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.sarif", "a.pdf"]);
    assert!(uploaded.iter().all(|p| !p.to_string_lossy().contains("vendor")));
}

#[tokio::test]
async fn expired_key_stops_before_any_network_call() {
    let dir = repo(&["a.sarif"]);
    let config = config(dir.path(), "sca2000-01-01toolABC");

    let mut fetcher = MockGroupFetcher::new();
    fetcher.expect_fetch_groups().never();
    let mut uploader = MockFileUploader::new();
    uploader.expect_upload().never();
    let notifier = MockNotifier::new();
    let output = MockOutputSink::new();

    let err = Pipeline {
        fetcher: &fetcher,
        uploader: &uploader,
        notifier: &notifier,
        output: &output,
    }
    .run(&config, today())
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::ExpiredApiKey { .. }));
}

#[tokio::test]
async fn incomplete_groups_stop_before_upload() {
    let dir = repo(&["only.sarif"]);
    let config = config(dir.path(), "sca2099-01-01toolABC");
    let fetcher = fetcher_returning(groups(&[&["*.pdf", "*.sarif"], &["*.json", "*.lock"]]));

    let mut uploader = MockFileUploader::new();
    uploader.expect_upload().never();
    let mut output = MockOutputSink::new();
    output.expect_set_output().never();
    let notifier = MockNotifier::new();

    let err = Pipeline {
        fetcher: &fetcher,
        uploader: &uploader,
        notifier: &notifier,
        output: &output,
    }
    .run(&config, today())
    .await
    .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Validation);
    let msg = err.to_string();
    assert!(msg.contains("[ *.pdf, *.sarif ]") && msg.contains("[ *.json, *.lock ]"), "got: {msg}");
}

#[tokio::test]
async fn nothing_found_is_no_files_error() {
    let dir = repo(&["src/lib.rs"]);
    let config = config(dir.path(), "sca2099-01-01toolABC");
    let fetcher = fetcher_returning(groups(&[&[".pdf", ".sarif"]]));
    let uploader = MockFileUploader::new();
    let notifier = MockNotifier::new();
    let output = MockOutputSink::new();

    let err = Pipeline {
        fetcher: &fetcher,
        uploader: &uploader,
        notifier: &notifier,
        output: &output,
    }
    .run(&config, today())
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::NoFiles));
}

#[tokio::test]
async fn upload_failure_skips_notification() {
    let dir = repo(&["a.sarif", "a.pdf"]);
    let config = config(dir.path(), "sca2099-01-01toolABC");
    let fetcher = fetcher_returning(groups(&[&[".pdf", ".sarif"]]));

    let mut uploader = MockFileUploader::new();
    uploader.expect_upload().times(1).returning(|_, _| {
        Err(RunError::UploadFailed {
            status: 500,
            body: "boom".into(),
            reason: "Internal Server Error".into(),
        })
    });
    let mut output = MockOutputSink::new();
    output.expect_set_output().times(1).returning(|_, _| Ok(()));
    let mut notifier = MockNotifier::new();
    notifier.expect_notify().never();

    let err = Pipeline {
        fetcher: &fetcher,
        uploader: &uploader,
        notifier: &notifier,
        output: &output,
    }
    .run(&config, today())
    .await
    .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Transport);
}
