///
/// This module implements the CLI interface for sca-upload: command parsing,
/// wiring of the real HTTP collaborators, and user-visible reporting.
///
/// All stage logic lives in the [`sca-upload-core`] crate; this module only
/// reads the host environment, runs the pipeline and reports the outcome.
///
/// ## How To Use
/// - In a workflow: run `sca-upload run` with the action inputs exported as `INPUT_*`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`sca-upload-core`]: ../../sca-upload-core/
use crate::load_config::{load_config, ProcessEnv};
use crate::output::{error_annotation, GitHubOutput};
use anyhow::Result;
use clap::{Parser, Subcommand};
use sca_upload_core::config::RunConfig;
use sca_upload_core::credential::{self, validate_key_now};
use sca_upload_core::fetch::HttpGroupFetcher;
use sca_upload_core::notify::{CommentTarget, PullRequestNotifier};
use sca_upload_core::pipeline::Pipeline;
use sca_upload_core::upload::HttpUploader;
use std::path::PathBuf;

/// CLI for sca-upload: ship scan-relevant repository files to the SCATool.
#[derive(Parser)]
#[clap(
    name = "sca-upload",
    version,
    about = "Discover, validate and upload the files the SCATool needs for a scan"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the required file groups, validate the repository and upload the matching files
    Run {
        /// Optional YAML file with non-secret settings
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Check an API key's format and expiry without contacting the server
    CheckKey {
        /// The key to check
        key: String,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run { config } => {
            tracing::info!(command = "run", "Starting upload run");
            match execute(config).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    tracing::error!(command = "run", error = %e, "Upload run failed");
                    println!("{}", error_annotation(&format!("Action failed with error: {e:#}")));
                    Err(e)
                }
            }
        }
        Commands::CheckKey { key } => match validate_key_now(&key) {
            Ok(status) => {
                println!("API key is still valid (expires on {}).", status.expires_on);
                if status.expires_soon {
                    println!("Warning: API key will expire soon on {}.", status.expires_on);
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(command = "check-key", error = %e, "API key check failed");
                Err(anyhow::Error::new(e))
            }
        },
    }
}

async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref(), &ProcessEnv)?;
    config.trace_loaded();

    let fetcher = HttpGroupFetcher::with_timeout(config.fetch_timeout);
    let uploader = HttpUploader::new(config.identity.clone(), config.working_dir.clone())
        .with_timeout(config.upload_timeout);
    let notifier = PullRequestNotifier::new(comment_target(&config), config.results_url.clone());
    let output = GitHubOutput::from_env(&ProcessEnv);

    let pipeline = Pipeline {
        fetcher: &fetcher,
        uploader: &uploader,
        notifier: &notifier,
        output: &output,
    };
    let report = pipeline.run(&config, credential::today()).await?;

    println!("Controller Response: {}", report.server_response);
    tracing::info!(command = "run", files = report.files.len(), "Upload run complete");
    Ok(())
}

/// A comment is only posted for pull-request runs with a token.
pub fn comment_target(config: &RunConfig) -> Option<CommentTarget> {
    let token = config.github_token.clone()?;
    let pull_request = config.pull_request?;
    if config.identity.repository_name.is_empty() {
        return None;
    }
    Some(CommentTarget {
        api_url: config.github_api_url.clone(),
        repository: config.identity.repository_name.clone(),
        pull_request,
        token,
    })
}
