use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{error, info};

use picshot::cache;
use picshot::capture::{self, ShotDependencies, ShotError, ShotRequest};
use picshot::config::Config;
use picshot::keygen;
use picshot::upload::{UploadClient, UploadOutcome, UploadTarget};

/// Cache namespace for transient screenshot artifacts.
const CACHE_NAMESPACE: &str = "piclab_upload";

#[derive(Parser, Debug)]
#[command(name = "picshot")]
#[command(version, about = "Region screenshot capture and Piclab image host upload tool")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Generate random API keys for the image host
    Generate {
        /// How many keys to generate (default 1)
        count: Option<String>,
    },
    /// Upload a local image or re-host a remote one; reads the clipboard
    /// when no image is given
    Upload {
        /// Local image path or http(s) URL
        image: Option<String>,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Capture a region screenshot, upload it, and copy the link
    Shot {
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Run in the background; SIGUSR1 triggers a capture-and-upload pass
    Daemon {
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
}

#[derive(Args, Debug)]
struct EndpointArgs {
    /// Upload endpoint URL (defaults to $PICLAB_API_URL)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,
    /// API key sent as a bearer token (defaults to $PICLAB_API_KEY)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,
}

impl EndpointArgs {
    fn resolve(self) -> Config {
        Config::resolve(self.api_url, self.api_key)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        CliCommand::Generate { count } => run_generate(count),
        CliCommand::Upload { image, endpoint } => {
            runtime()?.block_on(run_upload(image, endpoint.resolve()))
        }
        CliCommand::Shot { endpoint } => runtime()?.block_on(run_shot(endpoint.resolve())),
        CliCommand::Daemon { endpoint } => run_daemon(endpoint.resolve()),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}

fn run_generate(count: Option<String>) -> Result<()> {
    let count = match count {
        None => 1,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) => n,
            Err(_) => bail!("usage: picshot generate [count]"),
        },
    };
    let keys = keygen::generate_batch(count, keygen::DEFAULT_KEY_LENGTH);
    println!("{}", keygen::format_batch(&keys));
    Ok(())
}

async fn run_upload(image: Option<String>, config: Config) -> Result<()> {
    let client = UploadClient::new(&config)?;
    let target = match image {
        Some(input) => UploadTarget::parse(&input)?,
        None => client.target_from_clipboard()?,
    };
    let outcome = client.upload(&target).await?;
    report_outcome(&outcome);
    Ok(())
}

fn report_outcome(outcome: &UploadOutcome) {
    match outcome {
        UploadOutcome::Linked { markdown } => {
            info!("Upload succeeded; markdown link copied to clipboard");
            println!("{markdown}");
        }
        UploadOutcome::NoLink { body } => {
            info!("Upload succeeded, but the host returned no markdown link");
            println!("{body}");
        }
    }
}

async fn run_shot(config: Config) -> Result<()> {
    let deps = Arc::new(ShotDependencies::new(&config)?);
    run_shot_with(deps).await
}

/// One orchestrated pipeline pass: resolve the artifact path, capture,
/// upload, notify, clean up. All pipeline errors are reported here; the
/// ephemeral fallback cache directory is removed when this returns.
async fn run_shot_with(deps: Arc<ShotDependencies>) -> Result<()> {
    let cache_dir = cache::resolve(CACHE_NAMESPACE).context("Failed to resolve cache directory")?;
    let request = ShotRequest {
        artifact_path: cache_dir.path().join(capture::artifact_filename()),
    };

    match capture::perform_shot(request, deps.clone()).await {
        Ok(UploadOutcome::Linked { markdown }) => {
            deps.notifier
                .notify("Screenshot uploaded", "Markdown link copied to clipboard")
                .await;
            println!("{markdown}");
            Ok(())
        }
        Ok(UploadOutcome::NoLink { body }) => {
            deps.notifier
                .notify("Screenshot uploaded", "The host returned no markdown link")
                .await;
            println!("{body}");
            Ok(())
        }
        Err(err) => {
            error!("Capture pipeline failed: {err}");
            let summary = match &err {
                ShotError::Capture(_) => "Screenshot failed",
                ShotError::Upload(_) => "Screenshot upload failed",
            };
            deps.notifier.notify(summary, &err.to_string()).await;
            Err(err.into())
        }
    }
}

#[cfg(unix)]
fn run_daemon(config: Config) -> Result<()> {
    use picshot::daemon::{Daemon, ShotRunner};

    let runtime = runtime()?;
    let deps = Arc::new(ShotDependencies::new(&config)?);
    let handle = runtime.handle().clone();
    let runner: Arc<ShotRunner> = Arc::new(move || handle.block_on(run_shot_with(deps.clone())));
    Daemon::new(runner).run()
}

#[cfg(not(unix))]
fn run_daemon(_config: Config) -> Result<()> {
    bail!("daemon mode requires a Unix system (SIGUSR1 trigger)")
}
