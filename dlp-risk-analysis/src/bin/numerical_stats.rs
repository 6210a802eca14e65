//! Runs a DLP numerical statistics analysis over one BigQuery column.
//!
//! Usage:
//! ```text
//! GOOGLE_OAUTH_ACCESS_TOKEN=$(gcloud auth print-access-token) \
//!   numerical-stats --calling-project my-project \
//!     --table-project bigquery-public-data --dataset samples --table natality \
//!     --topic dlp-done --subscription dlp-done-sub --column mother_age
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dlp_risk_analysis::{
    ClientConfig, HttpDlpServiceClient, HttpPubsubClient, MetadataTokenProvider,
    NumericalStatsAnalysis, NumericalStatsRequest, RiskError, SharedTokenProvider,
    StaticTokenProvider, SubscriberConfig, WaitConfig, DEFAULT_SETTLE_DELAY,
};

#[derive(Parser)]
#[command(
    name = "numerical-stats",
    about = "Compute numerical statistics for a BigQuery column with Cloud DLP"
)]
struct Cli {
    /// Project that runs the job and owns the topic and subscription
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    calling_project: String,

    /// Project that owns the table
    #[arg(long)]
    table_project: String,

    /// BigQuery dataset ID
    #[arg(long)]
    dataset: String,

    /// BigQuery table ID
    #[arg(long)]
    table: String,

    /// Pub/Sub topic ID the job notifies on completion
    #[arg(long)]
    topic: String,

    /// Pub/Sub subscription ID attached to the topic
    #[arg(long)]
    subscription: String,

    /// Column to compute statistics over
    #[arg(long)]
    column: String,

    /// Seconds to wait for the completion notification
    #[arg(long, default_value = "600")]
    timeout_secs: u64,

    /// Milliseconds to pause after the notification before fetching
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Concurrent subscriber workers
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Override the DLP API endpoint
    #[arg(long)]
    dlp_endpoint: Option<String>,

    /// Override the Pub/Sub API endpoint (e.g. the emulator)
    #[arg(long, env = "PUBSUB_EMULATOR_HOST")]
    pubsub_endpoint: Option<String>,

    /// Use the Compute Engine metadata server instead of GOOGLE_OAUTH_ACCESS_TOKEN
    #[arg(long)]
    metadata_token: bool,
}

async fn run(cli: Cli) -> Result<(), RiskError> {
    let request = NumericalStatsRequest::new(
        &cli.calling_project,
        &cli.table_project,
        &cli.dataset,
        &cli.table,
        &cli.topic,
        &cli.subscription,
        &cli.column,
    )?;

    let token_provider: SharedTokenProvider = if cli.metadata_token {
        Arc::new(MetadataTokenProvider::new())
    } else {
        Arc::new(StaticTokenProvider::from_env()?)
    };

    let mut client_config = ClientConfig::default();
    if let Some(endpoint) = cli.dlp_endpoint {
        client_config = client_config.with_dlp_endpoint(endpoint);
    }
    if let Some(endpoint) = cli.pubsub_endpoint {
        let endpoint = if endpoint.starts_with("http") {
            endpoint
        } else {
            format!("http://{}", endpoint)
        };
        client_config = client_config.with_pubsub_endpoint(endpoint);
    }

    let wait_config = WaitConfig::new()
        .with_timeout(Duration::from_secs(cli.timeout_secs))
        .with_settle_delay(
            cli.settle_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SETTLE_DELAY),
        );

    let analysis = NumericalStatsAnalysis::new(
        Arc::new(HttpDlpServiceClient::new(
            Arc::clone(&token_provider),
            client_config.clone(),
        )?),
        Arc::new(HttpPubsubClient::new(token_provider, client_config)?),
    )
    .with_wait_config(wait_config)
    .with_subscriber_config(SubscriberConfig::new().with_workers(cli.workers));

    analysis.run(&request, &mut std::io::stdout()).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "Numerical stats analysis failed");
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}
