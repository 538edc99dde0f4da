//! QuakeRisk command-line entry point.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::error;

mod cli;

use cli::{Cli, Command};
use quakerisk::client::{HttpDataClient, RiskApi};
use quakerisk::console::{self, ConsoleSurface};
use quakerisk::controller::{AppContext, InteractionController};
use quakerisk::output;

/// Capacity of the operator input channel.
const EVENT_QUEUE: usize = 32;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // One UI thread: every request and redraw runs on this runtime
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let Cli {
        command, base_url, ..
    } = cli;

    let result = runtime.block_on(async move {
        match command {
            Command::Console(args) => cmd_console(&base_url, args).await,
            Command::List(args) => cmd_list(&base_url, args).await,
            Command::Predict(args) => cmd_predict(&base_url, args).await,
        }
    });

    // stdin reads park a blocking thread; don't wait for it
    runtime.shutdown_background();
    result
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the `console` command - interactive map console.
async fn cmd_console(base_url: &str, args: cli::ConsoleArgs) -> Result<()> {
    let client = HttpDataClient::new(base_url)
        .context("failed to create risk service client")?
        .with_earthquake_query(args.filter.into())
        .with_prediction_query(args.event.into());

    tracing::info!("connecting to risk service at {}", client.base_url());

    let surface = ConsoleSurface::new(io::stdout(), usize::from(args.width), args.rows);
    let mut controller = InteractionController::new(client, surface, AppContext::new());

    let (tx, rx) = mpsc::channel(EVENT_QUEUE);
    let input = console::spawn_input(tx);

    controller.run(rx).await;
    input.abort();

    Ok(())
}

/// Execute the `list` command - one-shot fetch of earthquakes with risk.
async fn cmd_list(base_url: &str, args: cli::ListArgs) -> Result<()> {
    let client = HttpDataClient::new(base_url)
        .context("failed to create risk service client")?
        .with_earthquake_query(args.filter.into());

    let mut events = client
        .fetch_earthquakes()
        .await
        .context("failed to load earthquake data")?;

    // Sort by time descending (most recent first)
    events.sort_by(|a, b| b.time.cmp(&a.time));

    // Limit results
    events.truncate(args.limit);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_events(&mut handle, &events, args.format)?;

    Ok(())
}

/// Execute the `predict` command - one-shot point prediction.
async fn cmd_predict(base_url: &str, args: cli::PredictArgs) -> Result<()> {
    let client = HttpDataClient::new(base_url)
        .context("failed to create risk service client")?
        .with_prediction_query(args.event.into());

    let prediction = client
        .fetch_prediction(args.lat, args.lon)
        .await
        .context("failed to fetch risk prediction")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_prediction(&mut handle, &prediction, args.format)?;

    Ok(())
}
