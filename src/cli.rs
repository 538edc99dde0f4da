//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Args, Parser, Subcommand};

use quakerisk::client::{DEFAULT_BASE_URL, EarthquakeQuery, PredictionQuery};
use quakerisk::output::Format;

/// Earthquake risk console for your terminal.
#[derive(Parser, Debug)]
#[command(name = "quakerisk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the risk service
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive map console (refresh, click for predictions)
    Console(ConsoleArgs),

    /// List recent earthquakes with their risk (one-shot fetch and exit)
    List(ListArgs),

    /// Predict the risk at a coordinate (one-shot)
    Predict(PredictArgs),
}

/// Filters forwarded to the earthquake endpoint.
#[derive(Args, Debug, Clone, Copy)]
pub struct QuakeFilterArgs {
    /// Look-back window in days (1-90)
    #[arg(long)]
    pub days: Option<u32>,

    /// Minimum magnitude (1-9)
    #[arg(long)]
    pub min_magnitude: Option<f64>,
}

impl From<QuakeFilterArgs> for EarthquakeQuery {
    fn from(args: QuakeFilterArgs) -> Self {
        Self {
            days: args.days,
            min_magnitude: args.min_magnitude,
        }
    }
}

/// Hypothetical event used for point predictions.
#[derive(Args, Debug, Clone, Copy)]
pub struct PredictionEventArgs {
    /// Hypocenter depth in km (service default 10)
    #[arg(long)]
    pub depth: Option<f64>,

    /// Magnitude (service default 4.0)
    #[arg(long)]
    pub mag: Option<f64>,
}

impl From<PredictionEventArgs> for PredictionQuery {
    fn from(args: PredictionEventArgs) -> Self {
        Self {
            depth_km: args.depth,
            magnitude: args.mag,
        }
    }
}

/// Arguments for the `console` command.
#[derive(Parser, Debug)]
pub struct ConsoleArgs {
    #[command(flatten)]
    pub filter: QuakeFilterArgs,

    #[command(flatten)]
    pub event: PredictionEventArgs,

    /// Map width in terminal cells
    #[arg(long, default_value = "72", value_parser = clap::value_parser!(u16).range(16..))]
    pub width: u16,

    /// Number of sidebar entries to show
    #[arg(long, default_value = "15")]
    pub rows: usize,
}

/// Arguments for the `list` command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: QuakeFilterArgs,

    /// Maximum number of events to show
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `predict` command.
#[derive(Parser, Debug)]
pub struct PredictArgs {
    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true, value_parser = parse_latitude)]
    pub lat: f64,

    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true, value_parser = parse_longitude)]
    pub lon: f64,

    #[command(flatten)]
    pub event: PredictionEventArgs,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

fn parse_degrees(s: &str, limit: f64, what: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid {what}: {e}"))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(format!("{what} {value} out of range [-{limit}, {limit}]"));
    }
    Ok(value)
}

/// Parse a latitude in [-90, 90].
fn parse_latitude(s: &str) -> Result<f64, String> {
    parse_degrees(s, 90.0, "latitude")
}

/// Parse a longitude in [-180, 180].
fn parse_longitude(s: &str) -> Result<f64, String> {
    parse_degrees(s, 180.0, "longitude")
}
