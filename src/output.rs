//! Output formatters for one-shot commands.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use serde::Serialize;

use crate::models::{EarthquakeFeature, PredictionResult};
use crate::risk::{self, RiskTier};
use crate::sidebar::{SidebarList, SidebarRow};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const ICON_QUAKE: &str = "🌍";
const ICON_PIN: &str = "📍";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Flattened event emitted in JSON/NDJSON output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEvent {
    pub id: String,
    pub time: String,
    pub magnitude: f64,
    pub depth_km: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub place: String,
    pub prediction: f64,
    pub risk: RiskTier,
}

impl From<&EarthquakeFeature> for OutputEvent {
    fn from(f: &EarthquakeFeature) -> Self {
        Self {
            id: f.id.clone(),
            time: f.time.to_rfc3339(),
            magnitude: f.magnitude,
            depth_km: f.depth_km,
            latitude: f.latitude,
            longitude: f.longitude,
            place: f.place.clone(),
            prediction: f.prediction,
            risk: f.tier(),
        }
    }
}

/// Prediction as emitted in JSON/NDJSON output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputPrediction {
    pub latitude: f64,
    pub longitude: f64,
    pub probability: f64,
    pub risk: RiskTier,
}

impl From<&PredictionResult> for OutputPrediction {
    fn from(p: &PredictionResult) -> Self {
        Self {
            latitude: p.latitude,
            longitude: p.longitude,
            probability: p.probability,
            risk: p.tier(),
        }
    }
}

fn json_error(e: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Write sidebar rows in human-readable format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, rows: &[SidebarRow]) -> io::Result<()> {
    for row in rows {
        let color = row.tier.ansi();
        writeln!(
            writer,
            "{ICON_QUAKE} {BOLD}{}{RESET} │ {DIM}{}{RESET} │ {color}{} ({}){RESET}",
            row.title,
            row.local_time,
            row.risk,
            row.tier.as_str().to_uppercase()
        )?;
    }
    Ok(())
}

/// Write events in the specified format, most recent first.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_events<W: Write>(
    writer: &mut W,
    events: &[EarthquakeFeature],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => {
            let mut list = SidebarList::new();
            list.render(events);
            write_human(writer, list.rows())
        }
        Format::Json => {
            let output: Vec<OutputEvent> = events.iter().map(OutputEvent::from).collect();
            let json = serde_json::to_string_pretty(&output).map_err(json_error)?;
            writeln!(writer, "{json}")
        }
        Format::Ndjson => {
            for event in events {
                let json = serde_json::to_string(&OutputEvent::from(event)).map_err(json_error)?;
                writeln!(writer, "{json}")?;
            }
            Ok(())
        }
    }
}

/// Write a point prediction in the specified format.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_prediction<W: Write>(
    writer: &mut W,
    prediction: &PredictionResult,
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => {
            let tier = prediction.tier();
            writeln!(
                writer,
                "{ICON_PIN} Prediction for ({:.2}, {:.2}): {}{} risk ({}){RESET}",
                prediction.latitude,
                prediction.longitude,
                tier.ansi(),
                risk::format_percent(prediction.probability),
                tier.as_str().to_uppercase()
            )
        }
        Format::Json => {
            let json = serde_json::to_string_pretty(&OutputPrediction::from(prediction))
                .map_err(json_error)?;
            writeln!(writer, "{json}")
        }
        Format::Ndjson => {
            let json =
                serde_json::to_string(&OutputPrediction::from(prediction)).map_err(json_error)?;
            writeln!(writer, "{json}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::tests::feature;

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("ndjson".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_ndjson_one_line_per_event() {
        let events = [feature("b", 3.0, 0.2, 1), feature("a", 5.0, 0.8, 0)];
        let mut out = Vec::new();
        write_events(&mut out, &events, Format::Ndjson).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], "b");
        assert_eq!(first["risk"], "low");
    }

    #[test]
    fn test_human_rows() {
        let mut list = SidebarList::new();
        list.render(&[feature("a", 5.0, 0.8, 0)]);
        let mut out = Vec::new();
        write_human(&mut out, list.rows()).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("5.0 - place a"));
        assert!(text.contains("80.0% risk (HIGH)"));
    }

    #[test]
    fn test_prediction_human() {
        let prediction = PredictionResult {
            latitude: 10.0,
            longitude: 20.0,
            probability: 0.5,
        };
        let mut out = Vec::new();
        write_prediction(&mut out, &prediction, Format::Human).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Prediction for (10.00, 20.00):"));
        assert!(text.contains("50.0% risk (MEDIUM)"));
    }
}
