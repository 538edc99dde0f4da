//! Map markers and the earthquake marker layer.

use std::fmt::Write as _;

use crate::models::{EarthquakeFeature, LatLng, PredictionResult};
use crate::risk::{self, RiskTier};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Stroke color shared by every marker.
const STROKE_COLOR: &str = "#000";

/// Radius of the transient prediction marker.
const PREDICTION_RADIUS: f64 = 8.0;

/// One labelled line of a popup.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupRow {
    pub label: &'static str,
    pub value: String,
    /// Tier styling applied to the value, if any
    pub tier: Option<RiskTier>,
}

/// Details shown when a marker is selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Popup {
    pub rows: Vec<PopupRow>,
}

impl Popup {
    fn row(mut self, label: &'static str, value: String, tier: Option<RiskTier>) -> Self {
        self.rows.push(PopupRow { label, value, tier });
        self
    }

    /// Popup for an earthquake marker.
    #[must_use]
    pub fn for_feature(feature: &EarthquakeFeature) -> Self {
        Self::default()
            .row("Location", feature.place.clone(), None)
            .row("Magnitude", format!("{:.1}", feature.magnitude), None)
            .row("Depth", format!("{:.1} km", feature.depth_km), None)
            .row("Time", feature.local_time(), None)
            .row(
                "Risk Prediction",
                risk::format_percent(feature.prediction),
                Some(feature.tier()),
            )
    }

    /// Popup for a transient prediction marker.
    #[must_use]
    pub fn for_prediction(prediction: &PredictionResult) -> Self {
        Self::default().row(
            "Predicted risk",
            risk::format_percent(prediction.probability),
            Some(prediction.tier()),
        )
    }

    /// Plain text, one `Label: value` per line.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| format!("{}: {}", row.label, row.value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Terminal rendering with bold labels and tier-colored values.
    #[must_use]
    pub fn to_ansi(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let (style, reset) = match row.tier {
                Some(tier) => (tier.ansi(), RESET),
                None => ("", ""),
            };
            let _ = writeln!(out, "{BOLD}{}:{RESET} {style}{}{reset}", row.label, row.value);
        }
        out
    }
}

/// A circular point marker.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleMarker {
    /// Feature id, or `prediction` for transient markers
    pub id: String,
    pub center: LatLng,
    pub radius: f64,
    pub tier: RiskTier,
    pub fill_color: &'static str,
    pub stroke_color: &'static str,
    pub weight: u32,
    pub fill_opacity: f64,
    pub popup: Popup,
}

impl CircleMarker {
    /// Marker for an earthquake; radius scales linearly with magnitude.
    #[must_use]
    pub fn for_feature(feature: &EarthquakeFeature) -> Self {
        let tier = feature.tier();
        Self {
            id: feature.id.clone(),
            center: feature.position(),
            radius: feature.magnitude * 2.0,
            tier,
            fill_color: tier.color(),
            stroke_color: STROKE_COLOR,
            weight: 1,
            fill_opacity: 0.8,
            popup: Popup::for_feature(feature),
        }
    }

    /// Transient marker for a point prediction at `at`.
    #[must_use]
    pub fn prediction(at: LatLng, prediction: &PredictionResult) -> Self {
        let tier = prediction.tier();
        Self {
            id: "prediction".to_string(),
            center: at,
            radius: PREDICTION_RADIUS,
            tier,
            fill_color: tier.color(),
            stroke_color: STROKE_COLOR,
            weight: 1,
            fill_opacity: 1.0,
            popup: Popup::for_prediction(prediction),
        }
    }
}

/// The earthquake markers drawn on the map.
///
/// Always rebuilt wholesale from one feature snapshot; there is no
/// incremental diffing.
#[derive(Debug, Default)]
pub struct MarkerLayer {
    markers: Vec<CircleMarker>,
}

impl MarkerLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every marker and draw one per feature.
    pub fn replace_all(&mut self, features: &[EarthquakeFeature]) {
        self.markers.clear();
        self.markers
            .extend(features.iter().map(CircleMarker::for_feature));
    }

    /// Marker drawn for the feature with this id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&CircleMarker> {
        self.markers.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn markers(&self) -> &[CircleMarker] {
        &self.markers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
