//! Data models for the risk service's API responses.
//!
//! The `*Envelope` and `*Dto` structures mirror the JSON the service emits.
//! Every field is optional on the wire; conversion into the domain types
//! checks presence and ranges and fails with a typed error instead of
//! trusting the payload.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::errors::ClientError;
use crate::risk::{self, RiskTier};

/// Local time format used by popups, the sidebar and the status line.
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Response of `GET /api/earthquakes`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EarthquakeEnvelope {
    /// Error message; non-empty means the request failed server side
    pub error: Option<String>,

    /// "success" or "error"
    pub status: Option<String>,

    /// Human-readable summary accompanying an error
    pub message: Option<String>,

    /// "FeatureCollection" when present
    #[serde(rename = "type")]
    pub type_: Option<String>,

    /// Number of features the service claims to have sent
    pub count: Option<usize>,

    /// ISO8601 generation timestamp
    pub generated: Option<String>,

    /// Earthquake events
    pub features: Option<Vec<FeatureDto>>,
}

/// One earthquake event on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureDto {
    pub id: Option<String>,
    pub geometry: Option<GeometryDto>,
    pub properties: Option<PropertiesDto>,
}

/// Point geometry: `[longitude, latitude, depth_km]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeometryDto {
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

/// Event properties, including the service's risk annotation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertiesDto {
    pub mag: Option<f64>,
    pub place: Option<String>,
    pub depth: Option<f64>,
    /// Event time (ms since epoch)
    pub time: Option<i64>,
    /// Risk probability in [0, 1]
    pub prediction: Option<f64>,
    /// Tier as computed by the service
    pub risk: Option<String>,
}

/// Response of `GET /api/predict`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionEnvelope {
    pub error: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub probability: Option<f64>,
    pub risk: Option<String>,
    pub timestamp: Option<String>,
}

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A validated earthquake event. Lives for one fetch cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeFeature {
    /// Service id, or `#n` (position in the response) when absent
    pub id: String,
    pub longitude: f64,
    pub latitude: f64,
    pub depth_km: f64,
    pub magnitude: f64,
    pub place: String,
    pub time: DateTime<Utc>,
    /// Risk probability in [0, 1]
    pub prediction: f64,
}

impl EarthquakeFeature {
    /// Risk tier of this event.
    #[must_use]
    pub fn tier(&self) -> RiskTier {
        risk::classify(self.prediction)
    }

    /// Event location.
    #[must_use]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// Event time rendered in the local timezone.
    #[must_use]
    pub fn local_time(&self) -> String {
        format_local(self.time)
    }
}

/// A point risk prediction. Lives as long as its temporary marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub latitude: f64,
    pub longitude: f64,
    /// Probability in [0, 1]
    pub probability: f64,
}

impl PredictionResult {
    #[must_use]
    pub fn tier(&self) -> RiskTier {
        risk::classify(self.probability)
    }
}

/// Render a UTC timestamp in the local timezone.
#[must_use]
pub fn format_local(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format(LOCAL_TIME_FORMAT).to_string()
}

/// Return the server-reported error, if the envelope carries one.
fn reported_error(error: Option<String>) -> Result<(), ClientError> {
    match error {
        Some(message) if !message.trim().is_empty() => Err(ClientError::ServerReported(message)),
        _ => Ok(()),
    }
}

fn check_probability(value: f64, what: &str) -> Result<f64, String> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{what} {value} out of range [0, 1]"))
    }
}

fn check_coordinate(value: f64, limit: f64, what: &str) -> Result<f64, String> {
    if value.is_finite() && value.abs() <= limit {
        Ok(value)
    } else {
        Err(format!("{what} {value} out of range [-{limit}, {limit}]"))
    }
}

/// Log when the service's tier disagrees with ours. Ours wins.
fn cross_check_tier(wire: Option<&str>, probability: f64, context: &str) {
    let Some(wire) = wire else { return };
    let local = risk::classify(probability);
    match wire.parse::<RiskTier>() {
        Ok(tier) if tier == local => {}
        Ok(tier) => debug!("{context}: service tier {tier} disagrees with {local}"),
        Err(e) => debug!("{context}: {e}"),
    }
}

impl EarthquakeEnvelope {
    /// Validate the envelope and convert it into domain features.
    ///
    /// # Errors
    ///
    /// `ServerReported` if the envelope carries an error message,
    /// `InvalidResponse` if any feature is incomplete or out of range.
    pub fn into_features(self) -> Result<Vec<EarthquakeFeature>, ClientError> {
        reported_error(self.error)?;

        if let Some(type_) = self.type_.as_deref() {
            if type_ != "FeatureCollection" {
                return Err(ClientError::InvalidResponse(format!(
                    "expected type 'FeatureCollection', got '{type_}'"
                )));
            }
        }

        let features = self
            .features
            .ok_or_else(|| ClientError::InvalidResponse("missing 'features'".into()))?;

        if let Some(count) = self.count {
            if count != features.len() {
                debug!("envelope count {} but {} features", count, features.len());
            }
        }

        features
            .into_iter()
            .enumerate()
            .map(|(index, dto)| {
                dto.into_feature(index)
                    .map_err(|e| ClientError::InvalidResponse(format!("feature {index}: {e}")))
            })
            .collect()
    }
}

impl FeatureDto {
    /// Convert into a validated feature; `index` is the position in the response.
    ///
    /// # Errors
    ///
    /// Returns a description of the first missing or invalid field.
    pub fn into_feature(self, index: usize) -> Result<EarthquakeFeature, String> {
        let geometry = self.geometry.ok_or("missing geometry")?;
        let props = self.properties.ok_or("missing properties")?;

        let &[lon, lat, depth, ..] = geometry.coordinates.as_slice() else {
            return Err(format!(
                "expected 3 coordinates, got {}",
                geometry.coordinates.len()
            ));
        };
        let longitude = check_coordinate(lon, 180.0, "longitude")?;
        let latitude = check_coordinate(lat, 90.0, "latitude")?;

        let magnitude = props.mag.filter(|m| m.is_finite()).ok_or("missing mag")?;
        let place = props.place.ok_or("missing place")?;
        let millis = props.time.ok_or("missing time")?;
        let time = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| format!("time {millis} out of range"))?;
        let prediction = props.prediction.ok_or("missing prediction")?;
        let prediction = check_probability(prediction, "prediction")?;

        let id = self
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("#{index}"));
        cross_check_tier(props.risk.as_deref(), prediction, &id);

        let depth_km = props.depth.filter(|d| d.is_finite()).unwrap_or(depth);

        Ok(EarthquakeFeature {
            id,
            longitude,
            latitude,
            depth_km,
            magnitude,
            place,
            time,
            prediction,
        })
    }
}

impl PredictionEnvelope {
    /// Validate the envelope and convert it into a prediction.
    ///
    /// # Errors
    ///
    /// `ServerReported` if the envelope carries an error message,
    /// `InvalidResponse` if a field is missing or out of range.
    pub fn into_result(self) -> Result<PredictionResult, ClientError> {
        reported_error(self.error)?;

        let invalid = ClientError::InvalidResponse;
        let latitude = self
            .latitude
            .ok_or_else(|| invalid("missing latitude".into()))?;
        let longitude = self
            .longitude
            .ok_or_else(|| invalid("missing longitude".into()))?;
        let probability = self
            .probability
            .ok_or_else(|| invalid("missing probability".into()))?;
        let probability = check_probability(probability, "probability").map_err(invalid)?;

        cross_check_tier(self.risk.as_deref(), probability, "prediction");

        Ok(PredictionResult {
            latitude,
            longitude,
            probability,
        })
    }
}
