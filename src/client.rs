//! Risk service API client.
//!
//! Provides async HTTP access to the two read endpoints of the risk service.
//! Uses reqwest with rustls for TLS. No retries and no caching: each call is
//! a single request against the network stack's defaults.

use std::future::Future;

use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use crate::errors::ClientError;
use crate::models::{EarthquakeEnvelope, EarthquakeFeature, PredictionEnvelope, PredictionResult};

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakerisk/", env!("CARGO_PKG_VERSION"));

/// Default base URL of the risk service.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Path of the earthquake list endpoint.
pub const EARTHQUAKES_PATH: &str = "/api/earthquakes";

/// Path of the point prediction endpoint.
pub const PREDICT_PATH: &str = "/api/predict";

/// Range of look-back days the service accepts.
const DAYS_RANGE: (u32, u32) = (1, 90);

/// Range of minimum magnitudes the service accepts.
const MIN_MAG_RANGE: (f64, f64) = (1.0, 9.0);

/// Optional filters for the earthquake list.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EarthquakeQuery {
    /// Look-back window in days (service default 30)
    pub days: Option<u32>,
    /// Minimum magnitude (service default 2.5)
    pub min_magnitude: Option<f64>,
}

impl EarthquakeQuery {
    /// Query parameters, clamped to what the service accepts.
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if let Some(days) = self.days {
            let clamped = days.clamp(DAYS_RANGE.0, DAYS_RANGE.1);
            if clamped != days {
                warn!("days clamped from {} to {}", days, clamped);
            }
            params.push(("days", clamped.to_string()));
        }

        if let Some(min_mag) = self.min_magnitude {
            let clamped = min_mag.clamp(MIN_MAG_RANGE.0, MIN_MAG_RANGE.1);
            if (clamped - min_mag).abs() > f64::EPSILON {
                warn!("min magnitude clamped from {} to {}", min_mag, clamped);
            }
            params.push(("min_mag", clamped.to_string()));
        }

        params
    }
}

/// Optional hypothetical-event parameters for a point prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PredictionQuery {
    /// Hypocenter depth (service default 10 km)
    pub depth_km: Option<f64>,
    /// Magnitude (service default 4.0)
    pub magnitude: Option<f64>,
}

/// Read operations against the risk service.
///
/// Futures are `Send` so requests can be spawned while the console keeps
/// handling input.
pub trait RiskApi: Clone + Send + Sync + 'static {
    /// List current earthquakes with their risk predictions.
    fn fetch_earthquakes(
        &self,
    ) -> impl Future<Output = Result<Vec<EarthquakeFeature>, ClientError>> + Send;

    /// Predict the risk at a coordinate.
    fn fetch_prediction(
        &self,
        lat: f64,
        lon: f64,
    ) -> impl Future<Output = Result<PredictionResult, ClientError>> + Send;
}

/// HTTP client for the risk service.
#[derive(Debug, Clone)]
pub struct HttpDataClient {
    client: Client,
    base_url: String,
    quake_query: EarthquakeQuery,
    prediction_query: PredictionQuery,
}

impl HttpDataClient {
    /// Create a new client against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            quake_query: EarthquakeQuery::default(),
            prediction_query: PredictionQuery::default(),
        })
    }

    /// Filters sent with every earthquake list request.
    #[must_use]
    pub fn with_earthquake_query(mut self, query: EarthquakeQuery) -> Self {
        self.quake_query = query;
        self
    }

    /// Event parameters sent with every prediction request.
    #[must_use]
    pub fn with_prediction_query(mut self, query: PredictionQuery) -> Self {
        self.prediction_query = query;
        self
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the JSON body.
    ///
    /// The service answers failures with a 4xx/5xx status *and* an error
    /// envelope, so the body is decoded before the status is judged.
    async fn get_json<T>(&self, path: &str, params: &[(&str, String)]) -> Result<T, ClientError>
    where
        T: serde::de::DeserializeOwned + HasError,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("fetching {} {:?}", url, params);

        let response = self.client.get(&url).query(params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        match serde_json::from_str::<T>(&body) {
            Ok(envelope) if envelope.has_error() => Ok(envelope),
            _ => Err(api_error(status, body)),
        }
    }
}

fn api_error(status: StatusCode, body: String) -> ClientError {
    ClientError::Api {
        status: status.as_u16(),
        message: body,
    }
}

/// Envelopes that may carry a server-reported error.
trait HasError {
    fn has_error(&self) -> bool;
}

impl HasError for EarthquakeEnvelope {
    fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}

impl HasError for PredictionEnvelope {
    fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}

impl RiskApi for HttpDataClient {
    #[instrument(skip(self))]
    async fn fetch_earthquakes(&self) -> Result<Vec<EarthquakeFeature>, ClientError> {
        let envelope: EarthquakeEnvelope = self
            .get_json(EARTHQUAKES_PATH, &self.quake_query.params())
            .await?;

        let features = envelope.into_features()?;
        debug!("fetched {} events", features.len());
        Ok(features)
    }

    #[instrument(skip(self))]
    async fn fetch_prediction(&self, lat: f64, lon: f64) -> Result<PredictionResult, ClientError> {
        let mut params = vec![("lat", lat.to_string()), ("lon", lon.to_string())];
        if let Some(depth) = self.prediction_query.depth_km {
            params.push(("depth", depth.to_string()));
        }
        if let Some(mag) = self.prediction_query.magnitude {
            params.push(("mag", mag.to_string()));
        }

        let envelope: PredictionEnvelope = self.get_json(PREDICT_PATH, &params).await?;
        let result = envelope.into_result()?;
        debug!("probability {:.3}", result.probability);
        Ok(result)
    }
}
