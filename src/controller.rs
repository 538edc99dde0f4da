//! Interaction controller: turns operator gestures into service calls and
//! view updates.
//!
//! All state lives in one [`AppContext`] built at startup. Requests are
//! spawned onto a [`JoinSet`] so input keeps flowing while they are in
//! flight; completions are applied in the order they resolve, so of two
//! racing refreshes the later-resolving one wins.

use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::client::RiskApi;
use crate::errors::ClientError;
use crate::map::MapView;
use crate::markers::{CircleMarker, MarkerLayer, Popup};
use crate::models::{EarthquakeFeature, LOCAL_TIME_FORMAT, LatLng, PredictionResult};
use crate::risk::{self, RiskTier};
use crate::sidebar::SidebarList;

/// How long a prediction marker stays on the map.
pub const PREDICTION_MARKER_TTL: Duration = Duration::from_millis(5000);

/// Alert shown when the earthquake list cannot be loaded.
pub const LOAD_FAILED: &str = "Failed to load earthquake data";

/// Alert shown when a point prediction cannot be fetched.
pub const PREDICTION_FAILED: &str = "Failed to fetch risk prediction";

/// Operator gestures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiEvent {
    /// Refresh button (also sent once at startup)
    Refresh,
    /// Click on the map canvas
    MapClick { lat: f64, lon: f64 },
    /// Open the popup of the n-th sidebar entry (0-based)
    SelectRow(usize),
    /// Leave the console
    Quit,
}

/// Where the controller reports to the operator.
pub trait Surface {
    /// Blocking notification, e.g. a failed request.
    fn alert(&mut self, message: &str);

    /// Redraw from the current state.
    fn redraw(&mut self, ctx: &AppContext);
}

/// Text of the prediction result panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionPanel {
    pub text: String,
    pub tier: RiskTier,
}

impl PredictionPanel {
    fn from_result(result: &PredictionResult) -> Self {
        Self {
            text: format!(
                "Prediction for ({:.2}, {:.2}): {} risk",
                result.latitude,
                result.longitude,
                risk::format_percent(result.probability)
            ),
            tier: result.tier(),
        }
    }
}

/// Everything the console shows.
#[derive(Debug, Default)]
pub struct AppContext {
    pub map: MapView,
    pub markers: MarkerLayer,
    pub sidebar: SidebarList,
    /// `Last updated: ...` once a refresh succeeded
    pub last_updated: Option<String>,
    pub prediction: Option<PredictionPanel>,
    /// Feature whose popup is open
    pub selected: Option<String>,
}

impl AppContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild markers and sidebar from one snapshot.
    fn show_earthquakes(&mut self, features: &[EarthquakeFeature]) {
        self.last_updated = Some(format!(
            "Last updated: {}",
            Local::now().format(LOCAL_TIME_FORMAT)
        ));
        self.markers.replace_all(features);
        self.sidebar.render(features);
    }

    /// Popup of the selected feature, if it is still on the map.
    #[must_use]
    pub fn selected_popup(&self) -> Option<&Popup> {
        let id = self.selected.as_deref()?;
        self.markers.find(id).map(|m| &m.popup)
    }

    fn select_row(&mut self, index: usize) {
        self.selected = self.sidebar.rows().get(index).map(|row| row.id.clone());
    }

    fn show_prediction(&mut self, at: LatLng, result: &PredictionResult) {
        self.prediction = Some(PredictionPanel::from_result(result));
        let marker = CircleMarker::prediction(at, result);
        self.map
            .add_temporary(marker, Instant::now() + PREDICTION_MARKER_TTL);
    }
}

/// A finished request.
#[derive(Debug)]
pub enum Completion {
    Earthquakes(Result<Vec<EarthquakeFeature>, ClientError>),
    Prediction {
        at: LatLng,
        result: Result<PredictionResult, ClientError>,
    },
}

/// Wires gestures to the data client and the views.
pub struct InteractionController<A: RiskApi, S: Surface> {
    api: A,
    surface: S,
    ctx: AppContext,
    inflight: JoinSet<Completion>,
}

impl<A: RiskApi, S: Surface> InteractionController<A, S> {
    pub fn new(api: A, surface: S, ctx: AppContext) -> Self {
        Self {
            api,
            surface,
            ctx,
            inflight: JoinSet::new(),
        }
    }

    #[must_use]
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Start the request a gesture asks for.
    pub fn dispatch(&mut self, event: UiEvent) {
        match event {
            UiEvent::Refresh => {
                debug!("refresh requested");
                let api = self.api.clone();
                self.inflight
                    .spawn(async move { Completion::Earthquakes(api.fetch_earthquakes().await) });
            }
            UiEvent::MapClick { lat, lon } => {
                let Some(at) = self.ctx.map.click(lat, lon) else {
                    debug!("click at ({lat}, {lon}) outside the map, ignored");
                    return;
                };
                let api = self.api.clone();
                self.inflight.spawn(async move {
                    let result = api.fetch_prediction(at.lat, at.lon).await;
                    Completion::Prediction { at, result }
                });
            }
            UiEvent::SelectRow(index) => self.ctx.select_row(index),
            UiEvent::Quit => {}
        }
    }

    /// Apply a finished request to the views.
    pub fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::Earthquakes(Ok(features)) => {
                info!("loaded {} earthquakes", features.len());
                self.ctx.show_earthquakes(&features);
            }
            Completion::Earthquakes(Err(e)) => {
                error!("error loading earthquake data: {e}");
                self.surface.alert(&e.user_message(LOAD_FAILED));
            }
            Completion::Prediction { at, result: Ok(result) } => {
                debug!(
                    "prediction at ({}, {}): {:.3}",
                    at.lat, at.lon, result.probability
                );
                self.ctx.show_prediction(at, &result);
            }
            Completion::Prediction { at, result: Err(e) } => {
                warn!("prediction at ({}, {}) failed: {e}", at.lat, at.lon);
                self.surface.alert(&e.user_message(PREDICTION_FAILED));
            }
        }
    }

    /// Remove prediction markers whose time is up.
    pub fn expire_markers(&mut self) {
        let removed = self.ctx.map.expire_due(Instant::now());
        if removed > 0 {
            debug!("removed {removed} prediction marker(s)");
        }
    }

    /// Event loop. Performs the initial load, then handles gestures,
    /// completions and marker expiry until `Quit` or the channel closes.
    pub async fn run(&mut self, mut events: mpsc::Receiver<UiEvent>) {
        self.dispatch(UiEvent::Refresh);
        self.surface.redraw(&self.ctx);

        loop {
            let deadline = self.ctx.map.next_deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(UiEvent::Quit) | None => break,
                    Some(event) => self.dispatch(event),
                },
                Some(joined) = self.inflight.join_next(), if !self.inflight.is_empty() => {
                    match joined {
                        Ok(completion) => self.complete(completion),
                        Err(e) => warn!("request task failed: {e}"),
                    }
                }
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.expire_markers();
                }
            }

            self.surface.redraw(&self.ctx);
        }

        events.close();
        self.shutdown();
    }

    /// Abort in-flight requests and cancel pending marker removals.
    pub fn shutdown(&mut self) {
        let pending = self.inflight.len();
        self.inflight.abort_all();
        self.ctx.map.clear_temporary();
        info!("console stopped ({pending} request(s) abandoned)");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::markers::tests::feature;

    type Scripted<T> = Arc<Mutex<VecDeque<(Duration, Result<T, ClientError>)>>>;

    /// Scripted service: each call pops the next reply and delivers it
    /// after its delay.
    #[derive(Clone, Default)]
    struct FakeApi {
        quakes: Scripted<Vec<EarthquakeFeature>>,
        predictions: Scripted<PredictionResult>,
    }

    impl FakeApi {
        fn quakes(&self, delay_ms: u64, reply: Result<Vec<EarthquakeFeature>, ClientError>) {
            self.quakes
                .lock()
                .unwrap()
                .push_back((Duration::from_millis(delay_ms), reply));
        }

        fn prediction(&self, reply: Result<PredictionResult, ClientError>) {
            self.predictions
                .lock()
                .unwrap()
                .push_back((Duration::ZERO, reply));
        }
    }

    impl RiskApi for FakeApi {
        fn fetch_earthquakes(
            &self,
        ) -> impl Future<Output = Result<Vec<EarthquakeFeature>, ClientError>> + Send {
            let next = self.quakes.lock().unwrap().pop_front();
            async move {
                let (delay, reply) = next.expect("unexpected earthquake request");
                tokio::time::sleep(delay).await;
                reply
            }
        }

        fn fetch_prediction(
            &self,
            _lat: f64,
            _lon: f64,
        ) -> impl Future<Output = Result<PredictionResult, ClientError>> + Send {
            let next = self.predictions.lock().unwrap().pop_front();
            async move {
                let (delay, reply) = next.expect("unexpected prediction request");
                tokio::time::sleep(delay).await;
                reply
            }
        }
    }

    /// What a redraw saw.
    #[derive(Debug, Clone)]
    struct Frame {
        at: Instant,
        temporary: usize,
        panel: Option<String>,
    }

    #[derive(Clone, Default)]
    struct RecordingSurface {
        alerts: Arc<Mutex<Vec<String>>>,
        frames: Arc<Mutex<Vec<Frame>>>,
    }

    impl Surface for RecordingSurface {
        fn alert(&mut self, message: &str) {
            self.alerts.lock().unwrap().push(message.to_string());
        }

        fn redraw(&mut self, ctx: &AppContext) {
            self.frames.lock().unwrap().push(Frame {
                at: Instant::now(),
                temporary: ctx.map.temporary_markers().count(),
                panel: ctx.prediction.as_ref().map(|p| p.text.clone()),
            });
        }
    }

    fn controller() -> (
        InteractionController<FakeApi, RecordingSurface>,
        FakeApi,
        RecordingSurface,
    ) {
        let api = FakeApi::default();
        let surface = RecordingSurface::default();
        let ctrl = InteractionController::new(api.clone(), surface.clone(), AppContext::new());
        (ctrl, api, surface)
    }

    async fn settle(ctrl: &mut InteractionController<FakeApi, RecordingSurface>) {
        while let Some(joined) = ctrl.inflight.join_next().await {
            ctrl.complete(joined.unwrap());
        }
    }

    fn prediction(p: f64) -> PredictionResult {
        PredictionResult {
            latitude: 10.0,
            longitude: 20.0,
            probability: p,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_populates_views() {
        let (mut ctrl, api, surface) = controller();
        api.quakes(0, Ok(vec![feature("a", 5.0, 0.8, 1000)]));

        ctrl.dispatch(UiEvent::Refresh);
        settle(&mut ctrl).await;

        let ctx = ctrl.context();
        let marker = &ctx.markers.markers()[0];
        assert!((marker.radius - 10.0).abs() < f64::EPSILON);
        assert_eq!(marker.fill_color, RiskTier::High.color());

        let row = &ctx.sidebar.rows()[0];
        assert_eq!(row.title, "5.0 - place a");
        assert_eq!(row.risk, "80.0% risk");

        assert!(
            ctx.last_updated
                .as_deref()
                .is_some_and(|s| s.starts_with("Last updated: "))
        );
        assert!(surface.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_row_opens_popup() {
        let (mut ctrl, api, _surface) = controller();
        api.quakes(0, Ok(vec![feature("old", 3.0, 0.1, 1), feature("new", 6.0, 0.9, 2)]));
        api.quakes(0, Ok(vec![feature("other", 3.0, 0.1, 3)]));

        ctrl.dispatch(UiEvent::Refresh);
        settle(&mut ctrl).await;
        ctrl.dispatch(UiEvent::SelectRow(0));

        let popup = ctrl.context().selected_popup().unwrap().to_text();
        assert!(popup.contains("Location: place new"));
        assert!(popup.contains("Risk Prediction: 90.0%"));

        ctrl.dispatch(UiEvent::SelectRow(7));
        assert!(ctrl.context().selected_popup().is_none());

        ctrl.dispatch(UiEvent::SelectRow(1));
        ctrl.dispatch(UiEvent::Refresh);
        settle(&mut ctrl).await;
        assert!(ctrl.context().selected_popup().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_on_first_load() {
        let (mut ctrl, api, surface) = controller();
        api.quakes(0, Err(ClientError::ServerReported("db down".into())));

        ctrl.dispatch(UiEvent::Refresh);
        settle(&mut ctrl).await;

        assert_eq!(*surface.alerts.lock().unwrap(), vec!["db down".to_string()]);
        assert!(ctrl.context().markers.is_empty());
        assert!(ctrl.context().sidebar.is_empty());
        assert!(ctrl.context().last_updated.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_prior_state() {
        let (mut ctrl, api, surface) = controller();
        api.quakes(0, Ok(vec![feature("a", 4.0, 0.2, 1), feature("b", 4.0, 0.2, 2)]));
        api.quakes(
            0,
            Err(ClientError::InvalidResponse("feature 0: missing mag".into())),
        );

        ctrl.dispatch(UiEvent::Refresh);
        settle(&mut ctrl).await;
        let updated = ctrl.context().last_updated.clone();

        ctrl.dispatch(UiEvent::Refresh);
        settle(&mut ctrl).await;

        assert_eq!(*surface.alerts.lock().unwrap(), vec![LOAD_FAILED.to_string()]);
        assert_eq!(ctrl.context().markers.len(), 2);
        assert_eq!(ctrl.context().sidebar.len(), 2);
        assert_eq!(ctrl.context().last_updated, updated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_resolving_refresh_wins() {
        let (mut ctrl, api, _surface) = controller();
        api.quakes(
            2000,
            Ok(vec![
                feature("slow-1", 3.0, 0.1, 1),
                feature("slow-2", 3.0, 0.1, 2),
                feature("slow-3", 3.0, 0.1, 3),
            ]),
        );
        api.quakes(1000, Ok(vec![feature("fast", 3.0, 0.1, 4)]));

        ctrl.dispatch(UiEvent::Refresh);
        ctrl.dispatch(UiEvent::Refresh);
        settle(&mut ctrl).await;

        assert_eq!(ctrl.context().markers.len(), 3);
        assert_eq!(ctrl.context().sidebar.rows()[0].id, "slow-3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_click_shows_prediction_then_expires() {
        let (mut ctrl, api, _surface) = controller();
        api.prediction(Ok(prediction(0.5)));

        ctrl.dispatch(UiEvent::MapClick {
            lat: 10.0,
            lon: 20.0,
        });
        settle(&mut ctrl).await;

        let panel = ctrl.context().prediction.clone().unwrap();
        assert_eq!(panel.text, "Prediction for (10.00, 20.00): 50.0% risk");
        assert_eq!(panel.tier, RiskTier::Medium);

        let marker = ctrl.context().map.temporary_markers().next().unwrap().clone();
        assert_eq!(marker.fill_color, RiskTier::Medium.color());
        assert_eq!(marker.center, LatLng::new(10.0, 20.0));

        tokio::time::advance(Duration::from_millis(4999)).await;
        ctrl.expire_markers();
        assert_eq!(ctrl.context().map.temporary_markers().count(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        ctrl.expire_markers();
        assert_eq!(ctrl.context().map.temporary_markers().count(), 0);
        // the panel text stays until the next prediction
        assert!(ctrl.context().prediction.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_prediction_failure_is_surfaced() {
        let (mut ctrl, api, surface) = controller();
        api.prediction(Err(ClientError::ServerReported("Prediction unavailable".into())));
        api.prediction(Err(ClientError::Api {
            status: 502,
            message: String::new(),
        }));

        ctrl.dispatch(UiEvent::MapClick { lat: 1.0, lon: 2.0 });
        settle(&mut ctrl).await;
        ctrl.dispatch(UiEvent::MapClick { lat: 1.0, lon: 2.0 });
        settle(&mut ctrl).await;

        assert_eq!(
            *surface.alerts.lock().unwrap(),
            vec![
                "Prediction unavailable".to_string(),
                PREDICTION_FAILED.to_string()
            ]
        );
        assert_eq!(ctrl.context().map.temporary_markers().count(), 0);
        assert!(ctrl.context().prediction.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_outside_map_is_ignored() {
        let (mut ctrl, _api, _surface) = controller();
        ctrl.dispatch(UiEvent::MapClick {
            lat: 120.0,
            lon: 0.0,
        });
        assert!(ctrl.inflight.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_expires_marker_after_five_seconds() {
        let (mut ctrl, api, surface) = controller();
        api.quakes(0, Ok(vec![feature("a", 5.0, 0.8, 0)]));
        api.prediction(Ok(prediction(0.9)));

        let (tx, rx) = mpsc::channel(8);
        let start = Instant::now();

        let driver = async move {
            tx.send(UiEvent::MapClick {
                lat: 10.0,
                lon: 20.0,
            })
            .await
            .unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            tx.send(UiEvent::Quit).await.unwrap();
        };
        tokio::join!(ctrl.run(rx), driver);

        let frames = surface.frames.lock().unwrap().clone();
        let shown = frames.iter().find(|f| f.temporary == 1).unwrap();
        assert_eq!(
            shown.panel.as_deref(),
            Some("Prediction for (10.00, 20.00): 90.0% risk")
        );

        let removed = frames
            .iter()
            .skip_while(|f| f.temporary == 0)
            .find(|f| f.temporary == 0)
            .unwrap();
        let elapsed = removed.at - start;
        assert!(elapsed >= PREDICTION_MARKER_TTL);
        assert!(elapsed < PREDICTION_MARKER_TTL + Duration::from_millis(10));

        assert_eq!(ctrl.context().markers.len(), 1);
        assert_eq!(ctrl.context().map.temporary_markers().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_work() {
        let (mut ctrl, api, _surface) = controller();
        api.quakes(60_000, Ok(vec![feature("late", 3.0, 0.1, 0)]));
        api.prediction(Ok(prediction(0.2)));

        ctrl.dispatch(UiEvent::MapClick { lat: 0.0, lon: 0.0 });
        settle(&mut ctrl).await;
        ctrl.dispatch(UiEvent::Refresh);

        ctrl.shutdown();
        assert_eq!(ctrl.context().map.temporary_markers().count(), 0);
        assert_eq!(ctrl.context().map.next_deadline(), None);
        while let Some(joined) = ctrl.inflight.join_next().await {
            assert!(joined.unwrap_err().is_cancelled());
        }
        assert!(ctrl.context().markers.is_empty());
    }
}
