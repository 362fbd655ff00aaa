// Dashboard service - one session: form, current series, charts, modal and notices
use crate::application::form::{FormView, InputForm, ValidationError};
use crate::application::modal::{ChartModal, DismissReason, ModalChart};
use crate::application::notifications::{Notice, NoticeBoard};
use crate::application::render::{ChartBackend, RenderOutput, RenderPipeline, RenderSettings};
use crate::application::source_adapter::{AdapterRegistry, FetchError};
use crate::domain::chart::ChartSpec;
use crate::domain::series::NormalizedSeries;
use crate::domain::slice::{SliceSelection, effective_selection, slice, slicer_options};
use crate::domain::source::{SourceKind, SourceListing, list_sources};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{0} is not supported yet")]
    Unsupported(&'static str),
    #[error("A load is already in progress")]
    Busy,
    #[error("Source changed while {0} data was loading")]
    SourceChanged(&'static str),
    #[error("No data loaded")]
    NothingLoaded,
    #[error("Chart '{0}' not found")]
    ChartNotFound(String),
    #[error("Slice '{0}' is not offered for this data")]
    InvalidSelection(SliceSelection),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub source: SourceKind,
    pub points: usize,
    pub slicer_options: Vec<SliceSelection>,
    pub selection: SliceSelection,
    #[serde(flatten)]
    pub output: RenderOutput,
}

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub default_selection: SliceSelection,
    pub notice_ttl: Duration,
    pub render: RenderSettings,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            default_selection: SliceSelection::All,
            notice_ttl: Duration::from_millis(3000),
            render: RenderSettings::default(),
        }
    }
}

struct Loaded {
    source: SourceKind,
    series: NormalizedSeries,
    options: Vec<SliceSelection>,
    selection: SliceSelection,
    view: DashboardView,
}

struct Session {
    form: InputForm,
    loaded: Option<Loaded>,
    pipeline: RenderPipeline,
    backend: Box<dyn ChartBackend>,
    modal: Option<ModalChart>,
}

impl Session {
    fn close_modal(&mut self, reason: DismissReason) -> bool {
        match self.modal.take() {
            Some(modal) => {
                modal.close(self.backend.as_mut(), reason);
                true
            }
            None => false,
        }
    }

    fn reset(&mut self) {
        self.close_modal(DismissReason::Close);
        self.pipeline.clear(self.backend.as_mut());
        self.loaded = None;
    }

    fn render(
        &mut self,
        source: SourceKind,
        series: NormalizedSeries,
        options: Vec<SliceSelection>,
        selection: SliceSelection,
    ) -> DashboardView {
        let output = self
            .pipeline
            .render(self.backend.as_mut(), slice(&series, selection));
        let view = DashboardView {
            source,
            points: series.len(),
            slicer_options: options.clone(),
            selection,
            output,
        };

        self.loaded = Some(Loaded {
            source,
            series,
            options,
            selection,
            view: view.clone(),
        });
        view
    }
}

/// Holds the in-flight flag for one load and always releases it.
struct LoadGuard<'a>(&'a AtomicBool);

impl<'a> LoadGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LoadGuard(flag))
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DashboardService {
    adapters: AdapterRegistry,
    session: Mutex<Session>,
    loading: AtomicBool,
    notices: NoticeBoard,
    default_selection: SliceSelection,
}

impl DashboardService {
    pub fn new(
        adapters: AdapterRegistry,
        backend: Box<dyn ChartBackend>,
        settings: DashboardSettings,
    ) -> Self {
        Self {
            adapters,
            session: Mutex::new(Session {
                form: InputForm::default(),
                loaded: None,
                pipeline: RenderPipeline::new(settings.render),
                backend,
                modal: None,
            }),
            loading: AtomicBool::new(false),
            notices: NoticeBoard::new(settings.notice_ttl),
            default_selection: settings.default_selection,
        }
    }

    pub fn sources(&self) -> Vec<SourceListing> {
        list_sources()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Rebuild the form for a new source and clear everything rendered for the old one.
    pub async fn select_source(&self, source_id: Option<&str>) -> FormView {
        let mut session = self.session.lock().await;
        session.reset();
        session.form.select(source_id)
    }

    pub async fn form(&self) -> FormView {
        self.session.lock().await.form.view()
    }

    /// Fill the form with `values`, validate, fetch once and render.
    ///
    /// On any failure the previous render stays as it was and one error notice is raised.
    pub async fn load(&self, values: &HashMap<String, String>) -> Result<DashboardView, DashboardError> {
        let Some(_guard) = LoadGuard::acquire(&self.loading) else {
            return Err(DashboardError::Busy);
        };

        let validated = {
            let mut session = self.session.lock().await;
            for (id, value) in values {
                if !session.form.set_value(id, value.as_str()) {
                    tracing::debug!(input = %id, "ignoring value for input not on the form");
                }
            }
            session.form.validate()
        };
        let credentials = validated.map_err(|e| self.report(e.into()))?;

        let source = credentials.source;
        let adapter = self
            .adapters
            .get(source)
            .ok_or_else(|| self.report(DashboardError::Unsupported(source.display_name())))?;

        tracing::info!(source = source.id(), "fetching telemetry");
        let series = adapter
            .fetch(&credentials)
            .await
            .map_err(|e| self.report(e.into()))?;
        tracing::info!(
            source = source.id(),
            fields = series.fields.len(),
            points = series.len(),
            "fetched telemetry"
        );

        let mut session = self.session.lock().await;
        if session.form.source() != Some(source) {
            return Err(self.report(DashboardError::SourceChanged(source.display_name())));
        }

        session.close_modal(DismissReason::Close);
        let options = slicer_options(series.len());
        let selection = effective_selection(self.default_selection, &options);
        Ok(session.render(source, series, options, selection))
    }

    /// Re-render the current series with another window.
    pub async fn select_slice(&self, selection: SliceSelection) -> Result<DashboardView, DashboardError> {
        let mut session = self.session.lock().await;
        let loaded = session.loaded.take().ok_or(DashboardError::NothingLoaded)?;

        if !loaded.options.contains(&selection) {
            session.loaded = Some(loaded);
            return Err(DashboardError::InvalidSelection(selection));
        }

        Ok(session.render(loaded.source, loaded.series, loaded.options, selection))
    }

    pub async fn current(&self) -> Option<DashboardView> {
        let session = self.session.lock().await;
        session.loaded.as_ref().map(|l| l.view.clone())
    }

    pub async fn open_modal(&self, chart_id: &str) -> Result<ChartSpec, DashboardError> {
        let mut session = self.session.lock().await;
        let spec = session
            .pipeline
            .charts()
            .get(chart_id)
            .cloned()
            .ok_or_else(|| DashboardError::ChartNotFound(chart_id.to_string()))?;

        session.close_modal(DismissReason::Close);
        let modal = ChartModal::open(session.backend.as_mut(), &spec);
        let opened = modal.spec().clone();
        session.modal = Some(modal);
        Ok(opened)
    }

    /// Returns false when no modal was open.
    pub async fn close_modal(&self, reason: DismissReason) -> bool {
        self.session.lock().await.close_modal(reason)
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.active()
    }

    fn report(&self, err: DashboardError) -> DashboardError {
        self.notices.error(err.to_string());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::form::Credentials;
    use crate::application::source_adapter::SourceAdapter;
    use crate::domain::series::{Field, Point, RawValue};
    use crate::infrastructure::canvas::Canvas;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    struct ScriptedAdapter {
        kind: SourceKind,
        calls: AtomicUsize,
        responses: StdMutex<Vec<Result<NormalizedSeries, FetchError>>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedAdapter {
        fn new(kind: SourceKind, responses: Vec<Result<NormalizedSeries, FetchError>>) -> Self {
            Self {
                kind,
                calls: AtomicUsize::new(0),
                responses: StdMutex::new(responses.into_iter().rev().collect()),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for ScriptedAdapter {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch(&self, _credentials: &Credentials) -> Result<NormalizedSeries, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop()
                .expect("no scripted response left")
        }
    }

    fn series(len: usize) -> NormalizedSeries {
        let labels = (0..len).map(|i| format!("t{i}")).collect();
        let points = (0..len)
            .map(|i| {
                let mut p = Point::new();
                p.insert("field1".into(), RawValue::from(i as f64));
                p
            })
            .collect();
        NormalizedSeries::new("Channel", vec![Field::new("field1", "Temperature")], labels, points)
    }

    fn not_found() -> FetchError {
        FetchError::Status {
            source_name: "ThingSpeak",
            status: 404,
        }
    }

    fn channel_values() -> HashMap<String, String> {
        HashMap::from([("channelId".to_string(), "357142".to_string())])
    }

    fn service(adapter: Arc<ScriptedAdapter>, canvas: &Canvas, settings: DashboardSettings) -> DashboardService {
        DashboardService::new(
            AdapterRegistry::new().register(adapter),
            Box::new(canvas.clone()),
            settings,
        )
    }

    #[tokio::test]
    async fn test_blank_field_never_fetches() {
        let adapter = Arc::new(ScriptedAdapter::new(SourceKind::ThingSpeak, vec![]));
        let svc = service(adapter.clone(), &Canvas::new(), DashboardSettings::default());

        svc.select_source(Some("thingspeak")).await;
        let values = HashMap::from([("channelId".to_string(), "  ".to_string())]);
        let err = svc.load(&values).await.unwrap_err();

        assert!(matches!(err, DashboardError::Validation(_)));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
        let notices = svc.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("Channel ID e.g. 357142"));
        assert!(!svc.is_loading());
    }

    #[tokio::test]
    async fn test_load_renders_and_defaults_to_all() {
        let adapter = Arc::new(ScriptedAdapter::new(SourceKind::ThingSpeak, vec![Ok(series(12))]));
        let canvas = Canvas::new();
        let svc = service(adapter, &canvas, DashboardSettings::default());

        svc.select_source(Some("thingspeak")).await;
        let view = svc.load(&channel_values()).await.unwrap();

        assert_eq!(view.selection, SliceSelection::All);
        assert_eq!(
            view.slicer_options,
            vec![SliceSelection::Last(2), SliceSelection::Last(10), SliceSelection::All]
        );
        assert_eq!(view.output.table.rows.len(), 12);
        assert_eq!(canvas.live_chart_ids(), vec!["combined", "field-field1"]);
        assert_eq!(svc.current().await, Some(view));
    }

    #[tokio::test]
    async fn test_configured_trailing_window_default() {
        let adapter = Arc::new(ScriptedAdapter::new(
            SourceKind::ThingSpeak,
            vec![Ok(series(25)), Ok(series(5))],
        ));
        let settings = DashboardSettings {
            default_selection: SliceSelection::Last(20),
            ..DashboardSettings::default()
        };
        let svc = service(adapter, &Canvas::new(), settings);

        svc.select_source(Some("thingspeak")).await;
        let view = svc.load(&channel_values()).await.unwrap();
        assert_eq!(view.selection, SliceSelection::Last(20));
        assert_eq!(view.output.table.rows.len(), 20);
        assert_eq!(view.points, 25);

        // too short for the configured window
        let view = svc.load(&channel_values()).await.unwrap();
        assert_eq!(view.selection, SliceSelection::All);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_render() {
        let adapter = Arc::new(ScriptedAdapter::new(
            SourceKind::ThingSpeak,
            vec![Ok(series(3)), Err(not_found())],
        ));
        let canvas = Canvas::new();
        let svc = service(adapter, &canvas, DashboardSettings::default());

        svc.select_source(Some("thingspeak")).await;
        let before = svc.load(&channel_values()).await.unwrap();
        let live_before = canvas.live_chart_ids();

        let err = svc.load(&channel_values()).await.unwrap_err();
        assert_eq!(err.to_string(), "ThingSpeak fetch failed: HTTP 404");

        assert_eq!(svc.current().await, Some(before));
        assert_eq!(canvas.live_chart_ids(), live_before);
        let notices = svc.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "ThingSpeak fetch failed: HTTP 404");
        assert!(!svc.is_loading());
    }

    #[tokio::test]
    async fn test_second_load_while_in_flight_is_rejected() {
        let gate = Arc::new(Notify::new());
        let mut scripted = ScriptedAdapter::new(SourceKind::ThingSpeak, vec![Ok(series(3))]);
        scripted.gate = Some(gate.clone());
        let adapter = Arc::new(scripted);
        let svc = Arc::new(service(adapter.clone(), &Canvas::new(), DashboardSettings::default()));

        svc.select_source(Some("thingspeak")).await;
        let first = tokio::spawn({
            let svc = svc.clone();
            async move { svc.load(&channel_values()).await }
        });

        while adapter.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(svc.is_loading());
        assert!(matches!(
            svc.load(&channel_values()).await,
            Err(DashboardError::Busy)
        ));

        gate.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert!(!svc.is_loading());
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_source_switched_mid_fetch_discards_result() {
        let gate = Arc::new(Notify::new());
        let mut scripted = ScriptedAdapter::new(SourceKind::ThingSpeak, vec![Ok(series(3))]);
        scripted.gate = Some(gate.clone());
        let adapter = Arc::new(scripted);
        let canvas = Canvas::new();
        let svc = Arc::new(service(adapter.clone(), &canvas, DashboardSettings::default()));

        svc.select_source(Some("thingspeak")).await;
        let first = tokio::spawn({
            let svc = svc.clone();
            async move { svc.load(&channel_values()).await }
        });

        while adapter.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        let form = svc.select_source(Some("blynk")).await;
        assert_eq!(form.source, Some(SourceKind::Blynk));

        gate.notify_one();
        assert!(matches!(
            first.await.unwrap(),
            Err(DashboardError::SourceChanged("ThingSpeak"))
        ));

        assert_eq!(svc.current().await, None);
        assert_eq!(canvas.live_count(), 0);
        let notices = svc.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "Source changed while ThingSpeak data was loading");
        assert!(!svc.is_loading());
    }

    #[tokio::test]
    async fn test_slice_change_rerenders_without_leaking() {
        let adapter = Arc::new(ScriptedAdapter::new(SourceKind::ThingSpeak, vec![Ok(series(12))]));
        let canvas = Canvas::new();
        let svc = service(adapter, &canvas, DashboardSettings::default());

        svc.select_source(Some("thingspeak")).await;
        svc.load(&channel_values()).await.unwrap();
        let view = svc.select_slice(SliceSelection::Last(10)).await.unwrap();

        assert_eq!(view.output.table.rows.len(), 10);
        assert_eq!(view.output.table.rows[0].time, "t2");
        assert_eq!(canvas.live_count(), 2);
        assert_eq!(canvas.disposed_count(), 2);

        assert!(matches!(
            svc.select_slice(SliceSelection::Last(50)).await,
            Err(DashboardError::InvalidSelection(_))
        ));
        assert_eq!(svc.current().await.unwrap().selection, SliceSelection::Last(10));
    }

    #[tokio::test]
    async fn test_unsupported_source() {
        let adapter = Arc::new(ScriptedAdapter::new(SourceKind::ThingSpeak, vec![]));
        let svc = service(adapter, &Canvas::new(), DashboardSettings::default());

        svc.select_source(Some("mqtt")).await;
        let values = HashMap::from([
            ("broker".to_string(), "broker.local".to_string()),
            ("port".to_string(), "1883".to_string()),
            ("topic".to_string(), "sensors/#".to_string()),
        ]);
        let err = svc.load(&values).await.unwrap_err();
        assert!(matches!(err, DashboardError::Unsupported("MQTT Bridge")));
        assert_eq!(svc.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_modal_lifecycle_and_source_reset() {
        let adapter = Arc::new(ScriptedAdapter::new(SourceKind::ThingSpeak, vec![Ok(series(3))]));
        let canvas = Canvas::new();
        let svc = service(adapter, &canvas, DashboardSettings::default());

        svc.select_source(Some("thingspeak")).await;
        svc.load(&channel_values()).await.unwrap();

        let spec = svc.open_modal("field-field1").await.unwrap();
        assert!(!spec.options.maintain_aspect_ratio);
        assert_eq!(canvas.live_count(), 3);

        // reopening replaces the previous modal chart
        svc.open_modal("combined").await.unwrap();
        assert_eq!(canvas.live_count(), 3);

        assert!(svc.close_modal(DismissReason::Overlay).await);
        assert!(!svc.close_modal(DismissReason::Overlay).await);
        assert_eq!(canvas.live_count(), 2);

        assert!(matches!(
            svc.open_modal("field-missing").await,
            Err(DashboardError::ChartNotFound(_))
        ));

        let form = svc.select_source(Some("blynk")).await;
        assert_eq!(form.inputs.len(), 2);
        assert_eq!(canvas.live_count(), 0);
        assert_eq!(svc.current().await, None);
    }
}
