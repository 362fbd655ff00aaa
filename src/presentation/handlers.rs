// HTTP request handlers
use crate::application::dashboard_service::{DashboardError, DashboardView};
use crate::application::form::FormView;
use crate::application::modal::DismissReason;
use crate::application::notifications::Notice;
use crate::domain::chart::ChartSpec;
use crate::domain::slice::SliceSelection;
use crate::domain::source::SourceListing;
use crate::infrastructure::asset_cache::AssetError;
use crate::presentation::app_state::AppState;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SelectSourceRequest {
    pub source: Option<String>,
}

#[derive(Deserialize)]
pub struct LoadRequest {
    #[serde(default)]
    pub values: HashMap<String, String>,
}

#[derive(Deserialize)]
pub struct SliceRequest {
    pub selection: SliceSelection,
}

#[derive(Deserialize)]
pub struct DismissQuery {
    pub reason: Option<DismissReason>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/sources", get(list_sources))
        .route("/form", get(current_form))
        .route("/form/source", post(select_source))
        .route("/load", post(load))
        .route("/slice", post(select_slice))
        .route("/dashboard", get(current_dashboard))
        .route("/charts/:id/modal", post(open_modal))
        .route("/modal", delete(close_modal))
        .route("/notices", get(list_notices))
        .fallback(get(serve_asset))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_sources(State(state): State<Arc<AppState>>) -> Json<Vec<SourceListing>> {
    Json(state.dashboard.sources())
}

pub async fn current_form(State(state): State<Arc<AppState>>) -> Json<FormView> {
    Json(state.dashboard.form().await)
}

/// Switch source: rebuild inputs and clear the rendered dashboard
pub async fn select_source(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectSourceRequest>,
) -> Json<FormView> {
    Json(
        state
            .dashboard
            .select_source(request.source.as_deref())
            .await,
    )
}

pub async fn load(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoadRequest>,
) -> Result<Json<DashboardView>, DashboardError> {
    state.dashboard.load(&request.values).await.map(Json)
}

pub async fn select_slice(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SliceRequest>,
) -> Result<Json<DashboardView>, DashboardError> {
    state.dashboard.select_slice(request.selection).await.map(Json)
}

pub async fn current_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardView>, DashboardError> {
    state
        .dashboard
        .current()
        .await
        .map(Json)
        .ok_or(DashboardError::NothingLoaded)
}

pub async fn open_modal(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChartSpec>, DashboardError> {
    state.dashboard.open_modal(&id).await.map(Json)
}

pub async fn close_modal(
    Query(query): Query<DismissQuery>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    let reason = query.reason.unwrap_or(DismissReason::Close);
    if state.dashboard.close_modal(reason).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn list_notices(State(state): State<Arc<AppState>>) -> Json<Vec<Notice>> {
    Json(state.dashboard.notices())
}

/// Shell assets, network first with the offline cache as fallback
pub async fn serve_asset(
    uri: Uri,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AssetError> {
    let asset = state.assets.fetch(uri.path()).await?;
    Ok(([(header::CONTENT_TYPE, asset.content_type)], asset.body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_service::{DashboardService, DashboardSettings};
    use crate::application::source_adapter::AdapterRegistry;
    use crate::domain::series::LabelFormat;
    use crate::infrastructure::asset_cache::{Asset, AssetCache, AssetOrigin, CacheStorage};
    use crate::infrastructure::blynk::BlynkAdapter;
    use crate::infrastructure::canvas::Canvas;
    use crate::infrastructure::http_client::test_upstream;
    use crate::infrastructure::thingspeak::ThingSpeakAdapter;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use bytes::Bytes;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct IndexOnly;

    #[async_trait]
    impl AssetOrigin for IndexOnly {
        async fn load(&self, path: &str) -> Result<Asset, AssetError> {
            match path {
                "/" | "/index.html" => Ok(Asset {
                    content_type: "text/html; charset=utf-8",
                    body: Bytes::from_static(b"<html>dashboard</html>"),
                }),
                _ => Err(AssetError::NotFound(path.to_string())),
            }
        }
    }

    async fn upstream() -> String {
        let router = Router::new()
            .route(
                "/channels/:id/feeds.json",
                get(|Path(id): Path<String>| async move {
                    if id != "357142" {
                        return (StatusCode::NOT_FOUND, Json(json!("-1")));
                    }
                    (
                        StatusCode::OK,
                        Json(json!({
                            "channel": {"name": "Greenhouse", "field1": "Temperature", "field3": "Humidity"},
                            "feeds": [
                                {"created_at": "2024-03-01T10:00:00Z", "field1": "21.5", "field3": "40"},
                                {"created_at": "2024-03-01T10:01:00Z", "field1": "21.7", "field3": "41"},
                                {"created_at": "2024-03-01T10:02:00Z", "field1": "21.9", "field3": "42"}
                            ]
                        })),
                    )
                }),
            )
            .route("/external/api/get", get(|| async { "23.5" }));
        test_upstream::serve(router).await
    }

    async fn app() -> (Router, Canvas) {
        let base = upstream().await;
        let client = reqwest::Client::new();
        let adapters = AdapterRegistry::new()
            .register(Arc::new(ThingSpeakAdapter::new(
                client.clone(),
                &base,
                None,
                LabelFormat::default(),
            )))
            .register(Arc::new(BlynkAdapter::new(client, &base, LabelFormat::default())));

        let canvas = Canvas::new();
        let state = Arc::new(AppState {
            dashboard: DashboardService::new(
                adapters,
                Box::new(canvas.clone()),
                DashboardSettings::default(),
            ),
            assets: AssetCache::new(
                "test-cache-v1",
                vec!["/".to_string()],
                CacheStorage::default(),
                Arc::new(IndexOnly),
            ),
        });
        (router(state), canvas)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_thingspeak_end_to_end() {
        let (app, canvas) = app().await;

        let (status, form) = call(&app, "POST", "/form/source", Some(json!({"source": "thingspeak"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(form["inputs"][0]["id"], "channelId");
        assert_eq!(form["loadVisible"], true);

        let (status, view) = call(
            &app,
            "POST",
            "/load",
            Some(json!({"values": {"channelId": "357142"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["details"]["fields"], "Temperature, Humidity");
        assert_eq!(view["table"]["rows"].as_array().unwrap().len(), 3);
        assert_eq!(view["selection"], "all");
        assert_eq!(view["slicerOptions"], json!(["2", "all"]));
        assert_eq!(canvas.live_chart_ids(), vec!["combined", "field-field1", "field-field3"]);

        let (status, view) = call(&app, "POST", "/slice", Some(json!({"selection": 2}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["table"]["rows"][0]["time"], "2024-03-01 10:01:00");

        let (status, spec) = call(&app, "POST", "/charts/field-field3/modal", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(spec["options"]["maintainAspectRatio"], false);
        assert_eq!(spec["datasets"][0]["fill"]["type"], "gradient");

        let (status, _) = call(&app, "DELETE", "/modal?reason=overlay", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "DELETE", "/modal", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_fetch_reports_once_and_keeps_dashboard() {
        let (app, _canvas) = app().await;

        call(&app, "POST", "/form/source", Some(json!({"source": "thingspeak"}))).await;
        let (_, before) = call(&app, "POST", "/load", Some(json!({"values": {"channelId": "357142"}}))).await;

        let (status, body) = call(&app, "POST", "/load", Some(json!({"values": {"channelId": "404404"}}))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "ThingSpeak fetch failed: HTTP 404");

        let (status, current) = call(&app, "GET", "/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(current, before);

        let (_, notices) = call(&app, "GET", "/notices", None).await;
        assert_eq!(notices.as_array().unwrap().len(), 1);
        assert_eq!(notices[0]["level"], "error");
    }

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let (app, _canvas) = app().await;

        call(&app, "POST", "/form/source", Some(json!({"source": "blynk"}))).await;
        let (status, body) = call(&app, "POST", "/load", Some(json!({"values": {"auth": "tok"}}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Please enter a valid Virtual Pin (V0, V1...).");

        let (status, _) = call(&app, "GET", "/dashboard", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_blynk_snapshot() {
        let (app, _canvas) = app().await;

        call(&app, "POST", "/form/source", Some(json!({"source": "blynk"}))).await;
        let (status, view) = call(
            &app,
            "POST",
            "/load",
            Some(json!({"values": {"auth": "tok", "pin": "V0"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["points"], 1);
        assert_eq!(view["table"]["header"], json!(["#", "Time", "Pin V0"]));
        assert_eq!(view["table"]["rows"][0]["cells"], json!(["23.5"]));
    }

    #[tokio::test]
    async fn test_sources_and_assets() {
        let (app, _canvas) = app().await;

        let (status, sources) = call(&app, "GET", "/sources", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sources.as_array().unwrap().len(), 5);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );

        let (status, _) = call(&app, "GET", "/nowhere.css", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
