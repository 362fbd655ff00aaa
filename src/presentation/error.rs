// Maps service errors onto HTTP responses
use crate::application::dashboard_service::DashboardError;
use crate::infrastructure::asset_cache::AssetError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::Validation(_) | DashboardError::InvalidSelection(_) => {
                StatusCode::BAD_REQUEST
            }
            DashboardError::Fetch(e) => {
                tracing::error!(source = e.source_name(), "fetch error: {e}");
                StatusCode::BAD_GATEWAY
            }
            DashboardError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            DashboardError::Busy
            | DashboardError::SourceChanged(_)
            | DashboardError::NothingLoaded => StatusCode::CONFLICT,
            DashboardError::ChartNotFound(_) => StatusCode::NOT_FOUND,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl IntoResponse for AssetError {
    fn into_response(self) -> Response {
        let status = match &self {
            AssetError::NotFound(_) => StatusCode::NOT_FOUND,
            AssetError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AssetError::Io(e) => {
                tracing::error!("asset read error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}
