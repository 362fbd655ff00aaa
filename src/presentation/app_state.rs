// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::infrastructure::asset_cache::AssetCache;

pub struct AppState {
    pub dashboard: DashboardService,
    pub assets: AssetCache,
}
