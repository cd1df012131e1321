// Application state for HTTP handlers
use crate::application::controller::HeatmapController;
use crate::application::host_api::HostApi;
use crate::infrastructure::map_view::MapView;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub controller: HeatmapController<MapView>,
    /// Handed to the controller again on every focus.
    pub api: Arc<dyn HostApi>,
}
