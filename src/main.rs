// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use fleet_heatmap::application::controller::{AddIn, ControllerSettings, HeatmapController, HostState};
use fleet_heatmap::application::host_api::HostApi;
use fleet_heatmap::infrastructure::config::{HeatmapConfig, load_heatmap_config};
use fleet_heatmap::infrastructure::map_view::{ConfiguredLocation, MapView};
use fleet_heatmap::infrastructure::mygeotab_client::MyGeotabClient;
use fleet_heatmap::presentation::app_state::AppState;
use fleet_heatmap::presentation::build_router;
use tracing_subscriber::EnvFilter;

fn controller_settings(config: &HeatmapConfig) -> ControllerSettings {
    ControllerSettings {
        tile_layer: config.map.tile_layer.clone(),
        fallback_center: config.map.fallback_center,
        zoom: config.map.zoom,
        results_limit: config.aggregation.results_limit,
        loading_hide_delay: config.aggregation.loading_hide_delay(),
        invalidate_size_delay: config.aggregation.invalidate_size_delay(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fleet_heatmap=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_heatmap_config()?;

    // Host data API (infrastructure layer)
    let api: Arc<dyn HostApi> = Arc::new(MyGeotabClient::new(config.host_api.clone())?);

    // Controller owning map and view state (application layer)
    let controller = HeatmapController::new(
        api.clone(),
        MapView::new(config.heat_layer.clone()),
        Arc::new(ConfiguredLocation::new(config.map.geolocation)),
        controller_settings(&config),
    );
    controller
        .initialize(
            api.clone(),
            &HostState::default(),
            Box::new(|| tracing::info!("Map and view ready")),
        )
        .await;

    let state = Arc::new(AppState { controller, api });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server.bind_address.parse()?;
    tracing::info!("Starting fleet-heatmap service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
