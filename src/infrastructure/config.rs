use crate::application::map_renderer::{Coordinates, HeatLayerOptions, TileLayer};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HeatmapConfig {
    pub server: ServerSettings,
    pub host_api: HostApiSettings,
    pub map: MapSettings,
    pub heat_layer: HeatLayerOptions,
    pub aggregation: AggregationSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HostApiSettings {
    /// Host name of the fleet server, e.g. `my.geotab.com`.
    pub server: String,
    pub database: String,
    pub user_name: String,
    pub password: Option<String>,
    /// Session handed over by the host page; skips `Authenticate`.
    pub session_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HostApiSettings {
    fn default() -> Self {
        Self {
            server: "my.geotab.com".to_string(),
            database: String::new(),
            user_name: String::new(),
            password: None,
            session_id: None,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapSettings {
    pub tile_layer: TileLayer,
    pub fallback_center: Coordinates,
    pub zoom: u8,
    /// Known position of the viewer; the fallback center is used without it.
    pub geolocation: Option<Coordinates>,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            tile_layer: TileLayer::default(),
            fallback_center: Coordinates::new(43.434497, -79.709441),
            zoom: 13,
            geolocation: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AggregationSettings {
    pub results_limit: usize,
    pub loading_hide_delay_ms: u64,
    pub invalidate_size_delay_ms: u64,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            results_limit: 50_000,
            loading_hide_delay_ms: 600,
            invalidate_size_delay_ms: 200,
        }
    }
}

impl AggregationSettings {
    pub fn loading_hide_delay(&self) -> Duration {
        Duration::from_millis(self.loading_hide_delay_ms)
    }

    pub fn invalidate_size_delay(&self) -> Duration {
        Duration::from_millis(self.invalidate_size_delay_ms)
    }
}

/// `config/heatmap.{toml,json,...}` if present, then `HEATMAP__SECTION__KEY`
/// environment overrides.
pub fn load_heatmap_config() -> anyhow::Result<HeatmapConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/heatmap").required(false))
        .add_source(config::Environment::with_prefix("HEATMAP").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
