// Map widget and geolocation seams
use crate::domain::telemetry::TelemetryPoint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
    pub subdomains: Vec<String>,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; OpenStreetMap".to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub stop: f64,
    pub color: String,
}

/// Rendering options for a fresh heat layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatLayerOptions {
    pub radius: f64,
    /// Radius in map units instead of pixels.
    pub absolute_radius: bool,
    pub opacity: f64,
    pub gradient: Vec<GradientStop>,
}

impl Default for HeatLayerOptions {
    fn default() -> Self {
        let stop = |stop: f64, color: &str| GradientStop {
            stop,
            color: color.to_string(),
        };
        Self {
            radius: 24.0,
            absolute_radius: false,
            opacity: 0.7,
            gradient: vec![
                stop(0.45, "rgb(0,0,255)"),
                stop(0.55, "rgb(0,255,255)"),
                stop(0.65, "rgb(0,255,0)"),
                stop(0.95, "yellow"),
                stop(1.0, "rgb(255,0,0)"),
            ],
        }
    }
}

/// Tile map with one heat layer on top.
pub trait MapRenderer: Send {
    fn set_view(&mut self, center: Coordinates, zoom: u8);
    fn add_tile_layer(&mut self, layer: TileLayer);
    /// Move the viewport so every point is visible.
    fn fit_bounds(&mut self, points: &[TelemetryPoint]);
    /// Detach the current heat layer and attach an empty one.
    fn reset_heat_layer(&mut self);
    fn set_points(&mut self, points: Vec<TelemetryPoint>);
    /// Recompute the map size after the container became visible.
    fn invalidate_size(&mut self);
}

pub trait Geolocator: Send + Sync {
    /// `None` when the position is unavailable or access was denied.
    fn current_position(&self) -> Option<Coordinates>;
}
