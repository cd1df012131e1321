// In-process map state served to the browser shell, which draws it with its
// tile/heat widgets
use crate::application::map_renderer::{
    Coordinates, Geolocator, HeatLayerOptions, MapRenderer, TileLayer,
};
use crate::domain::telemetry::TelemetryPoint;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn enclosing(points: &[TelemetryPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Bounds {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        for p in &points[1..] {
            bounds.south = bounds.south.min(p.lat);
            bounds.north = bounds.north.max(p.lat);
            bounds.west = bounds.west.min(p.lon);
            bounds.east = bounds.east.max(p.lon);
        }
        Some(bounds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatLayer {
    /// Bumped every time a fresh layer is attached.
    pub generation: u64,
    pub options: HeatLayerOptions,
    pub points: Vec<TelemetryPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub center: Option<Coordinates>,
    pub zoom: u8,
    pub tile_layers: Vec<TileLayer>,
    pub bounds: Option<Bounds>,
    pub heat_layer: Option<HeatLayer>,
    pub size_invalidations: u32,
    #[serde(skip)]
    heat_layer_options: HeatLayerOptions,
    #[serde(skip)]
    generations: u64,
}

impl MapView {
    pub fn new(heat_layer_options: HeatLayerOptions) -> Self {
        Self {
            center: None,
            zoom: 0,
            tile_layers: Vec::new(),
            bounds: None,
            heat_layer: None,
            size_invalidations: 0,
            heat_layer_options,
            generations: 0,
        }
    }

    pub fn heat_points(&self) -> &[TelemetryPoint] {
        self.heat_layer
            .as_ref()
            .map(|layer| layer.points.as_slice())
            .unwrap_or(&[])
    }
}

impl MapRenderer for MapView {
    fn set_view(&mut self, center: Coordinates, zoom: u8) {
        self.center = Some(center);
        self.zoom = zoom;
    }

    fn add_tile_layer(&mut self, layer: TileLayer) {
        self.tile_layers.push(layer);
    }

    fn fit_bounds(&mut self, points: &[TelemetryPoint]) {
        if let Some(bounds) = Bounds::enclosing(points) {
            self.center = Some(Coordinates::new(
                (bounds.south + bounds.north) / 2.0,
                (bounds.west + bounds.east) / 2.0,
            ));
            self.bounds = Some(bounds);
        }
    }

    fn reset_heat_layer(&mut self) {
        self.generations += 1;
        self.heat_layer = Some(HeatLayer {
            generation: self.generations,
            options: self.heat_layer_options.clone(),
            points: Vec::new(),
        });
    }

    fn set_points(&mut self, points: Vec<TelemetryPoint>) {
        if self.heat_layer.is_none() {
            self.reset_heat_layer();
        }
        if let Some(layer) = self.heat_layer.as_mut() {
            layer.points = points;
        }
    }

    fn invalidate_size(&mut self) {
        self.size_invalidations += 1;
    }
}

/// Position taken from configuration; `None` models a browser that denied
/// or lacks geolocation.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLocation {
    position: Option<Coordinates>,
}

impl ConfiguredLocation {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self { position }
    }
}

impl Geolocator for ConfiguredLocation {
    fn current_position(&self) -> Option<Coordinates> {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_bounds_encloses_all_points() {
        let mut map = MapView::new(HeatLayerOptions::default());
        map.fit_bounds(&[
            TelemetryPoint::new(43.4, -79.7),
            TelemetryPoint::new(43.9, -79.2),
            TelemetryPoint::new(43.1, -80.1),
        ]);

        let bounds = map.bounds.unwrap();
        assert_eq!(bounds.south, 43.1);
        assert_eq!(bounds.north, 43.9);
        assert_eq!(bounds.west, -80.1);
        assert_eq!(bounds.east, -79.2);
    }

    #[test]
    fn test_fit_bounds_without_points_keeps_viewport() {
        let mut map = MapView::new(HeatLayerOptions::default());
        map.set_view(Coordinates::new(43.434497, -79.709441), 13);
        map.fit_bounds(&[]);

        assert!(map.bounds.is_none());
        assert_eq!(map.center, Some(Coordinates::new(43.434497, -79.709441)));
    }

    #[test]
    fn test_reset_heat_layer_attaches_fresh_empty_layer() {
        let mut map = MapView::new(HeatLayerOptions::default());
        map.reset_heat_layer();
        map.set_points(vec![TelemetryPoint::new(1.0, 2.0)]);
        assert_eq!(map.heat_points().len(), 1);

        map.reset_heat_layer();
        let layer = map.heat_layer.as_ref().unwrap();
        assert_eq!(layer.generation, 2);
        assert!(layer.points.is_empty());
        assert_eq!(layer.options.radius, 24.0);
    }
}
