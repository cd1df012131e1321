// Telemetry data domain models
use super::fleet::EntityRef;
use serde::{Deserialize, Serialize};

/// One point handed to the heat layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub lat: f64,
    pub lon: f64,
}

impl TelemetryPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// False only for exactly (0, 0), which devices report when they have no
    /// GPS fix.
    pub fn is_nonzero(&self) -> bool {
        self.lat != 0.0 || self.lon != 0.0
    }
}

/// A single GPS fix (host entity type `LogRecord`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default)]
    pub device: Option<EntityRef>,
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

impl LogRecord {
    pub fn point(&self) -> TelemetryPoint {
        TelemetryPoint::new(self.latitude, self.longitude)
    }
}

/// A rule violation with its active window (host entity type `ExceptionEvent`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub device: EntityRef,
    #[serde(default)]
    pub rule: Option<EntityRef>,
    pub active_from: String,
    pub active_to: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationHeatmap {
    pub points: Vec<TelemetryPoint>,
    pub record_count: usize,
    pub vehicle_count: usize,
    pub elapsed_seconds: u64,
    /// Per-vehicle result lists that hit the results cap and may be
    /// truncated. Not rendered anywhere yet.
    pub exceeded_limit_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionHeatmap {
    pub points: Vec<TelemetryPoint>,
    pub rule_name: String,
}

/// Points ready for the map plus what the status line says about them.
#[derive(Debug, Clone, PartialEq)]
pub enum HeatmapData {
    Location(LocationHeatmap),
    Exception(ExceptionHeatmap),
}

impl HeatmapData {
    pub fn points(&self) -> &[TelemetryPoint] {
        match self {
            HeatmapData::Location(data) => &data.points,
            HeatmapData::Exception(data) => &data.points,
        }
    }

    pub fn into_points(self) -> Vec<TelemetryPoint> {
        match self {
            HeatmapData::Location(data) => data.points,
            HeatmapData::Exception(data) => data.points,
        }
    }

    pub fn status_message(&self) -> String {
        match self {
            HeatmapData::Location(data) => format!(
                "Displaying {} records for {} vehicles. [{} sec]",
                format_number(data.record_count),
                format_number(data.vehicle_count),
                data.elapsed_seconds
            ),
            HeatmapData::Exception(data) => {
                format!("Displaying exceptions for {}.", data.rule_name)
            }
        }
    }
}

/// Format with a comma every three digits.
pub fn format_number(value: usize) -> String {
    let digits = value.to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(ch);
    }
    formatted
}
