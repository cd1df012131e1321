//! Vehicle telemetry heatmap add-in service.
//!
//! Turns a vehicle, date and rule selection into heat-layer points by
//! querying the fleet host's data API, and serves the resulting page state
//! to the browser shell that draws it.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
