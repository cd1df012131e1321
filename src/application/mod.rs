// Application layer - Use cases and the seams to host collaborators
pub mod controller;
pub mod heat_aggregator;
pub mod host_api;
pub mod map_renderer;
pub mod rosters;
