// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod map_view;
pub mod mygeotab_client;
