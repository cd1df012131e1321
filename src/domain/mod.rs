// Domain layer - Fleet entities, telemetry and selection models
pub mod fleet;
pub mod selection;
pub mod telemetry;
