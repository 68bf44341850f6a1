// Domain layer - value types and pure rules
pub mod alarm;
pub mod gauge;
pub mod history;
pub mod prediction;
pub mod sufficiency;
pub mod telemetry;
