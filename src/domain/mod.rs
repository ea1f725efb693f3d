// Domain layer - Grow box telemetry, controls, settings and chart models
pub mod chart;
pub mod controls;
pub mod settings;
pub mod telemetry;
