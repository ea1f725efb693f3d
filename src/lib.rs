// Grow box operator console - telemetry polling, optimistic control and chart lifecycle
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;
