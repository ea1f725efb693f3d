// Presentation layer - Operator console
pub mod commands;
pub mod console;
pub mod display;
pub mod surface;
