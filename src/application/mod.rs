// Application layer - Fetch contracts and the coordinators built on them
pub mod chart_manager;
pub mod export;
pub mod grow_box_api;
pub mod mutation_coordinator;
pub mod poll_scheduler;
