//! Update orchestration

pub mod changes;
pub mod confirm;
pub mod installer;
pub mod orchestrator;
pub mod stage;
pub mod version;
