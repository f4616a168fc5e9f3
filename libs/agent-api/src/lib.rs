//! Agent API
//!
//! Models served by the agent's local HTTP server to the kiosk UI.

pub mod models;
