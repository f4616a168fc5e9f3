//! Gateway API
//!
//! Wire models for the device-setting gateway, the CDN artifacts it points
//! at, and the session-token endpoint.

pub mod envelope;
pub mod models;

pub use envelope::DecodeError;
