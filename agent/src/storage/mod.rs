//! Local storage

pub mod artifacts;
pub mod layout;
pub mod settings;
