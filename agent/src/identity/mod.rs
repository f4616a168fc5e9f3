//! Device identity

pub mod hardware;
pub mod serial;
