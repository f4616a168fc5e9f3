//! Gateway and CDN access

pub mod client;
pub mod gateway;
pub mod status;
