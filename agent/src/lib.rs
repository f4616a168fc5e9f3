//! Signage Agent Library
//!
//! Device identity, configuration sync, update orchestration and the live
//! attendance session for signage kiosks.

pub mod app;
pub mod config;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod identity;
pub mod logs;
pub mod server;
pub mod session;
pub mod storage;
pub mod update;
pub mod utils;
pub mod workers;
