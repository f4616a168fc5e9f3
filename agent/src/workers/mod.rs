//! Background workers

pub mod session;
pub mod updater;
