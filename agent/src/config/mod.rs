//! Configuration state and resolution

pub mod cascade;
pub mod resolver;
pub mod store;
