//! Live attendance session over STOMP

pub mod attendance;
pub mod client;
pub mod greeting;
pub mod stomp;
pub mod token;
pub mod topics;
pub mod transport;
