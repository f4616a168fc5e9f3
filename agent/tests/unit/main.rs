//! Integration tests for the signage agent

mod test_identity;
mod test_orchestrator;
mod test_session;
