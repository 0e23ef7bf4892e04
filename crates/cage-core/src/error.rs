//! Error types shared across the gateway.

use thiserror::Error;

/// Errors raised while translating an agent-visible path to a
/// server-visible one. See [`crate::path_validation`].
#[derive(Debug, Error)]
pub enum PathError {
    #[error("path must be within {agent_root}, got: {path}")]
    OutsideAgentRoot { path: String, agent_root: String },

    #[error("path traversal not allowed: {0}")]
    Traversal(String),
}
