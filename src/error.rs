//! Error taxonomy exposed to the embedding shell.
//!
//! Uses anyhow for error propagation in CLI paths. PromptError is a minimal
//! enum for semantic errors the shell dispatches on (queue full, worker
//! stopped, bad arguments). Rendering itself never returns these: a failed
//! render degrades to the fallback prompt instead.

use std::io;

/// Semantic errors surfaced across the prompt subsystem boundary.
#[derive(Debug)]
pub enum PromptError {
    /// An argument failed validation (duplicate segment name, unknown theme).
    InvalidParameter(&'static str),
    /// Operation not legal in the current lifecycle state (submit after shutdown).
    InvalidState(&'static str),
    /// A bounded resource is full (async request queue).
    ResourceExhausted(&'static str),
    /// An OS-level call failed.
    SystemCall(io::Error),
    /// The subsystem was used before initialization.
    NotInitialized,
    /// The request type is recognized but has no handler.
    FeatureNotAvailable,
}

impl std::fmt::Display for PromptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptError::InvalidParameter(what) => write!(f, "invalid parameter: {}", what),
            PromptError::InvalidState(what) => write!(f, "invalid state: {}", what),
            PromptError::ResourceExhausted(what) => write!(f, "resource exhausted: {}", what),
            PromptError::SystemCall(e) => write!(f, "system call failed: {}", e),
            PromptError::NotInitialized => write!(f, "subsystem not initialized"),
            PromptError::FeatureNotAvailable => write!(f, "feature not available"),
        }
    }
}

impl std::error::Error for PromptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PromptError::SystemCall(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PromptError {
    fn from(e: io::Error) -> Self {
        PromptError::SystemCall(e)
    }
}
