//! Error types for the match engine.

use std::fmt;

/// Errors surfaced by the engine and its storage collaborators.
///
/// Each variant maps to a stable rejection kind: a rejected operation
/// produces no observable state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed or out-of-range parameters (bad target, move too far,
    /// cell occupied, insufficient resources, unknown action, ...).
    Validation(String),
    /// Wrong turn, snapshot version mismatch, or match already ended.
    Conflict(String),
    /// Match or recipe not found.
    NotFound(String),
    /// Missing or invalid bearer token.
    Auth(String),
    /// Authenticated but not a participant of the match.
    Forbidden(String),
    /// Transient storage failure.
    Storage(String),
}

impl EngineError {
    /// Build a [`EngineError::Validation`] from any message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`EngineError::Conflict`] from any message.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Build a [`EngineError::NotFound`] from any message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`EngineError::Auth`] from any message.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Build a [`EngineError::Forbidden`] from any message.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Build a [`EngineError::Storage`] from any message.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the error is a transient storage failure worth one retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Auth(msg) => write!(f, "unauthorized: {msg}"),
            Self::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
