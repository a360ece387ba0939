//! Error types for the simulation core

use thiserror::Error;

/// Errors raised while assembling a device model or state machine
///
/// These are configuration mistakes and are fatal at construction; the
/// engine never surfaces them at runtime.
// Implemented by hand rather than via `#[derive(Error)]` because thiserror
// treats a field named `source` as the error's source, which requires it to
// implement `std::error::Error` (String does not).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A transition references a state that was never declared
    UnknownState(String),

    /// Two states were declared with the same name
    DuplicateState(String),

    /// Two transitions share the same (source, dest) pair
    DuplicateTransition { source: String, dest: String },

    /// No initial state was declared
    MissingInitialState,

    /// A field was declared twice on the same device model
    DuplicateField(String),

    /// A write hook or connectivity flag references an undeclared field
    UnknownField(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownState(s) => write!(f, "unknown state: {s}"),
            Self::DuplicateState(s) => write!(f, "duplicate state: {s}"),
            Self::DuplicateTransition { source, dest } => {
                write!(f, "duplicate transition: {source} -> {dest}")
            }
            Self::MissingInitialState => write!(f, "no initial state declared"),
            Self::DuplicateField(s) => write!(f, "duplicate field: {s}"),
            Self::UnknownField(s) => write!(f, "unknown field: {s}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A transition guard failed to evaluate
///
/// Guard failures are recovered: the tick that hit one completes with
/// no transition fired and the device stays in its current state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("guard evaluation failed: {0}")]
pub struct GuardError(pub String);

impl GuardError {
    /// Create a guard error with the given message
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors raised when reading or writing device model fields
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The named field does not exist on this model
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// The field exists but holds a different value type
    #[error("type mismatch on field {field}: expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
}
