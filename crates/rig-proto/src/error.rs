//! Error types for protocol parsing and dispatch

use thiserror::Error;

/// Errors raised while building a command table
///
/// Fatal at construction; a table that builds successfully never
/// produces these at runtime.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The match pattern failed to compile
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    /// The pattern's capture groups do not line up with the declared
    /// argument kinds
    #[error("pattern {pattern:?} has {groups} capture group(s) but {declared} argument(s) declared")]
    CaptureCountMismatch {
        pattern: String,
        groups: usize,
        declared: usize,
    },
}

/// Errors recovered during request dispatch
///
/// These reach the interface's error callback, which decides the reply
/// (or silence); they never tear down a connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The framed input matched no command pattern
    #[error("no command matched input {frame:?}")]
    NoMatch {
        /// The offending frame, lossily decoded for display
        frame: String,
    },

    /// A captured group failed its declared type coercion
    #[error("cannot decode {text:?} as {expected}")]
    ArgumentDecode { text: String, expected: String },
}
