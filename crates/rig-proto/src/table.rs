//! Ordered command table
//!
//! A [`CommandTable`] is the per-device vocabulary: an ordered list of
//! [`CommandSpec`]s, each pairing a compiled pattern with a handler.
//! Declaration order is significant: the stream interface tries
//! patterns in order and the first one matching the whole frame wins, so
//! overlapping patterns resolve deterministically.
//!
//! Tables are built once at interface construction from external device
//! configuration; the engine consumes them as data.

use rig_sim::SimDevice;

use crate::pattern::{Arg, CommandPattern};

/// Command handler: mutates the device and optionally produces a reply
/// payload (the output terminator is appended by the interface)
pub type Handler = Box<dyn FnMut(&mut SimDevice, &[Arg]) -> Option<String> + Send>;

/// One entry of the command table
pub struct CommandSpec {
    pub(crate) pattern: CommandPattern,
    pub(crate) handler: Handler,
    pub(crate) requires_connection: bool,
}

impl CommandSpec {
    /// Bind a pattern to a handler
    pub fn new(
        pattern: CommandPattern,
        handler: impl FnMut(&mut SimDevice, &[Arg]) -> Option<String> + Send + 'static,
    ) -> Self {
        Self {
            pattern,
            handler: Box::new(handler),
            requires_connection: false,
        }
    }

    /// Gate this command on the device's connectivity flag
    ///
    /// While the flag is false the command produces no reply and no
    /// error (link-down emulation).
    pub fn requires_connection(mut self) -> Self {
        self.requires_connection = true;
        self
    }

    /// The spec's compiled pattern
    pub fn pattern(&self) -> &CommandPattern {
        &self.pattern
    }
}

/// Ordered list of command specs; first match wins
#[derive(Default)]
pub struct CommandTable {
    pub(crate) specs: Vec<CommandSpec>,
}

impl CommandTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a spec, preserving declaration order
    pub fn with(mut self, spec: CommandSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Append a spec in place
    pub fn push(&mut self, spec: CommandSpec) {
        self.specs.push(spec);
    }

    /// Number of specs in the table
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
