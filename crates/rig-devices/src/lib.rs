//! Sample simulated instruments
//!
//! Two reference devices built on the rigsim engine, each pairing a
//! device model and state machine with a protocol command table:
//!
//! - [`tempcon`]: temperature controller, CRLF framing, `ERR` on
//!   unknown input, optional unsolicited STATUS stream
//! - [`chopper`]: beam chopper, LF framing, silent on unknown input
//!
//! The `rigsim-demo` binary serves the temperature controller over TCP.

pub mod chopper;
pub mod tempcon;
