//! Protocol stream interface
//!
//! A [`StreamInterface`] is the request/response engine bound to one
//! connection: it frames incoming bytes on the input terminator, matches
//! each complete frame against the command table in declared order,
//! invokes the first matching handler against the device, and frames the
//! handler's reply with the output terminator. Input and output
//! terminators are independent and may differ or be empty.
//!
//! Unmatched or undecodable input is surfaced to a configurable error
//! callback that decides the reply: `Some(payload)` sends a NAK-style
//! response, `None` stays silent, matching how real instruments often do
//! not acknowledge unparseable input. Either way the connection stays up.
//!
//! The interface owns per-connection state (the framing buffer), so each
//! connection gets its own instance; the device behind it is shared.

use rig_sim::SimDevice;
use tracing::{debug, warn};

use crate::error::ProtocolError;
use crate::framing::FrameCodec;
use crate::table::CommandTable;

/// Terminator configuration for one device protocol
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InterfaceConfig {
    /// Request terminator; empty means unframed chunks
    pub in_terminator: Vec<u8>,
    /// Reply terminator appended to every outgoing payload
    pub out_terminator: Vec<u8>,
}

impl InterfaceConfig {
    /// Same terminator in both directions
    pub fn line(terminator: &str) -> Self {
        Self {
            in_terminator: terminator.as_bytes().to_vec(),
            out_terminator: terminator.as_bytes().to_vec(),
        }
    }

    /// Independent request and reply terminators
    pub fn new(in_terminator: &[u8], out_terminator: &[u8]) -> Self {
        Self {
            in_terminator: in_terminator.to_vec(),
            out_terminator: out_terminator.to_vec(),
        }
    }
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self::line("\r\n")
    }
}

/// Decides the reply to unmatched or undecodable input
pub type ErrorCallback = Box<dyn FnMut(&[u8], &ProtocolError) -> Option<String> + Send>;

/// Per-connection protocol engine over one shared device
pub struct StreamInterface {
    codec: FrameCodec,
    table: CommandTable,
    out_terminator: Vec<u8>,
    on_error: Option<ErrorCallback>,
}

impl StreamInterface {
    /// Bind a command table to terminator framing
    pub fn new(config: InterfaceConfig, table: CommandTable) -> Self {
        Self {
            codec: FrameCodec::new(config.in_terminator),
            table,
            out_terminator: config.out_terminator,
            on_error: None,
        }
    }

    /// Install the error callback for unmatched input
    pub fn on_error(
        mut self,
        callback: impl FnMut(&[u8], &ProtocolError) -> Option<String> + Send + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Feed raw bytes from the transport
    ///
    /// No handler runs until a full frame has arrived; unterminated
    /// bytes only accumulate.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.codec.push_bytes(data);
    }

    /// Process buffered frames until one produces a reply
    ///
    /// Frames that yield no reply (silent handlers, link-down gating,
    /// unmatched input with a silent error callback) are consumed along
    /// the way.
    pub fn next_reply(&mut self, device: &mut SimDevice) -> Option<Vec<u8>> {
        while let Some(frame) = self.codec.next_frame() {
            if let Some(reply) = self.handle_frame(device, &frame) {
                return Some(reply);
            }
        }
        None
    }

    /// Push bytes and collect every reply they produce, in order
    pub fn handle(&mut self, device: &mut SimDevice, data: &[u8]) -> Vec<Vec<u8>> {
        self.push_bytes(data);
        let mut replies = Vec::new();
        while let Some(reply) = self.next_reply(device) {
            replies.push(reply);
        }
        replies
    }

    /// Frame a payload for the unsolicited send path
    pub fn frame_unsolicited(&self, payload: &str) -> Vec<u8> {
        frame_with(&self.out_terminator, payload)
    }

    /// Dispatch one complete frame against the table
    fn handle_frame(&mut self, device: &mut SimDevice, frame: &[u8]) -> Option<Vec<u8>> {
        let error = match std::str::from_utf8(frame) {
            Ok(text) => {
                let mut decode_error = None;
                for spec in self.table.specs.iter_mut() {
                    if !spec.pattern.matches(text) {
                        continue;
                    }
                    // First matching pattern is selected; a decode
                    // failure is an error, not a reason to keep scanning
                    match spec.pattern.decode(text) {
                        Ok(args) => {
                            if spec.requires_connection && !device.model().is_connected() {
                                debug!(
                                    "device {}: link down, dropping {:?}",
                                    device.id(),
                                    text
                                );
                                return None;
                            }
                            let payload = (spec.handler)(device, &args)?;
                            return Some(frame_with(&self.out_terminator, &payload));
                        }
                        Err(e) => {
                            decode_error = Some(e);
                            break;
                        }
                    }
                }
                decode_error.unwrap_or_else(|| ProtocolError::NoMatch {
                    frame: String::from_utf8_lossy(frame).into_owned(),
                })
            }
            Err(_) => ProtocolError::NoMatch {
                frame: String::from_utf8_lossy(frame).into_owned(),
            },
        };

        warn!("device {}: {}", device.id(), error);
        let payload = self.on_error.as_mut().and_then(|cb| cb(frame, &error))?;
        Some(frame_with(&self.out_terminator, &payload))
    }
}

fn frame_with(terminator: &[u8], payload: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + terminator.len());
    out.extend_from_slice(payload.as_bytes());
    out.extend_from_slice(terminator);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{ArgKind, CommandPattern};
    use crate::table::CommandSpec;
    use rig_sim::{DeviceModel, State, StateMachine};

    fn test_device() -> SimDevice {
        let model = DeviceModel::builder()
            .field("value", 0.0)
            .field("connected", true)
            .connectivity_flag("connected")
            .build()
            .unwrap();
        let machine = StateMachine::builder()
            .state(State::new("idle"))
            .initial("idle")
            .build()
            .unwrap();
        SimDevice::new("test", model, machine)
    }

    fn test_table() -> CommandTable {
        CommandTable::new()
            .with(CommandSpec::new(
                CommandPattern::new(r"SET ([+-]?[0-9.]+)", vec![ArgKind::Float]).unwrap(),
                |dev, args| {
                    dev.model_mut()
                        .set("value", args[0].as_float().unwrap())
                        .unwrap();
                    Some("OK".into())
                },
            ))
            .with(
                CommandSpec::new(CommandPattern::literal("GET").unwrap(), |dev, _| {
                    Some(format!("{}", dev.model().number("value").unwrap()))
                })
                .requires_connection(),
            )
            .with(CommandSpec::new(
                CommandPattern::literal("QUIET").unwrap(),
                |_, _| None,
            ))
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let mut device = test_device();
        let mut iface = StreamInterface::new(InterfaceConfig::line("\r\n"), test_table());

        let replies = iface.handle(&mut device, b"SET 42.5\r\nGET\r\n");
        assert_eq!(replies, vec![b"OK\r\n".to_vec(), b"42.5\r\n".to_vec()]);
    }

    #[test]
    fn test_no_handler_before_terminator() {
        let mut device = test_device();
        let mut iface = StreamInterface::new(InterfaceConfig::line("\r\n"), test_table());

        assert!(iface.handle(&mut device, b"SET 42.5").is_empty());
        assert_eq!(device.model().number("value").unwrap(), 0.0);

        let replies = iface.handle(&mut device, b"\r\n");
        assert_eq!(replies, vec![b"OK\r\n".to_vec()]);
        assert_eq!(device.model().number("value").unwrap(), 42.5);
    }

    #[test]
    fn test_first_declared_pattern_wins() {
        let mut device = test_device();
        let table = CommandTable::new()
            .with(CommandSpec::new(
                CommandPattern::new(r"X[0-9]+", vec![]).unwrap(),
                |_, _| Some("broad".into()),
            ))
            .with(CommandSpec::new(
                CommandPattern::literal("X1").unwrap(),
                |_, _| Some("narrow".into()),
            ));
        let mut iface = StreamInterface::new(InterfaceConfig::line("\n"), table);

        let replies = iface.handle(&mut device, b"X1\n");
        assert_eq!(replies, vec![b"broad\n".to_vec()]);
    }

    #[test]
    fn test_unmatched_input_is_silent_without_callback() {
        let mut device = test_device();
        let mut iface = StreamInterface::new(InterfaceConfig::line("\r\n"), test_table());

        assert!(iface.handle(&mut device, b"NONSENSE\r\n").is_empty());
    }

    #[test]
    fn test_error_callback_decides_nak() {
        let mut device = test_device();
        let mut iface = StreamInterface::new(InterfaceConfig::line("\r\n"), test_table())
            .on_error(|_, _| Some("ERR".into()));

        let replies = iface.handle(&mut device, b"NONSENSE\r\n");
        assert_eq!(replies, vec![b"ERR\r\n".to_vec()]);
    }

    #[test]
    fn test_decode_failure_reaches_error_callback() {
        let mut device = test_device();
        let table = CommandTable::new().with(CommandSpec::new(
            CommandPattern::new(r"MOVE ([0-9a-z]+)", vec![ArgKind::Int]).unwrap(),
            |_, _| Some("ACK".into()),
        ));
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let mut iface = StreamInterface::new(InterfaceConfig::line("\n"), table)
            .on_error(move |_, err| {
                seen_cb.lock().unwrap().push(err.clone());
                Some("NAK".into())
            });

        let replies = iface.handle(&mut device, b"MOVE 3x\n");
        assert_eq!(replies, vec![b"NAK\n".to_vec()]);
        assert!(matches!(
            seen.lock().unwrap()[0],
            ProtocolError::ArgumentDecode { .. }
        ));
    }

    #[test]
    fn test_link_down_gates_silently() {
        let mut device = test_device();
        let mut iface = StreamInterface::new(InterfaceConfig::line("\r\n"), test_table())
            .on_error(|_, _| Some("ERR".into()));

        device.model_mut().set("connected", false).unwrap();
        // Gated command: silence, not an error
        assert!(iface.handle(&mut device, b"GET\r\n").is_empty());
        // Ungated command still answers
        let replies = iface.handle(&mut device, b"SET 1.0\r\n");
        assert_eq!(replies, vec![b"OK\r\n".to_vec()]);
    }

    #[test]
    fn test_silent_handler_produces_no_reply() {
        let mut device = test_device();
        let mut iface = StreamInterface::new(InterfaceConfig::line("\r\n"), test_table());
        assert!(iface.handle(&mut device, b"QUIET\r\n").is_empty());
    }

    #[test]
    fn test_differing_terminators() {
        let mut device = test_device();
        let mut iface = StreamInterface::new(
            InterfaceConfig::new(b"\n", b"\r\n"),
            test_table(),
        );

        let replies = iface.handle(&mut device, b"SET 7\n");
        assert_eq!(replies, vec![b"OK\r\n".to_vec()]);
    }

    #[test]
    fn test_frame_unsolicited_uses_output_terminator() {
        let iface = StreamInterface::new(InterfaceConfig::new(b"\n", b";"), CommandTable::new());
        assert_eq!(iface.frame_unsolicited("STATUS 1"), b"STATUS 1;".to_vec());
    }
}
