//! External Control Frame Codec
//!
//! Displays are controlled with framed ASCII messages over LAN (TCP) or
//! RS-232C. Every frame has the same envelope:
//!
//! # Format
//! - Header: `SOH '0' DEST SRC TYPE LEN` (7 bytes, `LEN` is 2 hex digits)
//! - Message: `STX ... ETX` (`LEN` bytes including STX and ETX)
//! - Check code: XOR of every byte from the reserved `'0'` through ETX
//! - Delimiter: CR (0x0D)
//!
//! `DEST`/`SRC` are `'A'..` for monitor IDs 1-100, `'*'` for all monitors
//! and `'0'` for the controller.
//!
//! # Message Types
//! - `A` / `B` - Command / command reply (power control, remote keys)
//! - `C` / `D` - Get parameter / reply
//! - `E` / `F` - Set parameter / reply

use crate::error::{ParseError, ProtocolError};
use crate::opcode::{Opcode, PowerMode, OPCODE_POWER_MODE};

/// Start of header
pub const SOH: u8 = 0x01;
/// Start of message
pub const STX: u8 = 0x02;
/// End of message
pub const ETX: u8 = 0x03;
/// Frame delimiter
pub const CR: u8 = 0x0D;
/// Reserved header byte
const RESERVED: u8 = b'0';

/// Header length (SOH through LEN)
const HEADER_LEN: usize = 7;

/// Longest message any display sends (keeps a garbage stream bounded)
const MAX_MESSAGE_LEN: usize = 0xFF;

/// Highest monitor ID that has an address byte
pub const MAX_MONITOR_ID: u8 = 100;

/// A source or destination address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub u8);

impl Address {
    /// The controller (this side of the link)
    pub const CONTROLLER: Address = Address(b'0');
    /// All monitors
    pub const BROADCAST: Address = Address(b'*');

    /// Address of the monitor with the given ID (1-100)
    pub fn monitor(id: u8) -> Result<Self, ProtocolError> {
        if id == 0 || id > MAX_MONITOR_ID {
            return Err(ProtocolError::OutOfRange(format!("monitor id {}", id)));
        }
        Ok(Address(b'A' + (id - 1)))
    }

    /// Monitor ID if this address names a single monitor
    pub fn monitor_id(&self) -> Option<u8> {
        if self.0 >= b'A' && self.0 < b'A' + MAX_MONITOR_ID {
            Some(self.0 - b'A' + 1)
        } else {
            None
        }
    }

    fn from_wire(byte: u8) -> Result<Self, ParseError> {
        let addr = Address(byte);
        if addr == Self::CONTROLLER || addr == Self::BROADCAST || addr.monitor_id().is_some() {
            Ok(addr)
        } else {
            Err(ParseError::InvalidAddress(byte))
        }
    }
}

/// Message type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Command (`A`)
    Command,
    /// Command reply (`B`)
    CommandReply,
    /// Get parameter (`C`)
    GetParameter,
    /// Get parameter reply (`D`)
    GetParameterReply,
    /// Set parameter (`E`)
    SetParameter,
    /// Set parameter reply (`F`)
    SetParameterReply,
}

impl MessageType {
    /// Wire byte for this type
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Command => b'A',
            Self::CommandReply => b'B',
            Self::GetParameter => b'C',
            Self::GetParameterReply => b'D',
            Self::SetParameter => b'E',
            Self::SetParameterReply => b'F',
        }
    }

    /// Parse a wire byte
    pub fn from_byte(byte: u8) -> Result<Self, ParseError> {
        match byte {
            b'A' => Ok(Self::Command),
            b'B' => Ok(Self::CommandReply),
            b'C' => Ok(Self::GetParameter),
            b'D' => Ok(Self::GetParameterReply),
            b'E' => Ok(Self::SetParameter),
            b'F' => Ok(Self::SetParameterReply),
            other => Err(ParseError::UnknownMessageType(other)),
        }
    }

    /// The reply type a display answers this request type with
    pub fn reply_type(self) -> Option<Self> {
        match self {
            Self::Command => Some(Self::CommandReply),
            Self::GetParameter => Some(Self::GetParameterReply),
            Self::SetParameter => Some(Self::SetParameterReply),
            _ => None,
        }
    }
}

/// A complete frame with the message body (the bytes between STX and ETX)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Destination address
    pub destination: Address,
    /// Source address
    pub source: Address,
    /// Message type
    pub message_type: MessageType,
    /// ASCII message body, without STX/ETX
    pub body: Vec<u8>,
}

impl Frame {
    /// Encode this frame to its wire format
    pub fn encode(&self) -> Vec<u8> {
        let message_len = self.body.len() + 2;
        let mut out = Vec::with_capacity(HEADER_LEN + message_len + 2);
        out.push(SOH);
        out.push(RESERVED);
        out.push(self.destination.0);
        out.push(self.source.0);
        out.push(self.message_type.as_byte());
        push_hex_u8(&mut out, message_len as u8);
        out.push(STX);
        out.extend_from_slice(&self.body);
        out.push(ETX);
        out.push(check_code(&out[1..]));
        out.push(CR);
        out
    }
}

/// XOR check code over the given bytes
pub fn check_code(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

fn push_hex_u8(out: &mut Vec<u8>, value: u8) {
    out.extend_from_slice(format!("{:02X}", value).as_bytes());
}

fn push_hex_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(format!("{:04X}", value).as_bytes());
}

fn parse_hex(field: &[u8]) -> Result<u16, ParseError> {
    // from_str_radix would also take a leading sign
    if field.is_empty() || !field.iter().all(u8::is_ascii_hexdigit) {
        return Err(ParseError::InvalidHex(
            String::from_utf8_lossy(field).into_owned(),
        ));
    }
    let text =
        std::str::from_utf8(field).map_err(|_| ParseError::InvalidHex(format!("{:02X?}", field)))?;
    u16::from_str_radix(text, 16).map_err(|_| ParseError::InvalidHex(text.to_string()))
}

fn parse_hex_u8(field: &[u8]) -> Result<u8, ParseError> {
    parse_hex(field).map(|v| v as u8)
}

/// Streaming frame codec
///
/// Bytes are pushed as they arrive; complete frames are extracted one at a
/// time. Leading garbage before a SOH is discarded.
pub struct FrameCodec {
    buffer: Vec<u8>,
}

impl FrameCodec {
    /// Create a new frame codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    /// Push raw bytes into the codec buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // Prevent unbounded growth on a noisy line
        let limit = (HEADER_LEN + MAX_MESSAGE_LEN + 2) * 4;
        if self.buffer.len() > limit {
            let start = self.buffer.len() - (HEADER_LEN + MAX_MESSAGE_LEN + 2);
            self.buffer = self.buffer[start..].to_vec();
        }
    }

    /// Try to extract the next complete frame from the buffer
    ///
    /// Returns `None` when more data is needed. A malformed frame is consumed
    /// and reported as an error so the caller can fail the pending request.
    pub fn next_frame(&mut self) -> Option<Result<Frame, ParseError>> {
        // Resync on SOH
        let start = self.buffer.iter().position(|&b| b == SOH)?;
        if start > 0 {
            tracing::debug!("Discarding {} bytes before SOH", start);
            self.buffer.drain(..start);
        }

        if self.buffer.len() < HEADER_LEN {
            return None;
        }

        let message_len = match parse_hex(&self.buffer[5..7]) {
            Ok(len) if len >= 2 => len as usize,
            Ok(len) => {
                self.buffer.drain(..1);
                return Some(Err(ParseError::InvalidFrame(format!(
                    "message length {} too short",
                    len
                ))));
            }
            Err(e) => {
                self.buffer.drain(..1);
                return Some(Err(e));
            }
        };

        let total = HEADER_LEN + message_len + 2;
        if self.buffer.len() < total {
            return None;
        }

        let bytes: Vec<u8> = self.buffer.drain(..total).collect();
        Some(Self::parse_frame(&bytes, message_len))
    }

    fn parse_frame(bytes: &[u8], message_len: usize) -> Result<Frame, ParseError> {
        if bytes[1] != RESERVED {
            return Err(ParseError::InvalidFrame(format!(
                "reserved byte 0x{:02X}",
                bytes[1]
            )));
        }

        let stx = HEADER_LEN;
        let etx = HEADER_LEN + message_len - 1;
        if bytes[stx] != STX || bytes[etx] != ETX {
            return Err(ParseError::InvalidFrame("missing STX/ETX".into()));
        }

        let expected = check_code(&bytes[1..=etx]);
        let actual = bytes[etx + 1];
        if expected != actual {
            return Err(ParseError::ChecksumMismatch { expected, actual });
        }
        if bytes[etx + 2] != CR {
            return Err(ParseError::InvalidFrame("missing CR delimiter".into()));
        }

        Ok(Frame {
            destination: Address::from_wire(bytes[2])?,
            source: Address::from_wire(bytes[3])?,
            message_type: MessageType::from_byte(bytes[4])?,
            body: bytes[stx + 1..etx].to_vec(),
        })
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Power control command prefix
const POWER_CONTROL: &[u8] = b"C203D6";
/// Remote key command prefix
const REMOTE_KEY: &[u8] = b"C210";
/// Remote key reply prefix
const REMOTE_KEY_REPLY: &[u8] = b"C310";

/// A request from the controller to a display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Read a parameter
    GetParameter(Opcode),
    /// Write a parameter
    SetParameter(Opcode, u16),
    /// Switch the display on or off
    PowerControl(PowerMode),
    /// Emulate a remote control key press
    RemoteKey(u8),
}

impl Request {
    /// Message type this request is sent with
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::GetParameter(_) => MessageType::GetParameter,
            Self::SetParameter(..) => MessageType::SetParameter,
            Self::PowerControl(_) | Self::RemoteKey(_) => MessageType::Command,
        }
    }

    /// Normalize a request before it goes on the wire
    ///
    /// Displays do not accept a parameter write to the power mode opcode; it
    /// has to be sent as a power control command instead.
    pub fn normalized(self) -> Result<Self, ProtocolError> {
        match self {
            Self::SetParameter(op, value) if op == OPCODE_POWER_MODE => {
                let mode = PowerMode::from_value(value);
                if mode.to_value().is_none() {
                    return Err(ProtocolError::OutOfRange(format!("power mode {}", value)));
                }
                Ok(Self::PowerControl(mode))
            }
            Self::PowerControl(mode) if mode.to_value().is_none() => Err(
                ProtocolError::OutOfRange(format!("power mode {:?}", mode)),
            ),
            other => Ok(other),
        }
    }

    /// Encode the message body
    pub fn body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(12);
        match *self {
            Self::GetParameter(op) => {
                push_hex_u8(&mut body, op.page);
                push_hex_u8(&mut body, op.code);
            }
            Self::SetParameter(op, value) => {
                push_hex_u8(&mut body, op.page);
                push_hex_u8(&mut body, op.code);
                push_hex_u16(&mut body, value);
            }
            Self::PowerControl(mode) => {
                body.extend_from_slice(POWER_CONTROL);
                push_hex_u16(&mut body, mode.to_value().unwrap_or(0));
            }
            Self::RemoteKey(code) => {
                body.extend_from_slice(REMOTE_KEY);
                body.extend_from_slice(b"00");
                push_hex_u8(&mut body, code);
                body.extend_from_slice(b"03");
            }
        }
        body
    }

    /// Build the frame addressed to `destination`
    pub fn to_frame(&self, destination: Address) -> Frame {
        Frame {
            destination,
            source: Address::CONTROLLER,
            message_type: self.message_type(),
            body: self.body(),
        }
    }

    /// Decode a request frame (display side)
    pub fn from_frame(frame: &Frame) -> Result<Self, ParseError> {
        let body = frame.body.as_slice();
        match frame.message_type {
            MessageType::GetParameter if body.len() == 4 => Ok(Self::GetParameter(Opcode::new(
                parse_hex_u8(&body[0..2])?,
                parse_hex_u8(&body[2..4])?,
            ))),
            MessageType::SetParameter if body.len() == 8 => Ok(Self::SetParameter(
                Opcode::new(parse_hex_u8(&body[0..2])?, parse_hex_u8(&body[2..4])?),
                parse_hex(&body[4..8])?,
            )),
            MessageType::Command if body.len() == 10 && body.starts_with(POWER_CONTROL) => {
                Ok(Self::PowerControl(PowerMode::from_value(parse_hex(
                    &body[6..10],
                )?)))
            }
            MessageType::Command if body.len() == 10 && body.starts_with(REMOTE_KEY) => {
                Ok(Self::RemoteKey(parse_hex_u8(&body[6..8])?))
            }
            other => Err(ParseError::InvalidFrame(format!(
                "unrecognized {:?} body {:?}",
                other,
                String::from_utf8_lossy(body)
            ))),
        }
    }
}

/// Whether a parameter holds a value or triggers a momentary action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Set parameter (holds a value)
    Set,
    /// Momentary (action, e.g. auto setup)
    Momentary,
}

/// Parameter reply (`D` or `F`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterReply {
    /// Result code (`00` = ok, `01` = unsupported)
    pub result: u8,
    /// Parameter the reply refers to
    pub opcode: Opcode,
    /// Parameter kind
    pub kind: ParameterKind,
    /// Maximum value
    pub max: u16,
    /// Current value
    pub current: u16,
}

impl ParameterReply {
    /// Whether the display accepted the request
    pub fn is_ok(&self) -> bool {
        self.result == 0
    }
}

/// A reply from a display to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Reply to a get or set parameter request
    Parameter(ParameterReply),
    /// Reply to a power control command
    PowerControl {
        /// Result code
        result: u8,
        /// Power mode the display acknowledged
        mode: PowerMode,
    },
    /// Reply to a remote key command
    RemoteKey {
        /// Key code the display acknowledged
        code: u8,
    },
}

impl Reply {
    /// Decode a reply frame (controller side)
    pub fn from_frame(frame: &Frame) -> Result<Self, ParseError> {
        let body = frame.body.as_slice();
        match frame.message_type {
            MessageType::GetParameterReply | MessageType::SetParameterReply => {
                if body.len() != 16 {
                    return Err(ParseError::UnexpectedReply(format!(
                        "parameter reply of {} bytes",
                        body.len()
                    )));
                }
                let kind = match parse_hex_u8(&body[6..8])? {
                    0 => ParameterKind::Set,
                    _ => ParameterKind::Momentary,
                };
                Ok(Self::Parameter(ParameterReply {
                    result: parse_hex_u8(&body[0..2])?,
                    opcode: Opcode::new(parse_hex_u8(&body[2..4])?, parse_hex_u8(&body[4..6])?),
                    kind,
                    max: parse_hex(&body[8..12])?,
                    current: parse_hex(&body[12..16])?,
                }))
            }
            MessageType::CommandReply
                if body.len() == 12 && &body[2..8] == POWER_CONTROL =>
            {
                Ok(Self::PowerControl {
                    result: parse_hex_u8(&body[0..2])?,
                    mode: PowerMode::from_value(parse_hex(&body[8..12])?),
                })
            }
            MessageType::CommandReply if body.len() == 10 && body.starts_with(REMOTE_KEY_REPLY) => {
                Ok(Self::RemoteKey {
                    code: parse_hex_u8(&body[6..8])?,
                })
            }
            other => Err(ParseError::UnexpectedReply(format!(
                "{:?} body {:?}",
                other,
                String::from_utf8_lossy(body)
            ))),
        }
    }

    /// Message type this reply is sent with
    pub fn message_type(&self, request: MessageType) -> MessageType {
        match self {
            Self::Parameter(_) if request == MessageType::SetParameter => {
                MessageType::SetParameterReply
            }
            Self::Parameter(_) => MessageType::GetParameterReply,
            Self::PowerControl { .. } | Self::RemoteKey { .. } => MessageType::CommandReply,
        }
    }

    /// Encode the message body
    pub fn body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(16);
        match *self {
            Self::Parameter(p) => {
                push_hex_u8(&mut body, p.result);
                push_hex_u8(&mut body, p.opcode.page);
                push_hex_u8(&mut body, p.opcode.code);
                push_hex_u8(
                    &mut body,
                    match p.kind {
                        ParameterKind::Set => 0,
                        ParameterKind::Momentary => 1,
                    },
                );
                push_hex_u16(&mut body, p.max);
                push_hex_u16(&mut body, p.current);
            }
            Self::PowerControl { result, mode } => {
                push_hex_u8(&mut body, result);
                body.extend_from_slice(POWER_CONTROL);
                push_hex_u16(&mut body, mode.to_value().unwrap_or(0));
            }
            Self::RemoteKey { code } => {
                body.extend_from_slice(REMOTE_KEY_REPLY);
                body.extend_from_slice(b"00");
                push_hex_u8(&mut body, code);
                body.extend_from_slice(b"03");
            }
        }
        body
    }

    /// Build the reply frame sent by monitor `source` for a request of type `request`
    pub fn to_frame(&self, source: Address, request: MessageType) -> Frame {
        Frame {
            destination: Address::CONTROLLER,
            source,
            message_type: self.message_type(request),
            body: self.body(),
        }
    }
}
