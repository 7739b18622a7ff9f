//! Display Control Protocol Library
//!
//! This crate provides parsing and encoding for the external control protocol
//! spoken by commercial flat-panel displays over LAN (TCP port 7142) and
//! RS-232C.
//!
//! # Architecture
//!
//! - [`frame`]: a streaming frame parser that handles partial data, plus
//!   typed [`Request`]s (controller to display) and [`Reply`]s (display to
//!   controller)
//! - [`opcode`]: parameter addresses, power modes, input values and remote
//!   control key codes
//!
//! Parameter access is always request/reply: one request in flight, one
//! reply frame back from the addressed monitor.
//!
//! # Example
//!
//! ```rust
//! use tv_protocol::{Address, FrameCodec, Reply, Request, OPCODE_INPUT};
//!
//! // Encode a query for the active input of monitor 1
//! let frame = Request::GetParameter(OPCODE_INPUT).to_frame(Address::monitor(1).unwrap());
//! let bytes = frame.encode();
//!
//! // The codec turns a byte stream back into frames
//! let mut codec = FrameCodec::new();
//! codec.push_bytes(&bytes);
//! let parsed = codec.next_frame().unwrap().unwrap();
//! assert_eq!(Request::from_frame(&parsed).unwrap(), Request::GetParameter(OPCODE_INPUT));
//! # let _ = Reply::from_frame(&parsed);
//! ```

pub mod error;
pub mod frame;
pub mod opcode;

pub use error::{ParseError, ProtocolError};
pub use frame::{
    check_code, Address, Frame, FrameCodec, MessageType, ParameterKind, ParameterReply, Reply,
    Request,
};
pub use opcode::{
    input, ir, Opcode, PowerMode, MUTE_OFF, MUTE_ON, OPCODE_INPUT, OPCODE_MUTE,
    OPCODE_POWER_MODE, OPCODE_VOLUME,
};

/// Default TCP port displays listen on for external control
pub const DEFAULT_TCP_PORT: u16 = 7142;

/// Default RS-232C baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;
