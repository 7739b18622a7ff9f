//! Hardware channel interfaces
//!
//! The bridge talks to a display over two independent channels:
//!
//! - an **opcode channel** (parameter query/set plus IR key emulation)
//! - a **CEC channel** (power on / standby over the video connection)
//!
//! Either may be absent in a deployment. Every call reports its own result;
//! the bridge decides what a failure means.

use std::fmt;
use std::future::Future;

use tv_protocol::Opcode;

use crate::error::ChannelError;

/// Which hardware channel a call went to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Vendor opcode protocol (LAN / RS-232C)
    Opcode,
    /// Consumer electronics control bus
    Cec,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opcode => write!(f, "opcode"),
            Self::Cec => write!(f, "CEC"),
        }
    }
}

/// Value of a display parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterValue {
    /// Current value
    pub current: u16,
    /// Maximum value the parameter accepts
    pub max: u16,
}

/// Query/set access to display parameters
pub trait OpcodeChannel: Send {
    /// Read a parameter
    fn query(
        &mut self,
        opcode: Opcode,
    ) -> impl Future<Output = Result<ParameterValue, ChannelError>> + Send;

    /// Write a parameter
    fn apply(
        &mut self,
        opcode: Opcode,
        value: u16,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Emulate a remote control key press
    fn send_command(&mut self, code: u8) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Release the underlying connection
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Power control over the CEC bus
pub trait CecChannel: Send {
    /// Wake the display
    fn power_on(&mut self) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Put the display in standby
    fn standby(&mut self) -> impl Future<Output = Result<(), ChannelError>> + Send;
}
