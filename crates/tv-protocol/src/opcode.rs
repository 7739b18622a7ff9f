//! Parameter opcodes, power modes and remote control codes
//!
//! Display parameters are addressed by a two-byte opcode made of a page and
//! a code within that page. Values are 16-bit.

use std::fmt;

/// A display parameter address (`page:code`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Opcode {
    /// Operation code page
    pub page: u8,
    /// Operation code within the page
    pub code: u8,
}

impl Opcode {
    /// Create an opcode from its page and code
    pub const fn new(page: u8, code: u8) -> Self {
        Self { page, code }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}:{:02X}", self.page, self.code)
    }
}

/// Power mode (read: current status; write: translated to power control)
pub const OPCODE_POWER_MODE: Opcode = Opcode::new(0x00, 0xD6);
/// Active video input
pub const OPCODE_INPUT: Opcode = Opcode::new(0x00, 0x60);
/// Audio volume (0-100)
pub const OPCODE_VOLUME: Opcode = Opcode::new(0x00, 0x62);
/// Audio mute (1 = muted, 2 = unmuted)
pub const OPCODE_MUTE: Opcode = Opcode::new(0x00, 0x8D);

/// Mute parameter value for muted
pub const MUTE_ON: u16 = 1;
/// Mute parameter value for unmuted
pub const MUTE_OFF: u16 = 2;

/// Input parameter values reported by the display
pub mod input {
    /// Analog VGA
    pub const VGA: u16 = 1;
    /// DVI-D
    pub const DVI: u16 = 3;
    /// Option slot / compute module
    pub const OPTION: u16 = 13;
    /// DisplayPort
    pub const DISPLAY_PORT: u16 = 15;
    /// HDMI 1
    pub const HDMI1: u16 = 17;
    /// HDMI 2
    pub const HDMI2: u16 = 18;
    /// HDMI 3
    pub const HDMI3: u16 = 130;
}

/// Raw power mode as reported by the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerMode {
    /// Status could not be read or was not recognized
    Error,
    /// Panel is on
    On,
    /// Standby (wakes on remote/command)
    Standby,
    /// Suspend (wakes on signal)
    Suspend,
    /// Off
    Off,
}

impl PowerMode {
    /// Decode the parameter value of [`OPCODE_POWER_MODE`]
    pub fn from_value(value: u16) -> Self {
        match value {
            1 => Self::On,
            2 => Self::Standby,
            3 => Self::Suspend,
            4 => Self::Off,
            _ => Self::Error,
        }
    }

    /// Parameter value used when setting this mode
    ///
    /// Only `On` and `Off` can be requested; other modes have no value.
    pub fn to_value(self) -> Option<u16> {
        match self {
            Self::On => Some(1),
            Self::Off => Some(4),
            _ => None,
        }
    }

    /// Only `On` counts as powered; unreadable status counts as off
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

/// Remote control (IR) key codes accepted by the remote command
pub mod ir {
    /// Power toggle
    pub const POWER: u8 = 0x03;
    /// Volume down
    pub const VOLUME_DOWN: u8 = 0x16;
    /// Volume up
    pub const VOLUME_UP: u8 = 0x17;
    /// Mute toggle
    pub const MUTE: u8 = 0x1B;
    /// Cursor down
    pub const DOWN: u8 = 0x14;
    /// Cursor up
    pub const UP: u8 = 0x15;
    /// Exit menu
    pub const EXIT: u8 = 0x1F;
    /// Open OSD menu
    pub const MENU: u8 = 0x20;
    /// Minus / cursor left
    pub const LEFT: u8 = 0x21;
    /// Plus / cursor right
    pub const RIGHT: u8 = 0x22;
    /// Set / select
    pub const SET: u8 = 0x23;
}
