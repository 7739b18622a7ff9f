//! Bridge event stream
//!
//! Everything the bridge reports outward goes through one channel:
//! characteristic notifications after a poll corrected the canonical state,
//! and swallowed hardware errors for observers that want them.

use serde::{Deserialize, Serialize};

use crate::channel::ChannelKind;
use crate::state::PowerState;
use crate::translation::InputPosition;

/// Exposed accessory characteristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Characteristic {
    /// Television power (0 = inactive, 1 = active)
    Active,
    /// Position of the active input source
    ActiveIdentifier,
    /// Remote control key press (write only)
    RemoteKey,
    /// Speaker mute
    Mute,
    /// Relative volume step (write only)
    VolumeSelector,
}

/// A canonical state change found by reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    /// Power differs from what was exposed
    Power(PowerState),
    /// Active input differs from what was exposed
    ActiveInput(InputPosition),
}

impl StateChange {
    /// Characteristic the facade has to notify
    pub fn characteristic(&self) -> Characteristic {
        match self {
            Self::Power(_) => Characteristic::Active,
            Self::ActiveInput(_) => Characteristic::ActiveIdentifier,
        }
    }

    /// Raw characteristic value
    pub fn value(&self) -> u32 {
        match self {
            Self::Power(power) => power.is_on() as u32,
            Self::ActiveInput(position) => position.as_u8() as u32,
        }
    }
}

/// Events emitted by the bridge actor
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// A characteristic changed out of band; the facade must notify it
    Notify(StateChange),

    /// A hardware call failed and was swallowed
    HardwareError {
        /// Channel that failed
        channel: ChannelKind,
        /// Operation that issued the call
        operation: &'static str,
        /// Error message
        message: String,
    },

    /// The actor has released its channels and stopped
    Stopped,
}

impl BridgeEvent {
    /// Check if this event must reach the accessory facade
    pub fn is_notification(&self) -> bool {
        matches!(self, BridgeEvent::Notify(_))
    }
}
