//! Canonical display state

use serde::{Deserialize, Serialize};

use crate::translation::{InputPosition, VolumeDirection};

/// Power as exposed to the accessory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerState {
    /// Display on
    On,
    /// Display off, standby or unknown
    #[default]
    Off,
}

impl PowerState {
    /// Whether this is `On`
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// The bridge's belief about the display
///
/// Only the bridge mutates this, either from an inbound intent or from a
/// reconciliation poll. It is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalState {
    /// Power (optimistic on write, corrected by polls)
    pub power: PowerState,
    /// Active input (only ever set from a confirmed hardware write or read)
    pub active_input: InputPosition,
    /// Last requested mute state (not read back from hardware)
    pub muted: bool,
    /// Last requested volume step (not read back from hardware)
    pub last_volume_intent: Option<VolumeDirection>,
}

impl Default for CanonicalState {
    fn default() -> Self {
        Self {
            power: PowerState::Off,
            active_input: InputPosition(1),
            muted: false,
            last_volume_intent: None,
        }
    }
}
