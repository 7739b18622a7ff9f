//! Accessory facade glue
//!
//! [`BridgeHandle`] is what an accessory runtime holds: it decodes raw
//! characteristic values, forwards them to the bridge actor and never
//! surfaces a hardware error. [`TelevisionProfile`] describes the services
//! and static characteristics the runtime must publish.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::actor::BridgeCommand;
use crate::error::ChannelError;
use crate::events::Characteristic;
use crate::state::CanonicalState;
use crate::translation::{InputPosition, InputSourceType, InputTable, VolumeDirection};

/// Default accessory server port
pub const DEFAULT_ACCESSORY_PORT: u16 = 51826;

/// Accessory category for televisions
pub const CATEGORY_TELEVISION: u8 = 31;

/// SleepDiscoveryMode: always discoverable
pub const SLEEP_DISCOVERY_ALWAYS_DISCOVERABLE: u8 = 1;

/// VolumeControlType: relative steps
pub const VOLUME_CONTROL_RELATIVE: u8 = 1;

/// Accessory information service values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessoryInfo {
    /// Manufacturer
    pub manufacturer: String,
    /// Model
    pub model: String,
    /// Firmware revision
    pub firmware_revision: String,
    /// Serial number
    pub serial_number: String,
}

impl Default for AccessoryInfo {
    fn default() -> Self {
        Self {
            manufacturer: "HaPK".to_string(),
            model: "Raspberry Pi".to_string(),
            firmware_revision: "1.0".to_string(),
            serial_number: "1".to_string(),
        }
    }
}

/// One linked input source service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSourceService {
    /// Name and ConfiguredName
    pub name: String,
    /// Identifier (the position)
    pub identifier: u8,
    /// InputSourceType
    pub input_source_type: u8,
    /// IsConfigured
    pub is_configured: u8,
    /// CurrentVisibilityState (0 = shown)
    pub current_visibility_state: u8,
}

/// Television speaker service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerService {
    /// Active
    pub active: u8,
    /// VolumeControlType
    pub volume_control_type: u8,
}

/// Everything the accessory runtime publishes for the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelevisionProfile {
    /// Accessory and television service name
    pub name: String,
    /// Accessory category
    pub category: u8,
    /// Port the runtime listens on
    pub port: u16,
    /// Accessory information
    pub accessory: AccessoryInfo,
    /// SleepDiscoveryMode of the television service
    pub sleep_discovery_mode: u8,
    /// Linked input sources, in position order
    pub inputs: Vec<InputSourceService>,
    /// Linked speaker
    pub speaker: SpeakerService,
}

impl TelevisionProfile {
    /// Build the profile for an input table
    pub fn new(name: impl Into<String>, accessory: AccessoryInfo, inputs: &InputTable) -> Self {
        Self {
            name: name.into(),
            category: CATEGORY_TELEVISION,
            port: DEFAULT_ACCESSORY_PORT,
            accessory,
            sleep_discovery_mode: SLEEP_DISCOVERY_ALWAYS_DISCOVERABLE,
            inputs: inputs
                .sources()
                .iter()
                .map(|source| InputSourceService {
                    name: source.name.clone(),
                    identifier: source.position.as_u8(),
                    input_source_type: source.source_type.as_u8(),
                    is_configured: 1,
                    current_visibility_state: 0,
                })
                .collect(),
            speaker: SpeakerService {
                active: 1,
                volume_control_type: VOLUME_CONTROL_RELATIVE,
            },
        }
    }

    /// Input source type of the service at `identifier`
    pub fn input_type(&self, identifier: u8) -> Option<InputSourceType> {
        self.inputs
            .iter()
            .find(|s| s.identifier == identifier)
            .and_then(|s| InputSourceType::from_u8(s.input_source_type))
    }
}

/// Cloneable handle the accessory runtime uses to reach the bridge
///
/// Writes are fire-and-forget. Reads wait for the actor. Every method only
/// fails with [`ChannelError::Closed`] once the actor has stopped.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    cmd_tx: mpsc::Sender<BridgeCommand>,
}

impl BridgeHandle {
    /// Wrap the actor's command sender
    pub fn new(cmd_tx: mpsc::Sender<BridgeCommand>) -> Self {
        Self { cmd_tx }
    }

    async fn send(&self, cmd: BridgeCommand) -> Result<(), ChannelError> {
        self.cmd_tx.send(cmd).await.map_err(|_| ChannelError::Closed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> BridgeCommand,
    ) -> Result<T, ChannelError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await.map_err(|_| ChannelError::Closed)
    }

    /// Active written (0 = off, 1 = on)
    pub async fn write_active(&self, value: u8) -> Result<(), ChannelError> {
        match value {
            0 | 1 => self.send(BridgeCommand::SetPower { on: value == 1 }).await,
            other => {
                warn!("Ignoring Active value {}", other);
                Ok(())
            }
        }
    }

    /// ActiveIdentifier written
    pub async fn write_active_identifier(&self, value: u32) -> Result<(), ChannelError> {
        let Ok(position) = u8::try_from(value) else {
            warn!("Ignoring ActiveIdentifier value {}", value);
            return Ok(());
        };
        self.send(BridgeCommand::SetActiveInput {
            position: InputPosition(position),
        })
        .await
    }

    /// RemoteKey written
    pub async fn write_remote_key(&self, code: u8) -> Result<(), ChannelError> {
        self.send(BridgeCommand::RemoteKey { code }).await
    }

    /// Mute written
    pub async fn write_mute(&self, muted: bool) -> Result<(), ChannelError> {
        self.send(BridgeCommand::SetMute { muted }).await
    }

    /// VolumeSelector written (0 = increment, 1 = decrement)
    pub async fn write_volume_selector(&self, value: u8) -> Result<(), ChannelError> {
        match VolumeDirection::from_selector(value) {
            Some(direction) => self.send(BridgeCommand::VolumeSelector { direction }).await,
            None => {
                warn!("Ignoring VolumeSelector value {}", value);
                Ok(())
            }
        }
    }

    /// Active read
    pub async fn read_active(&self) -> Result<u8, ChannelError> {
        let on = self
            .request(|response| BridgeCommand::GetPower { response })
            .await?;
        Ok(on as u8)
    }

    /// ActiveIdentifier read
    pub async fn read_active_identifier(&self) -> Result<u32, ChannelError> {
        let position = self
            .request(|response| BridgeCommand::GetActiveInput { response })
            .await?;
        Ok(position.as_u8() as u32)
    }

    /// Mute read (last requested value)
    pub async fn read_mute(&self) -> Result<bool, ChannelError> {
        Ok(self.snapshot().await?.muted)
    }

    /// Canonical state snapshot
    pub async fn snapshot(&self) -> Result<CanonicalState, ChannelError> {
        self.request(|response| BridgeCommand::GetState { response })
            .await
    }

    /// Write a raw characteristic value
    pub async fn write(&self, characteristic: Characteristic, value: u32) -> Result<(), ChannelError> {
        debug!("Write {:?} = {}", characteristic, value);
        let narrow = |value: u32| u8::try_from(value).unwrap_or(u8::MAX);
        match characteristic {
            Characteristic::Active => self.write_active(narrow(value)).await,
            Characteristic::ActiveIdentifier => self.write_active_identifier(value).await,
            Characteristic::RemoteKey => self.write_remote_key(narrow(value)).await,
            Characteristic::Mute => self.write_mute(value != 0).await,
            Characteristic::VolumeSelector => self.write_volume_selector(narrow(value)).await,
        }
    }

    /// Read a raw characteristic value
    ///
    /// Returns `None` for write-only characteristics.
    pub async fn read(&self, characteristic: Characteristic) -> Result<Option<u32>, ChannelError> {
        let value = match characteristic {
            Characteristic::Active => Some(self.read_active().await? as u32),
            Characteristic::ActiveIdentifier => Some(self.read_active_identifier().await?),
            Characteristic::Mute => Some(self.read_mute().await? as u32),
            Characteristic::RemoteKey | Characteristic::VolumeSelector => None,
        };
        Ok(value)
    }

    /// Ask the actor to stop
    pub async fn shutdown(&self) -> Result<(), ChannelError> {
        self.send(BridgeCommand::Shutdown).await
    }
}
