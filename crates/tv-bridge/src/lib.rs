//! Display State Reconciliation Bridge
//!
//! This crate exposes a commercial display as a television accessory. The
//! accessory side sees a small set of characteristics (power, active input,
//! remote keys, mute, volume steps); the display side is reached over an
//! opcode control link and the CEC bus.
//!
//! # Architecture
//!
//! - [`translation`]: input table and key/volume tables between accessory
//!   values and display codes
//! - [`channel`]: the two hardware channel traits, with [`nec_client`] and
//!   [`cec_client`] as the real implementations
//! - [`engine`]: the [`Bridge`], which owns the canonical state and confines
//!   every hardware failure
//! - [`actor`]: runs the bridge on a task with a periodic reconciliation poll
//! - [`facade`]: the [`BridgeHandle`] an accessory runtime holds, and the
//!   [`TelevisionProfile`] it publishes
//! - [`config`]: JSON configuration and built-in hardware profiles
//!
//! # Example
//!
//! ```rust,no_run
//! use tokio::sync::mpsc;
//! use tv_bridge::{run_bridge_actor, Bridge, BridgeConfig, BridgeHandle, CecClient, NecClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::profile("multisync")?;
//! let opcode = match config.opcode.connector() {
//!     Some(connector) => Some(NecClient::new(connector, config.opcode.monitor_id)?),
//!     None => None,
//! };
//! let bridge = Bridge::new(
//!     config.input_table(),
//!     opcode,
//!     config.cec.client(),
//!     config.bridge_options(),
//! );
//!
//! let (cmd_tx, cmd_rx) = mpsc::channel(64);
//! let (event_tx, _event_rx) = mpsc::channel(64);
//! tokio::spawn(run_bridge_actor(bridge, config.poll_interval(), cmd_rx, event_tx));
//!
//! let handle = BridgeHandle::new(cmd_tx);
//! handle.write_active_identifier(2).await?;
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod cec_client;
pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod facade;
pub mod nec_client;
pub mod state;
pub mod translation;

pub use actor::{run_bridge_actor, BridgeCommand};
pub use cec_client::CecClient;
pub use channel::{CecChannel, ChannelKind, OpcodeChannel, ParameterValue};
pub use config::{BridgeConfig, CecConfig, InputConfig, OpcodeConfig, OpcodeTransport};
pub use engine::{Bridge, BridgeOptions, HardwareFailure};
pub use error::{BridgeError, ChannelError, ConfigError, MappingMiss};
pub use events::{BridgeEvent, Characteristic, StateChange};
pub use facade::{AccessoryInfo, BridgeHandle, TelevisionProfile};
pub use nec_client::{Connector, NecClient, SerialConnector, TcpConnector, TransportConnector};
pub use state::{CanonicalState, PowerState};
pub use translation::{
    InputPosition, InputSource, InputSourceType, InputTable, NavigationCommand, RemoteKey,
    VolumeDirection,
};
