//! Bridge configuration
//!
//! A [`BridgeConfig`] is read from a JSON file. Every field has a default,
//! so a partial file (or none at all) is valid. The hardware variants the
//! bridge ships for are available as named profiles.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tv_protocol::frame::MAX_MONITOR_ID;
use tv_protocol::{input, DEFAULT_BAUD_RATE, DEFAULT_TCP_PORT};

use crate::cec_client::{CecClient, DEFAULT_CEC_BINARY, TV_LOGICAL_ADDRESS};
use crate::engine::BridgeOptions;
use crate::error::ConfigError;
use crate::facade::{AccessoryInfo, TelevisionProfile};
use crate::nec_client::{SerialConnector, TcpConnector, TransportConnector};
use crate::translation::{InputPosition, InputSourceType, InputTable};

/// Names of the built-in profiles
pub const PROFILE_NAMES: &[&str] = &["multisync", "cec_only", "hdmi_triple"];

/// How the opcode link is reached
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpcodeTransport {
    /// No opcode channel
    #[default]
    None,
    /// LAN
    Tcp {
        /// Display host name or address
        host: String,
        /// TCP port
        #[serde(default = "default_tcp_port")]
        port: u16,
    },
    /// RS-232C
    Serial {
        /// Serial device path
        path: String,
        /// Baud rate
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
}

fn default_tcp_port() -> u16 {
    DEFAULT_TCP_PORT
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

/// Opcode channel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeConfig {
    /// Link to the display
    #[serde(default)]
    pub transport: OpcodeTransport,
    /// Monitor ID (1-100)
    #[serde(default = "default_monitor_id")]
    pub monitor_id: u8,
}

fn default_monitor_id() -> u8 {
    1
}

impl Default for OpcodeConfig {
    fn default() -> Self {
        Self {
            transport: OpcodeTransport::None,
            monitor_id: 1,
        }
    }
}

impl OpcodeConfig {
    /// Connector for the configured link, if any
    pub fn connector(&self) -> Option<TransportConnector> {
        match &self.transport {
            OpcodeTransport::None => None,
            OpcodeTransport::Tcp { host, port } => Some(TransportConnector::Tcp(TcpConnector {
                host: host.clone(),
                port: *port,
            })),
            OpcodeTransport::Serial { path, baud_rate } => {
                Some(TransportConnector::Serial(SerialConnector {
                    path: path.clone(),
                    baud_rate: *baud_rate,
                }))
            }
        }
    }
}

/// CEC channel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CecConfig {
    /// Use the CEC channel
    pub enabled: bool,
    /// Logical address of the display
    pub logical_address: u8,
    /// Client binary
    pub binary: String,
    /// Adapter port; first found when unset
    pub port: Option<String>,
}

impl Default for CecConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            logical_address: TV_LOGICAL_ADDRESS,
            binary: DEFAULT_CEC_BINARY.to_string(),
            port: None,
        }
    }
}

impl CecConfig {
    /// Client for the configured bus, if enabled
    pub fn client(&self) -> Option<CecClient> {
        self.enabled.then(|| {
            CecClient::new(self.binary.clone(), self.logical_address, self.port.clone())
        })
    }
}

/// One configured input source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Display name
    pub name: String,
    /// Input parameter value on the display
    pub code: u16,
    /// Advertised category
    #[serde(default)]
    pub source_type: InputSourceType,
}

impl InputConfig {
    fn new(name: &str, code: u16, source_type: InputSourceType) -> Self {
        Self {
            name: name.to_string(),
            code,
            source_type,
        }
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Accessory name
    pub name: String,
    /// Accessory information
    pub accessory: AccessoryInfo,
    /// Opcode channel
    pub opcode: OpcodeConfig,
    /// CEC channel
    pub cec: CecConfig,
    /// Input sources, in position order
    pub inputs: Vec<InputConfig>,
    /// Position reported when the input cannot be read
    pub fallback_input: Option<u8>,
    /// Reconciliation poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// Bound on each hardware call in milliseconds
    pub call_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: "Television".to_string(),
            accessory: AccessoryInfo::default(),
            opcode: OpcodeConfig::default(),
            cec: CecConfig::default(),
            inputs: vec![
                InputConfig::new("DisplayPort", input::DISPLAY_PORT, InputSourceType::Other),
                InputConfig::new("HDMI1", input::HDMI1, InputSourceType::Hdmi),
            ],
            fallback_input: None,
            poll_interval_ms: 3000,
            call_timeout_ms: 2000,
        }
    }
}

impl BridgeConfig {
    /// Built-in profile by name
    pub fn profile(name: &str) -> Result<Self, ConfigError> {
        let base = Self::default();
        let config = match name {
            "multisync" => Self {
                opcode: OpcodeConfig {
                    transport: OpcodeTransport::Serial {
                        path: "/dev/ttyUSB0".to_string(),
                        baud_rate: DEFAULT_BAUD_RATE,
                    },
                    monitor_id: 1,
                },
                inputs: vec![
                    InputConfig::new("DisplayPort", input::DISPLAY_PORT, InputSourceType::Other),
                    InputConfig::new("HDMI1", input::HDMI1, InputSourceType::Hdmi),
                    InputConfig::new("HDMI2", input::HDMI2, InputSourceType::Hdmi),
                ],
                ..base
            },
            "cec_only" => base,
            "hdmi_triple" => Self {
                opcode: OpcodeConfig {
                    transport: OpcodeTransport::Tcp {
                        host: "192.168.0.10".to_string(),
                        port: DEFAULT_TCP_PORT,
                    },
                    monitor_id: 1,
                },
                inputs: vec![
                    InputConfig::new("HDMI1", input::HDMI1, InputSourceType::Hdmi),
                    InputConfig::new("HDMI2", input::HDMI2, InputSourceType::Hdmi),
                    InputConfig::new("HDMI3", input::HDMI3, InputSourceType::Hdmi),
                ],
                ..base
            },
            other => return Err(ConfigError::UnknownProfile(other.to_string())),
        };
        Ok(config)
    }

    /// Parse a JSON document
    pub fn from_json(json: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: origin.clone(),
            source,
        })?;
        let config = Self::from_json(&contents, &origin)?;
        config.validate()?;
        info!("Loaded config from {}", origin);
        Ok(config)
    }

    /// Check the configuration for errors
    ///
    /// Duplicate input codes are legal but logged when the table is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inputs.is_empty() {
            return Err(ConfigError::NoInputs);
        }
        if self.inputs.len() > u8::MAX as usize {
            return Err(ConfigError::TooManyInputs(self.inputs.len()));
        }
        for (i, source) in self.inputs.iter().enumerate() {
            if self.inputs[..i].iter().any(|s| s.name == source.name) {
                return Err(ConfigError::DuplicateName(source.name.clone()));
            }
        }
        if let Some(fallback) = self.fallback_input {
            if fallback == 0 || fallback as usize > self.inputs.len() {
                return Err(ConfigError::InvalidFallback(fallback));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::ZeroCallTimeout);
        }
        let id = self.opcode.monitor_id;
        if id == 0 || id > MAX_MONITOR_ID {
            return Err(ConfigError::InvalidMonitorId(id));
        }
        Ok(())
    }

    /// Build the input table
    pub fn input_table(&self) -> InputTable {
        InputTable::new(
            self.inputs
                .iter()
                .map(|s| (s.name.clone(), s.code, s.source_type)),
        )
    }

    /// Reconciliation poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-call timeout, kept below the poll interval
    pub fn call_timeout(&self) -> Duration {
        let timeout = Duration::from_millis(self.call_timeout_ms);
        let interval = self.poll_interval();
        if timeout >= interval {
            let clamped = interval / 2;
            warn!(
                "Call timeout {:?} is not below the poll interval {:?}, using {:?}",
                timeout, interval, clamped
            );
            clamped
        } else {
            timeout
        }
    }

    /// Bridge tunables
    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            fallback_input: self.fallback_input.map(InputPosition),
            call_timeout: self.call_timeout(),
        }
    }

    /// Facade profile
    pub fn television_profile(&self) -> TelevisionProfile {
        TelevisionProfile::new(self.name.clone(), self.accessory.clone(), &self.input_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.call_timeout(), Duration::from_secs(2));
        assert!(config.opcode.connector().is_none());
        assert!(config.cec.client().is_some());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let json = r#"{
            "name": "Lounge",
            "opcode": { "transport": { "type": "tcp", "host": "10.0.0.5" } },
            "inputs": [
                { "name": "HDMI1", "code": 17, "source_type": "Hdmi" },
                { "name": "VGA", "code": 1 }
            ]
        }"#;
        let config = BridgeConfig::from_json(json, "test").unwrap();
        config.validate().unwrap();

        assert_eq!(config.name, "Lounge");
        assert_eq!(
            config.opcode.transport,
            OpcodeTransport::Tcp {
                host: "10.0.0.5".to_string(),
                port: 7142
            }
        );
        assert_eq!(config.opcode.monitor_id, 1);
        assert_eq!(config.inputs[1].source_type, InputSourceType::Other);
        assert_eq!(config.poll_interval_ms, 3000);
        assert_eq!(config.accessory.manufacturer, "HaPK");

        let table = config.input_table();
        assert_eq!(table.position_to_code(InputPosition(2)), Ok(1));
    }

    #[test]
    fn test_serial_transport_default_baud() {
        let json = r#"{ "opcode": { "transport": { "type": "serial", "path": "/dev/ttyS0" }, "monitor_id": 3 } }"#;
        let config = BridgeConfig::from_json(json, "test").unwrap();
        match config.opcode.connector() {
            Some(TransportConnector::Serial(c)) => {
                assert_eq!(c.path, "/dev/ttyS0");
                assert_eq!(c.baud_rate, 9600);
            }
            other => panic!("unexpected connector {:?}", other),
        }
        assert_eq!(config.opcode.monitor_id, 3);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = BridgeConfig {
            inputs: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoInputs)));

        config = BridgeConfig::default();
        config.inputs[1].name = "DisplayPort".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateName(_))));

        config = BridgeConfig {
            fallback_input: Some(3),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFallback(3))
        ));

        config = BridgeConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPollInterval)));

        config = BridgeConfig {
            call_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroCallTimeout)));

        config = BridgeConfig::default();
        config.opcode.monitor_id = 101;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMonitorId(101))
        ));
    }

    #[test]
    fn test_duplicate_codes_are_not_an_error() {
        let mut config = BridgeConfig::default();
        config.inputs[1].code = config.inputs[0].code;
        config.validate().unwrap();
        assert_eq!(config.input_table().duplicate_codes(), &[15]);
    }

    #[test]
    fn test_call_timeout_is_clamped() {
        let config = BridgeConfig {
            poll_interval_ms: 1000,
            call_timeout_ms: 5000,
            ..Default::default()
        };
        assert_eq!(config.call_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_load_reads_and_validates_file() {
        let dir = std::env::temp_dir().join(format!("tvbridge-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let good = dir.join("good.json");
        std::fs::write(&good, r#"{"name":"Den","poll_interval_ms":5000}"#).unwrap();
        let config = BridgeConfig::load(&good).unwrap();
        assert_eq!(config.name, "Den");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));

        let bad = dir.join("bad.json");
        std::fs::write(&bad, r#"{"call_timeout_ms":0}"#).unwrap();
        assert!(matches!(
            BridgeConfig::load(&bad),
            Err(ConfigError::ZeroCallTimeout)
        ));

        assert!(matches!(
            BridgeConfig::load(&dir.join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_profiles() {
        for name in PROFILE_NAMES {
            BridgeConfig::profile(name).unwrap().validate().unwrap();
        }
        assert!(BridgeConfig::profile("cec_only")
            .unwrap()
            .opcode
            .connector()
            .is_none());
        let triple = BridgeConfig::profile("hdmi_triple").unwrap();
        assert_eq!(triple.input_table().code_to_position(130), Ok(InputPosition(3)));
        assert!(matches!(
            BridgeConfig::profile("plasma"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }
}
