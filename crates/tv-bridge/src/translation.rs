//! Translation tables
//!
//! Static bidirectional mappings between the accessory's symbolic values and
//! the display's protocol codes:
//!
//! - input positions (accessory identifiers) <-> input parameter values
//! - accessory remote key codes -> navigation commands -> IR key codes
//! - volume directions -> IR key codes
//!
//! Tables are built once at startup and never change afterwards. Every
//! lookup is total: a miss is an explicit [`MappingMiss`] or `None`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;
use tv_protocol::ir;

use crate::error::MappingMiss;

/// 1-based position of an input source (the accessory's input identifier)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InputPosition(pub u8);

impl InputPosition {
    /// Get the raw position value
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for InputPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input category advertised to the accessory protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InputSourceType {
    /// Other
    #[default]
    Other,
    /// Home screen
    HomeScreen,
    /// Tuner
    Tuner,
    /// HDMI
    Hdmi,
    /// Composite video
    CompositeVideo,
    /// S-Video
    SVideo,
    /// Component video
    ComponentVideo,
    /// DVI
    Dvi,
    /// AirPlay
    AirPlay,
    /// USB
    Usb,
    /// Application
    Application,
}

impl InputSourceType {
    /// Characteristic value for this type
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Other => 0,
            Self::HomeScreen => 1,
            Self::Tuner => 2,
            Self::Hdmi => 3,
            Self::CompositeVideo => 4,
            Self::SVideo => 5,
            Self::ComponentVideo => 6,
            Self::Dvi => 7,
            Self::AirPlay => 8,
            Self::Usb => 9,
            Self::Application => 10,
        }
    }

    /// Type for a characteristic value
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Other,
            1 => Self::HomeScreen,
            2 => Self::Tuner,
            3 => Self::Hdmi,
            4 => Self::CompositeVideo,
            5 => Self::SVideo,
            6 => Self::ComponentVideo,
            7 => Self::Dvi,
            8 => Self::AirPlay,
            9 => Self::Usb,
            10 => Self::Application,
            _ => return None,
        })
    }
}

/// A configured video input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    /// Stable 1-based position (insertion order)
    pub position: InputPosition,
    /// Display name
    pub name: String,
    /// Input parameter value on the display
    pub code: u16,
    /// Advertised input category
    pub source_type: InputSourceType,
}

/// Ordered input source table
#[derive(Debug, Clone)]
pub struct InputTable {
    sources: Vec<InputSource>,
    duplicate_codes: Vec<u16>,
}

impl InputTable {
    /// Build a table from `(name, code, type)` entries in position order
    ///
    /// Codes shared by several sources are a configuration defect: reverse
    /// lookup resolves them to the first position, and they are reported
    /// through [`duplicate_codes`](Self::duplicate_codes).
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u16, InputSourceType)>,
        S: Into<String>,
    {
        let sources: Vec<InputSource> = entries
            .into_iter()
            .enumerate()
            .map(|(idx, (name, code, source_type))| InputSource {
                position: InputPosition((idx + 1) as u8),
                name: name.into(),
                code,
                source_type,
            })
            .collect();

        let mut seen: HashMap<u16, &InputSource> = HashMap::new();
        let mut duplicate_codes = Vec::new();
        for source in &sources {
            if let Some(first) = seen.get(&source.code) {
                warn!(
                    "Input '{}' shares code {} with '{}'; reads of {} will report position {}",
                    source.name, source.code, first.name, source.code, first.position
                );
                if !duplicate_codes.contains(&source.code) {
                    duplicate_codes.push(source.code);
                }
            } else {
                seen.insert(source.code, source);
            }
        }

        Self {
            sources,
            duplicate_codes,
        }
    }

    /// Number of configured sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no sources are configured
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// All sources in position order
    pub fn sources(&self) -> &[InputSource] {
        &self.sources
    }

    /// Look up a source by position
    pub fn get(&self, position: InputPosition) -> Option<&InputSource> {
        let idx = (position.0 as usize).checked_sub(1)?;
        self.sources.get(idx)
    }

    /// Whether `position` names a configured source
    pub fn contains(&self, position: InputPosition) -> bool {
        self.get(position).is_some()
    }

    /// Position of the last configured source
    pub fn last_position(&self) -> InputPosition {
        InputPosition(self.sources.len().max(1) as u8)
    }

    /// Protocol code for a position
    pub fn position_to_code(&self, position: InputPosition) -> Result<u16, MappingMiss> {
        self.get(position)
            .map(|s| s.code)
            .ok_or(MappingMiss::Position(position))
    }

    /// Position for a protocol code (first match wins)
    pub fn code_to_position(&self, code: u16) -> Result<InputPosition, MappingMiss> {
        self.sources
            .iter()
            .find(|s| s.code == code)
            .map(|s| s.position)
            .ok_or(MappingMiss::InputCode(code))
    }

    /// Codes configured for more than one source
    pub fn duplicate_codes(&self) -> &[u16] {
        &self.duplicate_codes
    }
}

/// Remote key codes sent by the accessory's remote control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteKey {
    /// Rewind
    Rewind,
    /// Fast forward
    FastForward,
    /// Next track
    NextTrack,
    /// Previous track
    PreviousTrack,
    /// Arrow up
    ArrowUp,
    /// Arrow down
    ArrowDown,
    /// Arrow left
    ArrowLeft,
    /// Arrow right
    ArrowRight,
    /// Select
    Select,
    /// Back
    Back,
    /// Exit
    Exit,
    /// Play/pause
    PlayPause,
    /// Information
    Information,
}

impl RemoteKey {
    /// Decode a raw key code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Rewind),
            1 => Some(Self::FastForward),
            2 => Some(Self::NextTrack),
            3 => Some(Self::PreviousTrack),
            4 => Some(Self::ArrowUp),
            5 => Some(Self::ArrowDown),
            6 => Some(Self::ArrowLeft),
            7 => Some(Self::ArrowRight),
            8 => Some(Self::Select),
            9 => Some(Self::Back),
            10 => Some(Self::Exit),
            11 => Some(Self::PlayPause),
            15 => Some(Self::Information),
            _ => None,
        }
    }
}

/// On-screen navigation the display understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationCommand {
    /// Cursor up
    Up,
    /// Cursor down
    Down,
    /// Cursor left
    Left,
    /// Cursor right
    Right,
    /// Confirm
    Select,
    /// Leave the current menu
    Back,
    /// Open the OSD menu
    Menu,
}

/// Map a remote key code to a navigation command
///
/// Transport keys (rewind, play/pause, ...) have no display counterpart and
/// are unmapped, as is every undefined code.
pub fn key_code_to_navigation(code: u8) -> Option<NavigationCommand> {
    match RemoteKey::from_code(code)? {
        RemoteKey::ArrowUp => Some(NavigationCommand::Up),
        RemoteKey::ArrowDown => Some(NavigationCommand::Down),
        RemoteKey::ArrowLeft => Some(NavigationCommand::Left),
        RemoteKey::ArrowRight => Some(NavigationCommand::Right),
        RemoteKey::Select => Some(NavigationCommand::Select),
        RemoteKey::Back | RemoteKey::Exit => Some(NavigationCommand::Back),
        RemoteKey::Information => Some(NavigationCommand::Menu),
        RemoteKey::Rewind
        | RemoteKey::FastForward
        | RemoteKey::NextTrack
        | RemoteKey::PreviousTrack
        | RemoteKey::PlayPause => None,
    }
}

/// IR key code for a navigation command
pub fn navigation_to_ir_code(command: NavigationCommand) -> u8 {
    match command {
        NavigationCommand::Up => ir::UP,
        NavigationCommand::Down => ir::DOWN,
        NavigationCommand::Left => ir::LEFT,
        NavigationCommand::Right => ir::RIGHT,
        NavigationCommand::Select => ir::SET,
        NavigationCommand::Back => ir::EXIT,
        NavigationCommand::Menu => ir::MENU,
    }
}

/// Relative volume step requested by the accessory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeDirection {
    /// Volume up
    Increase,
    /// Volume down
    Decrease,
}

impl VolumeDirection {
    /// Decode the volume selector characteristic (0 = increment, 1 = decrement)
    pub fn from_selector(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Increase),
            1 => Some(Self::Decrease),
            _ => None,
        }
    }
}

/// IR key code for a volume step
pub fn direction_to_ir_code(direction: VolumeDirection) -> u8 {
    match direction {
        VolumeDirection::Increase => ir::VOLUME_UP,
        VolumeDirection::Decrease => ir::VOLUME_DOWN,
    }
}
