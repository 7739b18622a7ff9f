//! Virtual display
//!
//! Holds the registers a real display exposes over its control link and
//! answers protocol requests exactly as the hardware does, including the
//! "unsupported" result for parameters and input values it does not have.

use tracing::debug;
use tv_protocol::{
    input, ir, Opcode, ParameterKind, ParameterReply, PowerMode, Reply, Request, MUTE_OFF,
    MUTE_ON, OPCODE_INPUT, OPCODE_MUTE, OPCODE_POWER_MODE, OPCODE_VOLUME,
};

/// Result code for an accepted request
pub const RESULT_OK: u8 = 0x00;
/// Result code for an unsupported parameter or value
pub const RESULT_UNSUPPORTED: u8 = 0x01;

/// Maximum volume register value
pub const MAX_VOLUME: u16 = 100;

/// CEC command as seen by the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CecCommand {
    /// Image view on / power on
    PowerOn,
    /// Standby
    Standby,
}

/// Simulated display
#[derive(Debug, Clone)]
pub struct VirtualDisplay {
    id: String,
    monitor_id: u8,
    power_mode: u16,
    input: u16,
    inputs: Vec<u16>,
    volume: u16,
    muted: bool,
    ir_log: Vec<u8>,
    cec_log: Vec<CecCommand>,
}

impl VirtualDisplay {
    /// Create a display in standby on DisplayPort
    ///
    /// It accepts the input codes of a typical multi-input panel.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            monitor_id: 1,
            power_mode: 2,
            input: input::DISPLAY_PORT,
            inputs: vec![
                input::VGA,
                input::DVI,
                input::DISPLAY_PORT,
                input::HDMI1,
                input::HDMI2,
                input::HDMI3,
            ],
            volume: 30,
            muted: false,
            ir_log: Vec::new(),
            cec_log: Vec::new(),
        }
    }

    /// Set the monitor ID the display answers to
    pub fn with_monitor_id(mut self, monitor_id: u8) -> Self {
        self.monitor_id = monitor_id;
        self
    }

    /// Restrict the input codes the display accepts
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = u16>) -> Self {
        self.inputs = inputs.into_iter().collect();
        self
    }

    /// Display identifier for logs
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Monitor ID
    pub fn monitor_id(&self) -> u8 {
        self.monitor_id
    }

    /// Raw power mode register
    pub fn power_mode_value(&self) -> u16 {
        self.power_mode
    }

    /// Decoded power mode
    pub fn power_mode(&self) -> PowerMode {
        PowerMode::from_value(self.power_mode)
    }

    /// Set the power mode register directly (front panel, own remote)
    pub fn set_power_mode_value(&mut self, value: u16) {
        self.power_mode = value;
    }

    /// Active input code
    pub fn input(&self) -> u16 {
        self.input
    }

    /// Set the input register directly, even to a value no table knows
    pub fn set_input(&mut self, code: u16) {
        self.input = code;
    }

    /// Volume register
    pub fn volume(&self) -> u16 {
        self.volume
    }

    /// Mute state
    pub fn muted(&self) -> bool {
        self.muted
    }

    /// IR codes received, oldest first
    pub fn ir_log(&self) -> &[u8] {
        &self.ir_log
    }

    /// CEC commands received, oldest first
    pub fn cec_log(&self) -> &[CecCommand] {
        &self.cec_log
    }

    fn parameter(&self, opcode: Opcode) -> Option<(u16, u16)> {
        if opcode == OPCODE_POWER_MODE {
            Some((4, self.power_mode))
        } else if opcode == OPCODE_INPUT {
            Some((self.inputs.iter().copied().max().unwrap_or(0), self.input))
        } else if opcode == OPCODE_VOLUME {
            Some((MAX_VOLUME, self.volume))
        } else if opcode == OPCODE_MUTE {
            Some((MUTE_OFF, if self.muted { MUTE_ON } else { MUTE_OFF }))
        } else {
            None
        }
    }

    fn parameter_reply(&self, opcode: Opcode, result: u8) -> Reply {
        let (max, current) = self.parameter(opcode).unwrap_or((0, 0));
        Reply::Parameter(ParameterReply {
            result,
            opcode,
            kind: ParameterKind::Set,
            max,
            current,
        })
    }

    fn set_parameter(&mut self, opcode: Opcode, value: u16) -> bool {
        if opcode == OPCODE_INPUT && self.inputs.contains(&value) {
            self.input = value;
        } else if opcode == OPCODE_VOLUME && value <= MAX_VOLUME {
            self.volume = value;
        } else if opcode == OPCODE_MUTE && (value == MUTE_ON || value == MUTE_OFF) {
            self.muted = value == MUTE_ON;
        } else {
            return false;
        }
        true
    }

    /// Answer a request
    pub fn handle_request(&mut self, request: Request) -> Reply {
        debug!("Display {} handling {:?}", self.id, request);
        match request {
            Request::GetParameter(opcode) => {
                let result = if self.parameter(opcode).is_some() {
                    RESULT_OK
                } else {
                    RESULT_UNSUPPORTED
                };
                self.parameter_reply(opcode, result)
            }
            Request::SetParameter(opcode, _) if opcode == OPCODE_POWER_MODE => {
                // Power is only settable through the power control command
                self.parameter_reply(opcode, RESULT_UNSUPPORTED)
            }
            Request::SetParameter(opcode, value) => {
                let result = if self.set_parameter(opcode, value) {
                    RESULT_OK
                } else {
                    RESULT_UNSUPPORTED
                };
                self.parameter_reply(opcode, result)
            }
            Request::PowerControl(mode) => match mode.to_value() {
                Some(value) => {
                    self.power_mode = value;
                    Reply::PowerControl {
                        result: RESULT_OK,
                        mode,
                    }
                }
                None => Reply::PowerControl {
                    result: RESULT_UNSUPPORTED,
                    mode: self.power_mode(),
                },
            },
            Request::RemoteKey(code) => {
                self.press_key(code);
                Reply::RemoteKey { code }
            }
        }
    }

    /// Apply an IR key
    pub fn press_key(&mut self, code: u8) {
        self.ir_log.push(code);
        match code {
            ir::POWER => {
                self.power_mode = if self.power_mode().is_on() { 2 } else { 1 };
            }
            ir::VOLUME_UP => self.volume = (self.volume + 1).min(MAX_VOLUME),
            ir::VOLUME_DOWN => self.volume = self.volume.saturating_sub(1),
            ir::MUTE => self.muted = !self.muted,
            _ => {}
        }
    }

    /// Apply a CEC command
    pub fn handle_cec(&mut self, command: CecCommand) {
        debug!("Display {} received CEC {:?}", self.id, command);
        self.cec_log.push(command);
        self.power_mode = match command {
            CecCommand::PowerOn => 1,
            CecCommand::Standby => 2,
        };
    }
}
