//! State reconciliation engine
//!
//! The [`Bridge`] owns the canonical display state and the hardware channels.
//! Every public operation corresponds to one exposed characteristic and
//! follows the same policy: look the value up in the translation tables,
//! call the channel(s) under a timeout, and confine any failure here. A
//! failure is logged with the operation and raw code, recorded for the event
//! stream, and replaced by a fallback (reads) or dropped (writes).
//!
//! Power is written optimistically; the active input only changes after the
//! display confirmed it.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};
use tv_protocol::{PowerMode, MUTE_OFF, MUTE_ON, OPCODE_INPUT, OPCODE_MUTE, OPCODE_POWER_MODE};

use crate::channel::{CecChannel, ChannelKind, OpcodeChannel};
use crate::error::{BridgeError, ChannelError};
use crate::events::StateChange;
use crate::state::{CanonicalState, PowerState};
use crate::translation::{
    direction_to_ir_code, key_code_to_navigation, navigation_to_ir_code, InputPosition,
    InputTable, VolumeDirection,
};

/// Default bound on a single hardware call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Tunables for a [`Bridge`]
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Position reported when the active input cannot be read
    ///
    /// `None` (or a position outside the table) uses the last configured
    /// source.
    pub fallback_input: Option<InputPosition>,
    /// Bound on each hardware call
    pub call_timeout: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            fallback_input: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// A hardware call that failed and was swallowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareFailure {
    /// Channel that failed
    pub channel: ChannelKind,
    /// Bridge operation that issued the call
    pub operation: &'static str,
    /// Error message
    pub message: String,
}

/// Run a channel call under a timeout
async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, ChannelError>>,
) -> Result<T, ChannelError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ChannelError::Timeout(timeout)),
    }
}

/// The hardware state reconciliation bridge
pub struct Bridge<O, C> {
    inputs: InputTable,
    opcode: Option<O>,
    cec: Option<C>,
    state: CanonicalState,
    fallback_input: InputPosition,
    call_timeout: Duration,
    failures: Vec<HardwareFailure>,
}

impl<O: OpcodeChannel, C: CecChannel> Bridge<O, C> {
    /// Create a bridge over the given channels
    ///
    /// Either channel may be `None`; commands for an absent channel are
    /// skipped as if they had succeeded.
    pub fn new(inputs: InputTable, opcode: Option<O>, cec: Option<C>, options: BridgeOptions) -> Self {
        let fallback_input = match options.fallback_input {
            Some(position) if inputs.contains(position) => position,
            Some(position) => {
                warn!(
                    "Fallback input {} is not configured, using {}",
                    position,
                    inputs.last_position()
                );
                inputs.last_position()
            }
            None => inputs.last_position(),
        };

        info!(
            "Bridge created: {} inputs, opcode channel {}, CEC channel {}",
            inputs.len(),
            if opcode.is_some() { "present" } else { "absent" },
            if cec.is_some() { "present" } else { "absent" },
        );

        Self {
            inputs,
            opcode,
            cec,
            state: CanonicalState::default(),
            fallback_input,
            call_timeout: options.call_timeout,
            failures: Vec::new(),
        }
    }

    /// Current canonical state
    pub fn state(&self) -> &CanonicalState {
        &self.state
    }

    /// Configured input sources
    pub fn inputs(&self) -> &InputTable {
        &self.inputs
    }

    /// Position reported when the active input cannot be read
    pub fn fallback_input(&self) -> InputPosition {
        self.fallback_input
    }

    /// Whether an opcode channel is configured
    pub fn has_opcode_channel(&self) -> bool {
        self.opcode.is_some()
    }

    /// Opcode channel, for inspection
    pub fn opcode_channel(&self) -> Option<&O> {
        self.opcode.as_ref()
    }

    /// CEC channel, for inspection
    pub fn cec_channel(&self) -> Option<&C> {
        self.cec.as_ref()
    }

    /// Take the failures recorded since the last call
    pub fn drain_failures(&mut self) -> Vec<HardwareFailure> {
        std::mem::take(&mut self.failures)
    }

    fn record_failure(&mut self, channel: ChannelKind, operation: &'static str, error: &BridgeError) {
        warn!("{} failed on {} channel: {}", operation, channel, error);
        self.failures.push(HardwareFailure {
            channel,
            operation,
            message: error.to_string(),
        });
    }

    // -------------------------------------------------------------------------
    // Power
    // -------------------------------------------------------------------------

    /// Switch the display on or off
    ///
    /// The canonical state changes immediately. The command then goes to
    /// every available channel; each failure is logged on its own and never
    /// reverts the state.
    pub async fn set_power(&mut self, on: bool) {
        self.state.power = PowerState::from(on);
        info!("Turn {}", if on { "on" } else { "off" });

        let timeout = self.call_timeout;
        let mode = if on { PowerMode::On } else { PowerMode::Off };

        if let Some(opcode) = self.opcode.as_mut() {
            let value = mode.to_value().unwrap_or_default();
            let result = bounded(timeout, opcode.apply(OPCODE_POWER_MODE, value)).await;
            if let Err(e) = result {
                self.record_failure(ChannelKind::Opcode, "set_power", &e.into());
            }
        }

        if let Some(cec) = self.cec.as_mut() {
            let result = if on {
                bounded(timeout, cec.power_on()).await
            } else {
                bounded(timeout, cec.standby()).await
            };
            if let Err(e) = result {
                self.record_failure(ChannelKind::Cec, "set_power", &e.into());
            }
        }
    }

    async fn read_power_mode(&mut self) -> Result<PowerMode, BridgeError> {
        let timeout = self.call_timeout;
        let opcode = self.opcode.as_mut().ok_or(ChannelError::Closed)?;
        let value = bounded(timeout, opcode.query(OPCODE_POWER_MODE)).await?;
        Ok(PowerMode::from_value(value.current))
    }

    /// Whether the display is on
    ///
    /// Reads the display when an opcode channel exists; only `On` counts,
    /// and an unreadable status counts as off. Without an opcode channel the
    /// last requested power is returned.
    pub async fn get_power(&mut self) -> bool {
        if self.opcode.is_none() {
            return self.state.power.is_on();
        }
        match self.read_power_mode().await {
            Ok(mode) => {
                debug!("Power mode: {:?}", mode);
                mode.is_on()
            }
            Err(e) => {
                self.record_failure(ChannelKind::Opcode, "get_power", &e);
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    /// Switch to the input at `position`
    ///
    /// The canonical input only changes once the display accepted the write.
    /// Without an opcode channel the selection is recorded as requested.
    pub async fn set_active_input(&mut self, position: InputPosition) {
        let code = match self.inputs.position_to_code(position) {
            Ok(code) => code,
            Err(miss) => {
                warn!("set_active_input: {}", miss);
                return;
            }
        };
        let name = self
            .inputs
            .get(position)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        info!("Change input to {} (position {}, code {})", name, position, code);

        let timeout = self.call_timeout;
        let Some(opcode) = self.opcode.as_mut() else {
            debug!("No opcode channel, input change to {} recorded only", name);
            self.state.active_input = position;
            return;
        };

        match bounded(timeout, opcode.apply(OPCODE_INPUT, code)).await {
            Ok(()) => self.state.active_input = position,
            Err(e) => self.record_failure(ChannelKind::Opcode, "set_active_input", &e.into()),
        }
    }

    async fn read_active_input(&mut self) -> Result<InputPosition, BridgeError> {
        let timeout = self.call_timeout;
        let opcode = self.opcode.as_mut().ok_or(ChannelError::Closed)?;
        let value = bounded(timeout, opcode.query(OPCODE_INPUT)).await?;
        Ok(self.inputs.code_to_position(value.current)?)
    }

    /// Read the active input position
    ///
    /// Always yields a configured position: a failed read or an unknown code
    /// yields the fallback input. Without an opcode channel the canonical
    /// position is returned.
    pub async fn poll_active_input(&mut self) -> InputPosition {
        if self.opcode.is_none() {
            return self.state.active_input;
        }
        match self.read_active_input().await {
            Ok(position) => position,
            Err(e) => {
                self.record_failure(ChannelKind::Opcode, "poll_active_input", &e);
                self.fallback_input
            }
        }
    }

    // -------------------------------------------------------------------------
    // Remote, mute, volume
    // -------------------------------------------------------------------------

    /// Handle a remote control key press
    ///
    /// Unmapped keys are dropped without touching any channel.
    pub async fn on_remote_key(&mut self, code: u8) {
        let Some(command) = key_code_to_navigation(code) else {
            debug!("Remote key {} has no display equivalent, ignored", code);
            return;
        };
        let ir_code = navigation_to_ir_code(command);
        info!("Remote key {} pressed: {:?} (IR 0x{:02X})", code, command, ir_code);
        self.send_ir("on_remote_key", ir_code).await;
    }

    /// Mute or unmute the speaker
    pub async fn set_mute(&mut self, muted: bool) {
        self.state.muted = muted;
        info!("{}", if muted { "Mute" } else { "Unmute" });

        let timeout = self.call_timeout;
        let Some(opcode) = self.opcode.as_mut() else {
            return;
        };
        let value = if muted { MUTE_ON } else { MUTE_OFF };
        if let Err(e) = bounded(timeout, opcode.apply(OPCODE_MUTE, value)).await {
            self.record_failure(ChannelKind::Opcode, "set_mute", &e.into());
        }
    }

    /// Step the volume up or down
    pub async fn on_volume_direction(&mut self, direction: VolumeDirection) {
        self.state.last_volume_intent = Some(direction);
        info!(
            "{} volume",
            match direction {
                VolumeDirection::Increase => "Increase",
                VolumeDirection::Decrease => "Decrease",
            }
        );
        self.send_ir("on_volume_direction", direction_to_ir_code(direction))
            .await;
    }

    async fn send_ir(&mut self, operation: &'static str, ir_code: u8) {
        let timeout = self.call_timeout;
        let Some(opcode) = self.opcode.as_mut() else {
            return;
        };
        if let Err(e) = bounded(timeout, opcode.send_command(ir_code)).await {
            warn!("{}: IR code 0x{:02X} not delivered", operation, ir_code);
            self.record_failure(ChannelKind::Opcode, operation, &e.into());
        }
    }

    // -------------------------------------------------------------------------
    // Reconciliation
    // -------------------------------------------------------------------------

    /// Re-read hardware truth and fold it into the canonical state
    ///
    /// Returns the values that changed; unchanged values produce nothing. A
    /// failed or unmappable read leaves the previous value in place. When the
    /// power read loses the link the input read is skipped, so one poll costs
    /// at most one call timeout.
    pub async fn reconcile(&mut self) -> Vec<StateChange> {
        let mut changes = Vec::new();
        if self.opcode.is_none() {
            return changes;
        }

        match self.read_power_mode().await {
            Ok(mode) => {
                let power = PowerState::from(mode.is_on());
                if power != self.state.power {
                    info!("Power is {:?} on the display (was {:?})", power, self.state.power);
                    self.state.power = power;
                    changes.push(StateChange::Power(power));
                }
            }
            Err(e) => {
                let link_lost = matches!(&e, BridgeError::Transport(c) if c.is_link_failure());
                self.record_failure(ChannelKind::Opcode, "reconcile power", &e);
                if link_lost {
                    debug!("Display unreachable, input read skipped");
                    return changes;
                }
            }
        }

        match self.read_active_input().await {
            Ok(position) => {
                if position != self.state.active_input {
                    info!(
                        "Input is {} on the display (was {})",
                        position, self.state.active_input
                    );
                    self.state.active_input = position;
                    changes.push(StateChange::ActiveInput(position));
                }
            }
            Err(e) => self.record_failure(ChannelKind::Opcode, "reconcile input", &e),
        }

        changes
    }

    /// Release both channels
    pub async fn close(&mut self) {
        if let Some(opcode) = self.opcode.as_mut() {
            opcode.close().await;
        }
        info!("Bridge channels released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ParameterValue;
    use crate::translation::InputSourceType;
    use tv_protocol::{ir, Opcode};

    /// What a fake channel was asked to do
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Query(Opcode),
        Apply(Opcode, u16),
        Ir(u8),
        PowerOn,
        Standby,
    }

    #[derive(Default)]
    struct FakeOpcode {
        calls: Vec<Call>,
        power: u16,
        input: u16,
        fail: bool,
        hang: bool,
    }

    impl FakeOpcode {
        fn with_input(input: u16) -> Self {
            Self {
                power: 1,
                input,
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        async fn outcome(&self) -> Result<(), ChannelError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(ChannelError::Closed);
            }
            Ok(())
        }
    }

    impl OpcodeChannel for FakeOpcode {
        async fn query(&mut self, opcode: Opcode) -> Result<ParameterValue, ChannelError> {
            self.calls.push(Call::Query(opcode));
            self.outcome().await?;
            let current = if opcode == OPCODE_POWER_MODE {
                self.power
            } else {
                self.input
            };
            Ok(ParameterValue { current, max: 255 })
        }

        async fn apply(&mut self, opcode: Opcode, value: u16) -> Result<(), ChannelError> {
            self.calls.push(Call::Apply(opcode, value));
            self.outcome().await?;
            if opcode == OPCODE_INPUT {
                self.input = value;
            } else if opcode == OPCODE_POWER_MODE {
                self.power = value;
            }
            Ok(())
        }

        async fn send_command(&mut self, code: u8) -> Result<(), ChannelError> {
            self.calls.push(Call::Ir(code));
            self.outcome().await
        }

        async fn close(&mut self) {}
    }

    #[derive(Default)]
    struct FakeCec {
        calls: Vec<Call>,
        fail: bool,
    }

    impl CecChannel for FakeCec {
        async fn power_on(&mut self) -> Result<(), ChannelError> {
            self.calls.push(Call::PowerOn);
            if self.fail {
                Err(ChannelError::Closed)
            } else {
                Ok(())
            }
        }

        async fn standby(&mut self) -> Result<(), ChannelError> {
            self.calls.push(Call::Standby);
            if self.fail {
                Err(ChannelError::Closed)
            } else {
                Ok(())
            }
        }
    }

    fn table() -> InputTable {
        InputTable::new([
            ("DisplayPort", 15, InputSourceType::Other),
            ("HDMI1", 17, InputSourceType::Hdmi),
        ])
    }

    fn bridge(opcode: Option<FakeOpcode>, cec: Option<FakeCec>) -> Bridge<FakeOpcode, FakeCec> {
        Bridge::new(table(), opcode, cec, BridgeOptions::default())
    }

    fn opcode_calls(bridge: &Bridge<FakeOpcode, FakeCec>) -> Vec<Call> {
        bridge.opcode_channel().map(|o| o.calls.clone()).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_set_input_dispatches_code_and_poll_reads_it_back() {
        let mut bridge = bridge(Some(FakeOpcode::with_input(15)), None);

        bridge.set_active_input(InputPosition(2)).await;
        assert_eq!(
            opcode_calls(&bridge),
            vec![Call::Apply(OPCODE_INPUT, 17)]
        );
        assert_eq!(bridge.state().active_input, InputPosition(2));
        assert_eq!(bridge.poll_active_input().await, InputPosition(2));
    }

    #[tokio::test]
    async fn test_failed_input_write_keeps_previous_position() {
        let mut bridge = bridge(Some(FakeOpcode::failing()), None);

        bridge.set_active_input(InputPosition(2)).await;
        assert_eq!(bridge.state().active_input, InputPosition(1));
        assert_eq!(bridge.drain_failures().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_position_is_not_sent() {
        let mut bridge = bridge(Some(FakeOpcode::with_input(15)), None);

        bridge.set_active_input(InputPosition(7)).await;
        assert!(opcode_calls(&bridge).is_empty());
        assert_eq!(bridge.state().active_input, InputPosition(1));
    }

    #[tokio::test]
    async fn test_failing_channel_yields_fallbacks() {
        let mut bridge = bridge(Some(FakeOpcode::failing()), None);

        for _ in 0..3 {
            assert_eq!(bridge.poll_active_input().await, InputPosition(2));
            assert!(!bridge.get_power().await);
        }
    }

    #[tokio::test]
    async fn test_unmapped_input_code_yields_fallback() {
        let mut bridge = Bridge::<FakeOpcode, FakeCec>::new(
            table(),
            Some(FakeOpcode::with_input(99)),
            None,
            BridgeOptions {
                fallback_input: Some(InputPosition(1)),
                ..Default::default()
            },
        );
        assert_eq!(bridge.poll_active_input().await, InputPosition(1));
    }

    #[tokio::test]
    async fn test_invalid_fallback_uses_last_source() {
        let bridge = Bridge::<FakeOpcode, FakeCec>::new(
            table(),
            None,
            None,
            BridgeOptions {
                fallback_input: Some(InputPosition(9)),
                ..Default::default()
            },
        );
        assert_eq!(bridge.fallback_input(), InputPosition(2));
    }

    #[tokio::test]
    async fn test_power_goes_to_both_channels_despite_opcode_failure() {
        let mut bridge = bridge(Some(FakeOpcode::failing()), Some(FakeCec::default()));

        bridge.set_power(true).await;

        assert_eq!(bridge.state().power, PowerState::On);
        assert_eq!(
            opcode_calls(&bridge),
            vec![Call::Apply(OPCODE_POWER_MODE, 1)]
        );
        assert_eq!(bridge.cec_channel().unwrap().calls, vec![Call::PowerOn]);

        let failures = bridge.drain_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].channel, ChannelKind::Opcode);
        assert_eq!(failures[0].operation, "set_power");
    }

    #[tokio::test]
    async fn test_power_off_uses_standby_on_cec() {
        let mut bridge = bridge(None, Some(FakeCec::default()));
        bridge.set_power(true).await;
        bridge.set_power(false).await;

        assert_eq!(
            bridge.cec_channel().unwrap().calls,
            vec![Call::PowerOn, Call::Standby]
        );
        assert_eq!(bridge.state().power, PowerState::Off);
    }

    #[tokio::test]
    async fn test_cec_failure_does_not_block_opcode() {
        let cec = FakeCec {
            fail: true,
            ..Default::default()
        };
        let mut bridge = bridge(Some(FakeOpcode::with_input(15)), Some(cec));

        bridge.set_power(false).await;
        assert_eq!(
            opcode_calls(&bridge),
            vec![Call::Apply(OPCODE_POWER_MODE, 4)]
        );
        assert_eq!(bridge.drain_failures()[0].channel, ChannelKind::Cec);
    }

    #[tokio::test]
    async fn test_get_power_without_opcode_channel_is_optimistic() {
        let mut bridge = bridge(None, Some(FakeCec::default()));
        assert!(!bridge.get_power().await);
        bridge.set_power(true).await;
        assert!(bridge.get_power().await);
    }

    #[tokio::test]
    async fn test_get_power_collapses_modes() {
        for (value, expected) in [(1, true), (2, false), (3, false), (4, false), (0, false)] {
            let opcode = FakeOpcode {
                power: value,
                ..Default::default()
            };
            let mut bridge = bridge(Some(opcode), None);
            assert_eq!(bridge.get_power().await, expected, "mode value {}", value);
        }
    }

    #[tokio::test]
    async fn test_unmapped_remote_keys_touch_nothing() {
        let mut bridge = bridge(Some(FakeOpcode::with_input(15)), None);
        for code in [0, 1, 2, 3, 11, 42] {
            bridge.on_remote_key(code).await;
        }
        assert!(opcode_calls(&bridge).is_empty());

        bridge.on_remote_key(4).await;
        bridge.on_remote_key(15).await;
        assert_eq!(
            opcode_calls(&bridge),
            vec![Call::Ir(ir::UP), Call::Ir(ir::MENU)]
        );
    }

    #[tokio::test]
    async fn test_mute_and_volume_are_recorded_and_dispatched() {
        let mut bridge = bridge(Some(FakeOpcode::with_input(15)), None);

        bridge.set_mute(true).await;
        bridge.on_volume_direction(VolumeDirection::Decrease).await;

        assert!(bridge.state().muted);
        assert_eq!(
            bridge.state().last_volume_intent,
            Some(VolumeDirection::Decrease)
        );
        assert_eq!(
            opcode_calls(&bridge),
            vec![Call::Apply(OPCODE_MUTE, MUTE_ON), Call::Ir(ir::VOLUME_DOWN)]
        );
    }

    #[tokio::test]
    async fn test_reconcile_reports_only_changes() {
        let mut bridge = bridge(Some(FakeOpcode::with_input(17)), None);

        let changes = bridge.reconcile().await;
        assert_eq!(
            changes,
            vec![
                StateChange::Power(PowerState::On),
                StateChange::ActiveInput(InputPosition(2))
            ]
        );
        assert!(bridge.reconcile().await.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_keeps_state_on_unmapped_code() {
        let mut bridge = bridge(Some(FakeOpcode::with_input(17)), None);
        bridge.reconcile().await;

        bridge.opcode.as_mut().unwrap().input = 99;
        assert!(bridge.reconcile().await.is_empty());
        assert_eq!(bridge.state().active_input, InputPosition(2));
    }

    #[tokio::test]
    async fn test_reconcile_corrects_failed_optimistic_power() {
        let mut bridge = bridge(Some(FakeOpcode::with_input(15)), None);
        bridge.opcode.as_mut().unwrap().power = 4;
        bridge.opcode.as_mut().unwrap().fail = true;
        bridge.set_power(true).await;
        assert_eq!(bridge.state().power, PowerState::On);

        bridge.opcode.as_mut().unwrap().fail = false;
        assert_eq!(
            bridge.reconcile().await,
            vec![StateChange::Power(PowerState::Off)]
        );
    }

    #[tokio::test]
    async fn test_reconcile_without_opcode_channel_is_a_no_op() {
        let mut bridge = bridge(None, Some(FakeCec::default()));
        bridge.set_power(true).await;
        assert!(bridge.reconcile().await.is_empty());
        assert_eq!(bridge.state().power, PowerState::On);
    }

    #[tokio::test]
    async fn test_input_without_opcode_channel_is_recorded() {
        let mut bridge = bridge(None, Some(FakeCec::default()));

        bridge.set_active_input(InputPosition(2)).await;
        assert_eq!(bridge.state().active_input, InputPosition(2));
        assert_eq!(bridge.poll_active_input().await, InputPosition(2));

        bridge.set_active_input(InputPosition(5)).await;
        assert_eq!(bridge.poll_active_input().await, InputPosition(2));
    }

    #[tokio::test]
    async fn test_reconcile_stops_after_lost_link() {
        let mut bridge = bridge(Some(FakeOpcode::failing()), None);

        assert!(bridge.reconcile().await.is_empty());
        assert_eq!(opcode_calls(&bridge), vec![Call::Query(OPCODE_POWER_MODE)]);
        let failures = bridge.drain_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].operation, "reconcile power");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_reconcile_costs_one_timeout() {
        let opcode = FakeOpcode {
            hang: true,
            ..Default::default()
        };
        let mut bridge = bridge(Some(opcode), None);

        let start = tokio::time::Instant::now();
        assert!(bridge.reconcile().await.is_empty());
        assert!(start.elapsed() < DEFAULT_CALL_TIMEOUT * 2);
        assert_eq!(opcode_calls(&bridge), vec![Call::Query(OPCODE_POWER_MODE)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_channel_times_out() {
        let opcode = FakeOpcode {
            hang: true,
            ..Default::default()
        };
        let mut bridge = Bridge::<FakeOpcode, FakeCec>::new(
            table(),
            Some(opcode),
            None,
            BridgeOptions {
                call_timeout: Duration::from_millis(500),
                ..Default::default()
            },
        );

        assert_eq!(bridge.poll_active_input().await, InputPosition(2));
        let failures = bridge.drain_failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].message.contains("500ms"));
    }
}
