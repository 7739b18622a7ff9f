//! Integration tests for the display bridge
//!
//! These tests drive the bridge against a simulated display and verify:
//! - Input switching and read-back through the translation table
//! - Power dispatch to both channels with independent failures
//! - Fallbacks when the opcode channel is broken or hangs
//! - Poll reconciliation and notifications through the actor
//! - The facade handle over a running actor

use std::time::Duration;

use tokio::sync::mpsc;
use tv_bridge::{
    run_bridge_actor, Bridge, BridgeConfig, BridgeEvent, BridgeHandle, BridgeOptions,
    Characteristic, ChannelKind, InputPosition, InputSourceType, InputTable, PowerState,
    StateChange, VolumeDirection,
};
use tv_protocol::{input, ir, PowerMode, OPCODE_INPUT};
use tv_sim::{Fault, SimCall, SimCecChannel, SimDisplay, SimOpcodeChannel, VirtualDisplay};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub type SimBridge = Bridge<SimOpcodeChannel, SimCecChannel>;

    /// The two-input table from the reference deployment
    pub fn display_port_hdmi() -> InputTable {
        InputTable::new([
            ("DisplayPort", input::DISPLAY_PORT, InputSourceType::Other),
            ("HDMI1", input::HDMI1, InputSourceType::Hdmi),
        ])
    }

    /// A bridge with both channels on one simulated display
    pub fn bridge_with_both() -> (SimBridge, SimDisplay) {
        let sim = SimDisplay::new(VirtualDisplay::new("lounge"));
        let bridge = Bridge::new(
            display_port_hdmi(),
            Some(sim.opcode_channel()),
            Some(sim.cec_channel()),
            BridgeOptions::default(),
        );
        (bridge, sim)
    }

    /// A bridge with only the opcode channel
    pub fn bridge_opcode_only() -> (SimBridge, SimDisplay) {
        let sim = SimDisplay::new(VirtualDisplay::new("lounge"));
        let bridge = Bridge::new(
            display_port_hdmi(),
            Some(sim.opcode_channel()),
            None,
            BridgeOptions::default(),
        );
        (bridge, sim)
    }

    /// Spawn an actor over a simulated display
    pub fn spawn_actor(
        bridge: SimBridge,
        poll_interval: Duration,
    ) -> (BridgeHandle, mpsc::Receiver<BridgeEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(64);
        tokio::spawn(run_bridge_actor(bridge, poll_interval, cmd_rx, event_tx));
        (BridgeHandle::new(cmd_tx), event_rx)
    }

    /// Receive the next notification, skipping error events
    pub async fn next_notification(events: &mut mpsc::Receiver<BridgeEvent>) -> StateChange {
        loop {
            match events.recv().await {
                Some(BridgeEvent::Notify(change)) => return change,
                Some(_) => continue,
                None => panic!("event stream ended"),
            }
        }
    }

    /// Accessory keys with a display equivalent
    pub const MAPPED_KEYS: [u8; 7] = [4, 5, 6, 7, 8, 9, 10];
}

use helpers::*;

// ============================================================================
// Input switching
// ============================================================================

#[tokio::test]
async fn test_set_input_dispatches_code_and_reads_back() {
    let (mut bridge, sim) = bridge_opcode_only();

    bridge.set_active_input(InputPosition(2)).await;
    assert_eq!(sim.calls(), vec![SimCall::Apply(OPCODE_INPUT, 17)]);
    assert_eq!(sim.snapshot().input(), input::HDMI1);

    assert_eq!(bridge.poll_active_input().await, InputPosition(2));
}

#[tokio::test]
async fn test_hardware_code_maps_to_position() {
    let (mut bridge, sim) = bridge_opcode_only();

    sim.with(|d| d.set_input(input::HDMI1));
    assert_eq!(bridge.poll_active_input().await, InputPosition(2));

    sim.with(|d| d.set_input(input::DISPLAY_PORT));
    assert_eq!(bridge.poll_active_input().await, InputPosition(1));
}

#[tokio::test]
async fn test_unknown_hardware_code_yields_fallback() {
    let (mut bridge, sim) = bridge_opcode_only();
    sim.with(|d| d.set_input(input::VGA));

    assert_eq!(bridge.poll_active_input().await, bridge.fallback_input());
    assert_eq!(bridge.state().active_input, InputPosition(1));
}

#[tokio::test]
async fn test_rejected_input_keeps_canonical_position() {
    let sim = SimDisplay::new(VirtualDisplay::new("narrow").with_inputs([input::DISPLAY_PORT]));
    let mut bridge = Bridge::new(
        display_port_hdmi(),
        Some(sim.opcode_channel()),
        None::<SimCecChannel>,
        BridgeOptions::default(),
    );

    bridge.set_active_input(InputPosition(2)).await;
    assert_eq!(bridge.state().active_input, InputPosition(1));
    let failures = bridge.drain_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].operation, "set_active_input");
}

// ============================================================================
// Power
// ============================================================================

#[tokio::test]
async fn test_power_on_with_opcode_failing_and_cec_working() {
    let (mut bridge, sim) = bridge_with_both();
    sim.set_opcode_fault(Fault::Fail);

    bridge.set_power(true).await;

    assert_eq!(bridge.state().power, PowerState::On);
    assert!(sim.snapshot().power_mode().is_on());
    assert_eq!(sim.call_count(ChannelKind::Opcode), 1);
    assert_eq!(sim.call_count(ChannelKind::Cec), 1);

    let failures = bridge.drain_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].channel, ChannelKind::Opcode);
}

#[tokio::test]
async fn test_power_off_reaches_both_channels() {
    let (mut bridge, sim) = bridge_with_both();
    bridge.set_power(true).await;
    sim.clear_calls();

    bridge.set_power(false).await;
    assert_eq!(
        sim.calls(),
        vec![
            SimCall::Apply(tv_protocol::OPCODE_POWER_MODE, 4),
            SimCall::CecStandby
        ]
    );
    // CEC standby lands last
    assert_eq!(sim.snapshot().power_mode(), PowerMode::Standby);
    assert!(!bridge.get_power().await);
}

#[tokio::test]
async fn test_get_power_only_counts_on() {
    let (mut bridge, sim) = bridge_opcode_only();
    for (value, expected) in [(1, true), (2, false), (3, false), (4, false), (9, false)] {
        sim.with(|d| d.set_power_mode_value(value));
        assert_eq!(bridge.get_power().await, expected, "power mode {}", value);
    }
}

#[tokio::test]
async fn test_broken_opcode_channel_never_surfaces() {
    let (mut bridge, sim) = bridge_opcode_only();
    sim.set_opcode_fault(Fault::Fail);

    for _ in 0..5 {
        assert_eq!(bridge.poll_active_input().await, bridge.fallback_input());
        assert!(!bridge.get_power().await);
    }
    assert_eq!(bridge.drain_failures().len(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_channel_is_bounded_by_timeout() {
    let sim = SimDisplay::new(VirtualDisplay::new("stuck"));
    sim.set_opcode_fault(Fault::Hang);
    let mut bridge = Bridge::new(
        display_port_hdmi(),
        Some(sim.opcode_channel()),
        Some(sim.cec_channel()),
        BridgeOptions {
            call_timeout: Duration::from_millis(250),
            ..Default::default()
        },
    );

    bridge.set_power(true).await;
    // CEC still ran after the opcode call timed out
    assert!(sim.snapshot().power_mode().is_on());
    assert!(!bridge.get_power().await);
}

// ============================================================================
// Remote, mute, volume
// ============================================================================

#[tokio::test]
async fn test_navigation_keys_become_ir_codes() {
    let (mut bridge, sim) = bridge_opcode_only();

    for code in [4, 5, 6, 7, 8, 9, 10, 15] {
        bridge.on_remote_key(code).await;
    }

    assert_eq!(
        sim.snapshot().ir_log(),
        &[
            ir::UP,
            ir::DOWN,
            ir::LEFT,
            ir::RIGHT,
            ir::SET,
            ir::EXIT,
            ir::EXIT,
            ir::MENU
        ]
    );
}

#[tokio::test]
async fn test_volume_and_mute() {
    let (mut bridge, sim) = bridge_opcode_only();
    let start = sim.snapshot().volume();

    bridge.on_volume_direction(VolumeDirection::Increase).await;
    bridge.on_volume_direction(VolumeDirection::Increase).await;
    bridge.on_volume_direction(VolumeDirection::Decrease).await;
    assert_eq!(sim.snapshot().volume(), start + 1);

    bridge.set_mute(true).await;
    assert!(sim.snapshot().muted());
    bridge.set_mute(true).await;
    assert!(sim.snapshot().muted(), "mute is absolute, not a toggle");
    bridge.set_mute(false).await;
    assert!(!sim.snapshot().muted());
}

// ============================================================================
// Reconciliation through the actor
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_out_of_band_change_is_notified_once() {
    let (bridge, sim) = bridge_with_both();
    let (_handle, mut events) = spawn_actor(bridge, Duration::from_secs(3));

    // Someone uses the display's own remote
    sim.with(|d| {
        d.set_power_mode_value(1);
        d.set_input(input::HDMI1);
    });

    assert_eq!(
        next_notification(&mut events).await,
        StateChange::Power(PowerState::On)
    );
    assert_eq!(
        next_notification(&mut events).await,
        StateChange::ActiveInput(InputPosition(2))
    );

    // Nothing changed on the following polls
    tokio::time::sleep(Duration::from_secs(10)).await;
    while let Ok(event) = events.try_recv() {
        assert!(!event.is_notification(), "unexpected {:?}", event);
    }
}

#[tokio::test(start_paused = true)]
async fn test_poll_corrects_optimistic_power() {
    let (bridge, sim) = bridge_opcode_only();
    sim.set_opcode_fault(Fault::Fail);
    let (handle, mut events) = spawn_actor(bridge, Duration::from_secs(3));

    handle.write_active(1).await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().power, PowerState::On);

    // The write never reached the display; the next good poll reports it off
    sim.set_opcode_fault(Fault::None);
    assert_eq!(
        next_notification(&mut events).await,
        StateChange::Power(PowerState::Off)
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_polls_keep_state_and_report_errors() {
    let (bridge, sim) = bridge_opcode_only();
    sim.with(|d| d.set_input(input::HDMI1));
    let (handle, mut events) = spawn_actor(bridge, Duration::from_secs(3));

    handle.write_active_identifier(2).await.unwrap();
    // Round trip so the write is applied before the link breaks
    handle.snapshot().await.unwrap();
    sim.set_opcode_fault(Fault::Fail);

    match events.recv().await {
        Some(BridgeEvent::HardwareError { channel, .. }) => assert_eq!(channel, ChannelKind::Opcode),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        handle.snapshot().await.unwrap().active_input,
        InputPosition(2)
    );
}

// ============================================================================
// Facade
// ============================================================================

#[tokio::test]
async fn test_facade_round_trip() {
    let (bridge, sim) = bridge_with_both();
    let (handle, _events) = spawn_actor(bridge, Duration::from_secs(3600));

    handle.write(Characteristic::Active, 1).await.unwrap();
    handle.write(Characteristic::ActiveIdentifier, 2).await.unwrap();
    handle.write(Characteristic::RemoteKey, 8).await.unwrap();
    handle.write(Characteristic::Mute, 1).await.unwrap();

    assert_eq!(handle.read(Characteristic::Active).await.unwrap(), Some(1));
    assert_eq!(
        handle.read(Characteristic::ActiveIdentifier).await.unwrap(),
        Some(2)
    );
    assert_eq!(handle.read(Characteristic::Mute).await.unwrap(), Some(1));
    assert_eq!(handle.read(Characteristic::RemoteKey).await.unwrap(), None);

    let display = sim.snapshot();
    assert!(display.power_mode().is_on());
    assert_eq!(display.input(), input::HDMI1);
    assert_eq!(display.ir_log(), &[ir::SET]);
}

#[tokio::test]
async fn test_shutdown_stops_actor() {
    let (bridge, _sim) = bridge_opcode_only();
    let (handle, mut events) = spawn_actor(bridge, Duration::from_secs(3600));

    handle.shutdown().await.unwrap();
    loop {
        match events.recv().await {
            Some(BridgeEvent::Stopped) => break,
            Some(_) => continue,
            None => panic!("actor ended without Stopped"),
        }
    }
    assert!(handle.read_active().await.is_err());
}

#[tokio::test]
async fn test_profile_config_drives_a_bridge() {
    let config = BridgeConfig::profile("hdmi_triple").unwrap();
    let sim = SimDisplay::new(VirtualDisplay::new("triple"));
    let mut bridge = Bridge::new(
        config.input_table(),
        Some(sim.opcode_channel()),
        None::<SimCecChannel>,
        config.bridge_options(),
    );

    bridge.set_active_input(InputPosition(3)).await;
    assert_eq!(sim.snapshot().input(), input::HDMI3);
    assert_eq!(bridge.poll_active_input().await, InputPosition(3));
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn unmapped_keys_make_no_calls(code in any::<u8>()) {
            prop_assume!(!MAPPED_KEYS.contains(&code) && code != 15);
            let calls = runtime().block_on(async {
                let (mut bridge, sim) = bridge_with_both();
                bridge.on_remote_key(code).await;
                sim.calls()
            });
            prop_assert!(calls.is_empty());
        }

        #[test]
        fn set_then_poll_returns_position(position in 1u8..=2) {
            let polled = runtime().block_on(async {
                let (mut bridge, _sim) = bridge_opcode_only();
                bridge.set_active_input(InputPosition(position)).await;
                bridge.poll_active_input().await
            });
            prop_assert_eq!(polled, InputPosition(position));
        }

        #[test]
        fn reconcile_notifies_iff_changed(power_value in 0u16..6, code in prop::sample::select(vec![1u16, 15, 17, 18])) {
            let (before, changes, after) = runtime().block_on(async {
                let (mut bridge, sim) = bridge_opcode_only();
                sim.with(|d| {
                    d.set_power_mode_value(power_value);
                    d.set_input(code);
                });
                let before = bridge.state().clone();
                let changes = bridge.reconcile().await;
                (before, changes, bridge.state().clone())
            });

            let power_changed = before.power != after.power;
            let input_changed = before.active_input != after.active_input;
            prop_assert_eq!(changes.len(), power_changed as usize + input_changed as usize);
            prop_assert_eq!(after.power.is_on(), power_value == 1);
        }
    }
}
