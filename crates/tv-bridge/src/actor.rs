//! Bridge actor
//!
//! Runs a [`Bridge`] on its own task. Facade writes and reads arrive as
//! [`BridgeCommand`]s; a reconciliation poll runs on a fixed interval in the
//! same loop, so hardware calls are never issued concurrently.
//!
//! # Example
//!
//! ```rust,ignore
//! use tv_bridge::actor::{run_bridge_actor, BridgeCommand};
//! use tokio::sync::mpsc;
//!
//! let (cmd_tx, cmd_rx) = mpsc::channel(64);
//! let (event_tx, mut event_rx) = mpsc::channel(64);
//!
//! tokio::spawn(run_bridge_actor(bridge, poll_interval, cmd_rx, event_tx));
//! ```

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::channel::{CecChannel, OpcodeChannel};
use crate::engine::Bridge;
use crate::events::BridgeEvent;
use crate::state::CanonicalState;
use crate::translation::{InputPosition, VolumeDirection};

/// Commands sent to the bridge actor
#[derive(Debug)]
pub enum BridgeCommand {
    /// Switch the display on or off
    SetPower {
        /// Requested power
        on: bool,
    },

    /// Read the power state
    GetPower {
        /// Channel to send back the result
        response: oneshot::Sender<bool>,
    },

    /// Switch input
    SetActiveInput {
        /// Position in the input table
        position: InputPosition,
    },

    /// Read the active input
    GetActiveInput {
        /// Channel to send back the position
        response: oneshot::Sender<InputPosition>,
    },

    /// Remote control key press
    RemoteKey {
        /// Accessory key code
        code: u8,
    },

    /// Mute or unmute
    SetMute {
        /// Requested mute state
        muted: bool,
    },

    /// Relative volume step
    VolumeSelector {
        /// Step direction
        direction: VolumeDirection,
    },

    /// Snapshot the canonical state
    GetState {
        /// Channel to send back the snapshot
        response: oneshot::Sender<CanonicalState>,
    },

    /// Run a reconciliation poll now
    Reconcile,

    /// Release the channels and stop
    Shutdown,
}

/// Queue an event without waiting on the consumer
///
/// A consumer that stops reading must not stall the bridge, so a full queue
/// drops the event.
fn emit(event_tx: &mpsc::Sender<BridgeEvent>, event: BridgeEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(event)) => {
            warn!("Event queue full, dropped {:?}", event);
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}

fn emit_failures<O: OpcodeChannel, C: CecChannel>(
    bridge: &mut Bridge<O, C>,
    event_tx: &mpsc::Sender<BridgeEvent>,
) {
    for failure in bridge.drain_failures() {
        emit(
            event_tx,
            BridgeEvent::HardwareError {
                channel: failure.channel,
                operation: failure.operation,
                message: failure.message,
            },
        );
    }
}

async fn reconcile_and_notify<O: OpcodeChannel, C: CecChannel>(
    bridge: &mut Bridge<O, C>,
    event_tx: &mpsc::Sender<BridgeEvent>,
) {
    for change in bridge.reconcile().await {
        debug!(
            "Notifying {:?} = {}",
            change.characteristic(),
            change.value()
        );
        emit(event_tx, BridgeEvent::Notify(change));
    }
}

/// Run the bridge actor
///
/// This function runs until a [`BridgeCommand::Shutdown`] arrives or every
/// command sender is dropped. The first poll happens one interval after
/// start. Queued commands are served before a due poll. Events are queued
/// without waiting; a full event queue drops them. On exit the channels are
/// released and [`BridgeEvent::Stopped`] is emitted.
pub async fn run_bridge_actor<O: OpcodeChannel, C: CecChannel>(
    mut bridge: Bridge<O, C>,
    poll_interval: Duration,
    mut cmd_rx: mpsc::Receiver<BridgeCommand>,
    event_tx: mpsc::Sender<BridgeEvent>,
) {
    info!("Bridge actor started, polling every {:?}", poll_interval);

    let mut poll_timer = interval_at(Instant::now() + poll_interval, poll_interval);
    poll_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break; };
                match cmd {
                    BridgeCommand::SetPower { on } => {
                        bridge.set_power(on).await;
                    }

                    BridgeCommand::GetPower { response } => {
                        let _ = response.send(bridge.get_power().await);
                    }

                    BridgeCommand::SetActiveInput { position } => {
                        bridge.set_active_input(position).await;
                    }

                    BridgeCommand::GetActiveInput { response } => {
                        let _ = response.send(bridge.poll_active_input().await);
                    }

                    BridgeCommand::RemoteKey { code } => {
                        bridge.on_remote_key(code).await;
                    }

                    BridgeCommand::SetMute { muted } => {
                        bridge.set_mute(muted).await;
                    }

                    BridgeCommand::VolumeSelector { direction } => {
                        bridge.on_volume_direction(direction).await;
                    }

                    BridgeCommand::GetState { response } => {
                        let _ = response.send(bridge.state().clone());
                    }

                    BridgeCommand::Reconcile => {
                        reconcile_and_notify(&mut bridge, &event_tx).await;
                    }

                    BridgeCommand::Shutdown => {
                        info!("Bridge actor shutting down");
                        break;
                    }
                }
                emit_failures(&mut bridge, &event_tx);
            }

            _ = poll_timer.tick() => {
                reconcile_and_notify(&mut bridge, &event_tx).await;
                emit_failures(&mut bridge, &event_tx);
            }
        }
    }

    bridge.close().await;
    emit(&event_tx, BridgeEvent::Stopped);
    info!("Bridge actor stopped");
}
