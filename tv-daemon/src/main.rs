//! tvbridge daemon
//!
//! Exposes a commercial display as a television accessory. The accessory
//! runtime talks to this process over stdin/stdout (see [`line_protocol`]);
//! logs go to stderr.

mod error;
mod line_protocol;
mod settings;

use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tv_bridge::{
    run_bridge_actor, Bridge, BridgeConfig, BridgeEvent, BridgeHandle, CecClient, NecClient,
    TelevisionProfile, TransportConnector,
};

use error::DaemonError;
use line_protocol::{handle_line, Response};
use settings::Args;

type DisplayBridge = Bridge<NecClient<TransportConnector>, CecClient>;

/// Acquire the hardware channels and build the bridge
///
/// A display that is unreachable at startup is not fatal: the opcode client
/// reconnects on its next call. A missing CEC adapter disables the CEC
/// channel.
async fn build_bridge(config: &BridgeConfig) -> Result<DisplayBridge, DaemonError> {
    let opcode = match config.opcode.connector() {
        Some(connector) => {
            let mut client = NecClient::new(connector, config.opcode.monitor_id)?;
            if let Err(e) = client.open().await {
                warn!("Display not reachable yet: {}", e);
            }
            Some(client)
        }
        None => {
            info!("No opcode channel configured");
            None
        }
    };

    let cec = match config.cec.client() {
        Some(client) => match client.init().await {
            Ok(()) => Some(client),
            Err(e) => {
                warn!("CEC channel disabled: {}", e);
                None
            }
        },
        None => None,
    };

    Ok(Bridge::new(
        config.input_table(),
        opcode,
        cec,
        config.bridge_options(),
    ))
}

/// Write response lines to stdout in order
async fn run_writer(mut lines: mpsc::Receiver<Response>) {
    let mut stdout = tokio::io::stdout();
    while let Some(response) = lines.recv().await {
        let mut line = response.to_line();
        line.push('\n');
        if let Err(e) = stdout.write_all(line.as_bytes()).await {
            warn!("Failed to write to stdout: {}", e);
            break;
        }
        let _ = stdout.flush().await;
    }
}

/// Forward bridge events; returns once the actor has stopped
async fn run_event_forwarder(
    mut events: mpsc::Receiver<BridgeEvent>,
    out_tx: mpsc::Sender<Response>,
) {
    while let Some(event) = events.recv().await {
        match event {
            BridgeEvent::Notify(change) => {
                let _ = out_tx.send(Response::notify(change)).await;
            }
            BridgeEvent::HardwareError {
                channel,
                operation,
                message,
            } => {
                debug!("{} channel error during {}: {}", channel, operation, message);
            }
            BridgeEvent::Stopped => break,
        }
    }
}

/// Answer request lines until the input ends or `shutdown` completes
///
/// The shutdown future lives across iterations, so a signal that arrives
/// while a request is being handled is seen on the next pass.
async fn serve_lines<R: AsyncBufRead + Unpin>(
    input: R,
    handle: &BridgeHandle,
    profile: &TelevisionProfile,
    out_tx: &mpsc::Sender<Response>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if let Some(response) = handle_line(handle, profile, &line).await {
                            let _ = out_tx.send(response).await;
                        }
                    }
                    Ok(None) => {
                        info!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
            _ = &mut shutdown => break,
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the facade protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tvbridge=info,tv_protocol=info,tv_bridge=info,tv_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse(std::env::args().skip(1))?;
    let config = settings::load(&args.source)?;

    if args.init {
        let path = settings::config_path()
            .ok_or_else(|| DaemonError::Usage("could not determine config path".into()))?;
        settings::save(&config, &path)?;
        return Ok(());
    }

    info!("Starting tvbridge for {}", config.name);

    let profile = config.television_profile();
    let bridge = build_bridge(&config).await?;

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (out_tx, out_rx) = mpsc::channel(64);

    let actor = tokio::spawn(run_bridge_actor(
        bridge,
        config.poll_interval(),
        cmd_rx,
        event_tx,
    ));
    let writer = tokio::spawn(run_writer(out_rx));
    let forwarder = tokio::spawn(run_event_forwarder(event_rx, out_tx.clone()));

    let handle = BridgeHandle::new(cmd_tx);
    let _ = out_tx
        .send(Response::Profile {
            profile: profile.clone(),
        })
        .await;

    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            _ = terminate() => info!("Terminated"),
        }
    };
    serve_lines(
        BufReader::new(tokio::io::stdin()),
        &handle,
        &profile,
        &out_tx,
        shutdown,
    )
    .await;

    let _ = handle.shutdown().await;
    drop(handle);
    let _ = actor.await;
    let _ = forwarder.await;
    drop(out_tx);
    let _ = writer.await;

    info!("tvbridge stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tv_bridge::{AccessoryInfo, InputSourceType, InputTable};

    fn profile() -> TelevisionProfile {
        let inputs = InputTable::new([("HDMI1", 17u16, InputSourceType::Hdmi)]);
        TelevisionProfile::new("TV", AccessoryInfo::default(), &inputs)
    }

    #[tokio::test]
    async fn test_shutdown_stops_serving_while_input_is_open() {
        let (mut client, server) = tokio::io::duplex(256);
        let (cmd_tx, _cmd_rx) = mpsc::channel(8);
        let handle = BridgeHandle::new(cmd_tx);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            serve_lines(BufReader::new(server), &handle, &profile(), &out_tx, async {
                let _ = stop_rx.await;
            })
            .await;
        });

        client.write_all(b"{\"op\":\"profile\"}\n").await.unwrap();
        assert!(matches!(out_rx.recv().await, Some(Response::Profile { .. })));

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        drop(client);
    }

    #[tokio::test]
    async fn test_input_end_stops_serving() {
        let (client, server) = tokio::io::duplex(64);
        let (cmd_tx, _cmd_rx) = mpsc::channel(8);
        let handle = BridgeHandle::new(cmd_tx);
        let (out_tx, _out_rx) = mpsc::channel(8);
        drop(client);

        serve_lines(
            BufReader::new(server),
            &handle,
            &profile(),
            &out_tx,
            std::future::pending(),
        )
        .await;
    }
}
