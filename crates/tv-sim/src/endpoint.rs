//! Virtual display endpoint task
//!
//! Serves a [`SimDisplay`] over a byte stream using the real frame format,
//! so the bridge's opcode client can be exercised end to end over an
//! in-memory duplex stream. The task uses a select! loop to:
//! - Read request frames from the stream and answer them
//! - Handle shutdown commands from a channel
//!
//! The opcode channel fault of the display applies here too: `Fail` drops
//! the connection, `Hang` swallows requests without a reply.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tv_protocol::{Address, FrameCodec, ProtocolError, Request, OPCODE_POWER_MODE};

use crate::channels::{Fault, SimCall, SimDisplay};

/// Commands that can be sent to a virtual display endpoint
#[derive(Debug, Clone)]
pub enum EndpointCommand {
    /// Stop serving and close the stream
    Shutdown,
}

/// Run the virtual display endpoint
///
/// Frames addressed to the display's monitor ID or to all monitors are
/// answered; anything else is ignored, as on a shared serial line. Returns
/// when the stream closes, a shutdown arrives, or a `Fail` fault is set.
pub async fn run_virtual_display_task<S>(
    mut stream: S,
    display: SimDisplay,
    mut cmd_rx: mpsc::Receiver<EndpointCommand>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (id, monitor_id) = display.with(|d| (d.id().to_string(), d.monitor_id()));
    let own_address = Address::monitor(monitor_id)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let mut codec = FrameCodec::new();
    let mut buf = [0u8; 512];

    info!("Starting virtual display endpoint {} (monitor {})", id, monitor_id);

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                let n = match result {
                    Ok(0) => {
                        debug!("Virtual display {} stream closed", id);
                        break;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        warn!("Virtual display {} stream error: {}", id, e);
                        return Err(e);
                    }
                };
                debug!("Virtual display {} received {} bytes: {:02X?}", id, n, &buf[..n]);
                codec.push_bytes(&buf[..n]);

                while let Some(parsed) = codec.next_frame() {
                    let frame = match parsed {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("Virtual display {} dropped bad frame: {}", id, e);
                            continue;
                        }
                    };
                    if frame.destination != own_address && frame.destination != Address::BROADCAST {
                        continue;
                    }
                    let parsed = Request::from_frame(&frame)
                        .map_err(ProtocolError::from)
                        .and_then(Request::normalized);
                    let request = match parsed {
                        Ok(request) => request,
                        Err(e) => {
                            warn!("Virtual display {} ignored request: {}", id, e);
                            continue;
                        }
                    };

                    match display.record(as_call(request)) {
                        Fault::None => {}
                        Fault::Fail => {
                            info!("Virtual display {} dropping connection", id);
                            return Ok(());
                        }
                        Fault::Hang => continue,
                    }

                    let reply = display.with(|d| d.handle_request(request));
                    let out = reply.to_frame(own_address, frame.message_type).encode();
                    debug!("Virtual display {} replying {:02X?}", id, out);
                    stream.write_all(&out).await?;
                    stream.flush().await?;
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(EndpointCommand::Shutdown) => {
                        info!("Shutdown requested for virtual display {}", id);
                        break;
                    }
                    None => {
                        debug!("Command channel closed for virtual display {}", id);
                        break;
                    }
                }
            }
        }
    }

    let _ = stream.shutdown().await;
    info!("Virtual display endpoint ended for {}", id);
    Ok(())
}

fn as_call(request: Request) -> SimCall {
    match request {
        Request::GetParameter(opcode) => SimCall::Query(opcode),
        Request::SetParameter(opcode, value) => SimCall::Apply(opcode, value),
        Request::PowerControl(mode) => {
            SimCall::Apply(OPCODE_POWER_MODE, mode.to_value().unwrap_or(0))
        }
        Request::RemoteKey(code) => SimCall::Command(code),
    }
}
