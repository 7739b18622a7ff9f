//! CEC channel client
//!
//! Drives the libcec command line client as a child process. Each call runs
//! `cec-client` in single-command mode and feeds it one command on stdin:
//!
//! - `on <addr>` - wake the device at logical address `addr`
//! - `standby <addr>` - put it in standby
//!
//! The child is killed if the call is dropped (e.g. by the bridge's call
//! timeout).

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::channel::CecChannel;
use crate::error::ChannelError;

/// Logical address of the TV on the CEC bus
pub const TV_LOGICAL_ADDRESS: u8 = 0;

/// Default client binary
pub const DEFAULT_CEC_BINARY: &str = "cec-client";

/// CEC bus access through `cec-client`
#[derive(Debug, Clone)]
pub struct CecClient {
    binary: String,
    logical_address: u8,
    port: Option<String>,
}

impl CecClient {
    /// Create a client that controls the device at `logical_address`
    ///
    /// `port` selects a specific adapter; `None` lets libcec pick the first.
    pub fn new(binary: impl Into<String>, logical_address: u8, port: Option<String>) -> Self {
        Self {
            binary: binary.into(),
            logical_address,
            port,
        }
    }

    /// Logical address commands are sent to
    pub fn logical_address(&self) -> u8 {
        self.logical_address
    }

    /// Check that an adapter is present
    pub async fn init(&self) -> Result<(), ChannelError> {
        let output = Command::new(&self.binary)
            .arg("-l")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.process_error(format!("failed to run: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() || stdout.contains("Found devices: NONE") {
            return Err(self.process_error("no CEC adapter found".into()));
        }
        info!("CEC adapter available via {}", self.binary);
        Ok(())
    }

    /// Arguments for a single-command run
    fn args(&self) -> Vec<String> {
        let mut args = vec!["-s".to_string(), "-d".to_string(), "1".to_string()];
        if let Some(port) = &self.port {
            args.push(port.clone());
        }
        args
    }

    fn script(&self, verb: &str) -> String {
        format!("{} {}\n", verb, self.logical_address)
    }

    async fn run(&self, verb: &str) -> Result<(), ChannelError> {
        let script = self.script(verb);
        debug!("Running {} {:?} with {:?}", self.binary, self.args(), script.trim());

        let mut child = Command::new(&self.binary)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.process_error(format!("failed to spawn: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = match stdin.write_all(script.as_bytes()).await {
                Ok(()) => stdin.shutdown().await,
                Err(e) => Err(e),
            };
            // A child that exits without reading is judged by its exit status
            match written {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e.into()),
                _ => {}
            }
        }

        let output = child.wait_with_output().await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(self.process_error(format!("{} ({})", output.status, stderr.trim())))
        }
    }

    fn process_error(&self, message: String) -> ChannelError {
        ChannelError::Process {
            program: self.binary.clone(),
            message,
        }
    }
}

impl Default for CecClient {
    fn default() -> Self {
        Self::new(DEFAULT_CEC_BINARY, TV_LOGICAL_ADDRESS, None)
    }
}

impl CecChannel for CecClient {
    async fn power_on(&mut self) -> Result<(), ChannelError> {
        self.run("on").await
    }

    async fn standby(&mut self) -> Result<(), ChannelError> {
        self.run("standby").await
    }
}
