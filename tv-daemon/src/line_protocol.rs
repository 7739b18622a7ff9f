//! JSON-lines facade
//!
//! The accessory runtime talks to the daemon one JSON object per line:
//!
//! ```text
//! -> {"op":"write","characteristic":"Active","value":1}
//! <- {"op":"ok"}
//! -> {"op":"read","characteristic":"ActiveIdentifier"}
//! <- {"op":"value","characteristic":"ActiveIdentifier","value":2}
//! <- {"op":"notify","characteristic":"Active","value":0}
//! ```
//!
//! Notifications are unsolicited and may arrive between any two replies.

use serde::{Deserialize, Serialize};
use tv_bridge::{BridgeHandle, CanonicalState, Characteristic, StateChange, TelevisionProfile};

/// A line from the accessory runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Characteristic written by a controller
    Write {
        /// Characteristic
        characteristic: Characteristic,
        /// Raw value
        value: u32,
    },
    /// Characteristic read by a controller
    Read {
        /// Characteristic
        characteristic: Characteristic,
    },
    /// Publishable profile
    Profile,
    /// Canonical state snapshot
    State,
}

/// A line to the accessory runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Response {
    /// Write accepted
    Ok,
    /// Read result
    Value {
        /// Characteristic
        characteristic: Characteristic,
        /// Raw value
        value: u32,
    },
    /// Out-of-band change
    Notify {
        /// Characteristic
        characteristic: Characteristic,
        /// Raw value
        value: u32,
    },
    /// Profile
    Profile {
        /// Services to publish
        profile: TelevisionProfile,
    },
    /// State snapshot
    State {
        /// Canonical state
        state: CanonicalState,
    },
    /// Malformed request or stopped bridge
    Error {
        /// What went wrong
        message: String,
    },
}

impl Response {
    /// Notification for a reconciled change
    pub fn notify(change: StateChange) -> Self {
        Self::Notify {
            characteristic: change.characteristic(),
            value: change.value(),
        }
    }

    fn error(message: impl ToString) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }

    /// Encode as one line (without the newline)
    pub fn to_line(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"op":"error","message":"{}"}}"#, e))
    }
}

/// Answer one request line
///
/// Blank lines produce no response.
pub async fn handle_line(
    handle: &BridgeHandle,
    profile: &TelevisionProfile,
    line: &str,
) -> Option<Response> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return Some(Response::error(format!("bad request: {}", e))),
    };

    let response = match request {
        Request::Write {
            characteristic,
            value,
        } => match handle.write(characteristic, value).await {
            Ok(()) => Response::Ok,
            Err(e) => Response::error(e),
        },
        Request::Read { characteristic } => match handle.read(characteristic).await {
            Ok(Some(value)) => Response::Value {
                characteristic,
                value,
            },
            Ok(None) => Response::error(format!("{:?} is write-only", characteristic)),
            Err(e) => Response::error(e),
        },
        Request::Profile => Response::Profile {
            profile: profile.clone(),
        },
        Request::State => match handle.snapshot().await {
            Ok(state) => Response::State { state },
            Err(e) => Response::error(e),
        },
    };
    Some(response)
}
