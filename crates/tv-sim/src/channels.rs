//! Hardware channels backed by a virtual display
//!
//! [`SimDisplay`] is a shared handle to one [`VirtualDisplay`]. It hands out
//! an opcode channel and a CEC channel that both act on the same display,
//! so a test can drive the bridge and then inspect or change the hardware
//! behind its back. Each channel can be told to fail or hang.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;
use tv_bridge::{CecChannel, ChannelError, ChannelKind, OpcodeChannel, ParameterValue};
use tv_protocol::{Opcode, Reply, Request};

use crate::display::{CecCommand, VirtualDisplay};

/// How a simulated channel behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    /// Calls reach the display
    #[default]
    None,
    /// Calls fail immediately with a closed connection
    Fail,
    /// Calls never complete
    Hang,
}

/// A call as it reached a simulated channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimCall {
    /// Parameter query
    Query(Opcode),
    /// Parameter write
    Apply(Opcode, u16),
    /// IR key
    Command(u8),
    /// CEC power on
    CecPowerOn,
    /// CEC standby
    CecStandby,
}

impl SimCall {
    /// Channel the call went to
    pub fn channel(&self) -> ChannelKind {
        match self {
            Self::CecPowerOn | Self::CecStandby => ChannelKind::Cec,
            _ => ChannelKind::Opcode,
        }
    }
}

#[derive(Debug)]
struct Shared {
    display: VirtualDisplay,
    opcode_fault: Fault,
    cec_fault: Fault,
    calls: Vec<SimCall>,
}

/// Shared handle to a virtual display
#[derive(Debug, Clone)]
pub struct SimDisplay {
    shared: Arc<Mutex<Shared>>,
}

impl SimDisplay {
    /// Wrap a display
    pub fn new(display: VirtualDisplay) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                display,
                opcode_fault: Fault::None,
                cec_fault: Fault::None,
                calls: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // A panicking test thread must not hide the display from the others
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Opcode channel acting on this display
    pub fn opcode_channel(&self) -> SimOpcodeChannel {
        SimOpcodeChannel {
            display: self.clone(),
        }
    }

    /// CEC channel acting on this display
    pub fn cec_channel(&self) -> SimCecChannel {
        SimCecChannel {
            display: self.clone(),
        }
    }

    /// Run `f` on the display
    pub fn with<R>(&self, f: impl FnOnce(&mut VirtualDisplay) -> R) -> R {
        f(&mut self.lock().display)
    }

    /// Copy of the display's current state
    pub fn snapshot(&self) -> VirtualDisplay {
        self.lock().display.clone()
    }

    /// Set the opcode channel's behaviour
    pub fn set_opcode_fault(&self, fault: Fault) {
        self.lock().opcode_fault = fault;
    }

    /// Set the CEC channel's behaviour
    pub fn set_cec_fault(&self, fault: Fault) {
        self.lock().cec_fault = fault;
    }

    /// Opcode channel behaviour
    pub fn opcode_fault(&self) -> Fault {
        self.lock().opcode_fault
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> Vec<SimCall> {
        self.lock().calls.clone()
    }

    /// Number of calls made on `channel`
    pub fn call_count(&self, channel: ChannelKind) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.channel() == channel)
            .count()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Record a call and report the fault for its channel
    pub(crate) fn record(&self, call: SimCall) -> Fault {
        let mut shared = self.lock();
        shared.calls.push(call);
        match call.channel() {
            ChannelKind::Opcode => shared.opcode_fault,
            ChannelKind::Cec => shared.cec_fault,
        }
    }

    /// Apply a fault before a call goes through
    async fn gate(&self, call: SimCall) -> Result<(), ChannelError> {
        match self.record(call) {
            Fault::None => Ok(()),
            Fault::Fail => {
                debug!("Simulated {} failure for {:?}", call.channel(), call);
                Err(ChannelError::Closed)
            }
            Fault::Hang => {
                debug!("Simulated {} hang for {:?}", call.channel(), call);
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    fn request(&self, request: Request) -> Reply {
        self.lock().display.handle_request(request)
    }
}

fn parameter_result(opcode: Opcode, reply: Reply) -> Result<ParameterValue, ChannelError> {
    match reply {
        Reply::Parameter(p) if p.is_ok() => Ok(ParameterValue {
            current: p.current,
            max: p.max,
        }),
        Reply::Parameter(p) => Err(ChannelError::Rejected {
            opcode,
            result: p.result,
        }),
        Reply::PowerControl { result: 0, mode } => Ok(ParameterValue {
            current: mode.to_value().unwrap_or(0),
            max: 4,
        }),
        Reply::PowerControl { result, .. } => Err(ChannelError::Rejected { opcode, result }),
        other => Err(ChannelError::UnexpectedReply(format!("{:?}", other))),
    }
}

/// Opcode channel of a [`SimDisplay`]
#[derive(Debug, Clone)]
pub struct SimOpcodeChannel {
    display: SimDisplay,
}

impl OpcodeChannel for SimOpcodeChannel {
    async fn query(&mut self, opcode: Opcode) -> Result<ParameterValue, ChannelError> {
        self.display.gate(SimCall::Query(opcode)).await?;
        parameter_result(opcode, self.display.request(Request::GetParameter(opcode)))
    }

    async fn apply(&mut self, opcode: Opcode, value: u16) -> Result<(), ChannelError> {
        self.display.gate(SimCall::Apply(opcode, value)).await?;
        let request = Request::SetParameter(opcode, value).normalized()?;
        parameter_result(opcode, self.display.request(request)).map(|_| ())
    }

    async fn send_command(&mut self, code: u8) -> Result<(), ChannelError> {
        self.display.gate(SimCall::Command(code)).await?;
        match self.display.request(Request::RemoteKey(code)) {
            Reply::RemoteKey { code: echoed } if echoed == code => Ok(()),
            other => Err(ChannelError::UnexpectedReply(format!("{:?}", other))),
        }
    }

    async fn close(&mut self) {}
}

/// CEC channel of a [`SimDisplay`]
#[derive(Debug, Clone)]
pub struct SimCecChannel {
    display: SimDisplay,
}

impl CecChannel for SimCecChannel {
    async fn power_on(&mut self) -> Result<(), ChannelError> {
        self.display.gate(SimCall::CecPowerOn).await?;
        self.display.with(|d| d.handle_cec(CecCommand::PowerOn));
        Ok(())
    }

    async fn standby(&mut self) -> Result<(), ChannelError> {
        self.display.gate(SimCall::CecStandby).await?;
        self.display.with(|d| d.handle_cec(CecCommand::Standby));
        Ok(())
    }
}
