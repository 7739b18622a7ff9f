//! Display Simulation Library
//!
//! This crate provides a simulation layer for testing the bridge without a
//! physical display. It includes:
//!
//! - **VirtualDisplay**: display registers with protocol-accurate replies
//! - **SimDisplay**: shared handle that hands out opcode and CEC channels
//!   acting on one display, with fault injection and a call log
//! - **run_virtual_display_task**: serves a display over a byte stream in
//!   the real frame format
//!
//! # Example
//!
//! ```rust
//! use tv_sim::{Fault, SimDisplay, VirtualDisplay};
//!
//! let sim = SimDisplay::new(VirtualDisplay::new("lounge"));
//! let opcode = sim.opcode_channel();
//! let cec = sim.cec_channel();
//!
//! // Make the opcode link fail while CEC keeps working
//! sim.set_opcode_fault(Fault::Fail);
//! # let _ = (opcode, cec);
//! ```

pub mod channels;
pub mod display;
pub mod endpoint;

pub use channels::{Fault, SimCall, SimCecChannel, SimDisplay, SimOpcodeChannel};
pub use display::{CecCommand, VirtualDisplay};
pub use endpoint::{run_virtual_display_task, EndpointCommand};
