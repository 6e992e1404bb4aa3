//! State-driven ATM terminal core.
//!
//! A [`Terminal`] ingests host messages and operator inputs (card reads,
//! pinpad buttons, FDK presses), walks a host-loaded table of terminal
//! states, maintains the classic buffer set (PIN, B, C, amount, operation
//! code), and emits solicited status replies and transaction requests whose
//! structure matches the wire protocol.
//!
//! The terminal is constructed with a capability set of collaborators
//! ([`Services`]); the in-memory implementations in [`mock`] make a
//! self-contained simulator:
//!
//! ```
//! use cashpoint_emulator::{Services, Terminal};
//! use cashpoint_protocol::HostMessage;
//!
//! let mut terminal = Terminal::new(Services::default());
//!
//! let go_in_service = HostMessage {
//!     message_class: "Terminal Command".to_string(),
//!     command_code: Some("Go in-service".to_string()),
//!     ..HostMessage::default()
//! };
//! let reply = terminal.process_host_message(&go_in_service).unwrap();
//! assert_eq!(reply.descriptor_code(), Some('9'));
//! ```
//!
//! Everything runs on a single driver thread: entry points execute to
//! completion, and a state that awaits input leaves the terminal at rest
//! until the next call.

pub mod buffers;
pub mod coordination;
pub mod fdk;
pub mod mock;
pub mod opcode;
pub mod services;
pub mod states;
pub mod terminal;

mod assembler;
mod dispatch;
mod inputs;
mod interpreter;

pub use buffers::{BufferKind, BufferSet};
pub use coordination::next_coordination_number;
pub use fdk::ActiveFdks;
pub use opcode::OpcodeBuffer;
pub use services::{
    CryptoService, DisplayService, FitService, HardwareService, Screen, ScreenService, Services,
    ServicesBuilder, SettingsStore, StateService,
};
pub use states::{FdkExits, OpcodeTemplate, State, StateKind};
pub use terminal::{HostConfiguration, Terminal};
