//! Host-to-terminal message model.
//!
//! Inbound records are classified into a closed [`HostCommand`] enumeration
//! before they reach the terminal core; outbound solicited status and
//! transaction request payloads are plain serde structs whose serialized
//! shape matches the wire protocol field-for-field. Transport framing is not
//! this crate's business: records arrive and leave as structured data.

pub mod counters;
pub mod host;
pub mod reply;
pub mod request;

pub use counters::SupplyCounters;
pub use host::{ConfigParameter, HostCommand, HostMessage, TerminalCommand, TransactionReply};
pub use reply::{SolicitedStatus, StatusDescriptor};
pub use request::{TransactionRequest, TransactionRequestData};
