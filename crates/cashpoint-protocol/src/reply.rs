//! Solicited status replies.
//!
//! Every host command the terminal acknowledges is answered with a solicited
//! status message: the `ReadyState` envelope carrying the LUNO, a one-character
//! status descriptor, and, for terminal-state replies, the requested
//! configuration or counter payload.

use crate::counters::SupplyCounters;
use serde::{Deserialize, Serialize};

/// Status descriptor codes for solicited status messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusDescriptor {
    /// Command executed: `'9'`.
    Ready,
    /// Command not understood or not executable: `'A'`.
    CommandReject,
    /// Command understood but rejected with detail: `'C'`.
    SpecificCommandReject,
    /// Terminal state payload follows: `'F'`.
    TerminalState,
}

impl StatusDescriptor {
    /// The one-character wire code.
    #[must_use]
    pub fn code(self) -> char {
        match self {
            StatusDescriptor::Ready => '9',
            StatusDescriptor::CommandReject => 'A',
            StatusDescriptor::SpecificCommandReject => 'C',
            StatusDescriptor::TerminalState => 'F',
        }
    }
}

/// A solicited status reply, serialized as
/// `{"messageId": "ReadyState", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolicitedStatus {
    #[serde(rename = "messageId")]
    pub message_id: String,

    pub data: SolicitedStatusData,
}

/// The `data` object of a solicited status reply.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SolicitedStatusData {
    #[serde(rename = "LUNO_ATM")]
    pub luno: String,

    #[serde(rename = "StatusDescriptor")]
    pub status_descriptor: String,

    /// Set to `"2"` on supply-counter terminal-state replies.
    #[serde(
        rename = "SubStatusDescriptor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sub_status_descriptor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_fitness: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_configuration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplies_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndc_software_id: Option<String>,

    #[serde(flatten)]
    pub supply_counters: Option<SupplyCounters>,
}

impl SolicitedStatus {
    /// Create a reply with the given descriptor and no payload.
    #[must_use]
    pub fn new(luno: &str, descriptor: StatusDescriptor) -> Self {
        SolicitedStatus {
            message_id: "ReadyState".to_string(),
            data: SolicitedStatusData {
                luno: luno.to_string(),
                status_descriptor: descriptor.code().to_string(),
                ..SolicitedStatusData::default()
            },
        }
    }

    /// A Ready (`'9'`) reply.
    #[must_use]
    pub fn ready(luno: &str) -> Self {
        SolicitedStatus::new(luno, StatusDescriptor::Ready)
    }

    /// A Command Reject (`'A'`) reply.
    #[must_use]
    pub fn command_reject(luno: &str) -> Self {
        SolicitedStatus::new(luno, StatusDescriptor::CommandReject)
    }

    /// A Terminal State (`'F'`) reply carrying the config id.
    #[must_use]
    pub fn terminal_state(luno: &str, config_id: &str) -> Self {
        let mut reply = SolicitedStatus::new(luno, StatusDescriptor::TerminalState);
        reply.data.config_id = Some(config_id.to_string());
        reply
    }

    /// Attach the supply counters and mark the reply with sub-status `'2'`.
    #[must_use]
    pub fn with_supply_counters(mut self, counters: SupplyCounters) -> Self {
        self.data.sub_status_descriptor = Some("2".to_string());
        self.data.supply_counters = Some(counters);
        self
    }

    /// The descriptor code carried by this reply.
    #[must_use]
    pub fn descriptor_code(&self) -> Option<char> {
        self.data.status_descriptor.chars().next()
    }
}
