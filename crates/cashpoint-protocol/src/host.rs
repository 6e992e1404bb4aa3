//! Inbound host message classification.
//!
//! The transport hands over structured records; [`HostMessage::classify`]
//! turns the stringly class/subclass/identifier triple into the closed
//! [`HostCommand`] enumeration the dispatcher matches exhaustively. Anything
//! the table does not know is an error, which the dispatcher answers with a
//! Command Reject.

use cashpoint_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A raw host-to-terminal record as delivered by the transport.
///
/// Only the fields relevant to a given command are populated; everything is
/// optional except the message class. Classification decides which fields
/// are actually required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostMessage {
    pub message_class: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_subclass: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_identifier: Option<String>,

    /// Screen data records for a Screen Data load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screens: Option<Vec<String>>,

    /// State table records for a State Tables load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<String>>,

    /// Financial institution table records for a FIT Data load.
    #[serde(default, rename = "FITs", skip_serializing_if = "Option::is_none")]
    pub fits: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,

    /// Enhanced configuration parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ConfigParameter>>,

    /// FDK activation mask sent with an Interactive Transaction Response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_keys: Option<String>,

    /// Dynamic screen data sent with an Interactive Transaction Response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_key_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_key_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_display_update: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_to_dispense: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printer_data: Option<String>,
}

/// Terminal command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalCommand {
    GoInService,
    GoOutOfService,
    SendConfigurationInformation,
    SendConfigurationId,
    SendSupplyCounters,
}

impl TerminalCommand {
    /// Resolve a wire command code.
    ///
    /// # Errors
    /// Returns `Error::UnknownCommandCode` for anything outside the table.
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "Go in-service" => Ok(TerminalCommand::GoInService),
            "Go out-of-service" => Ok(TerminalCommand::GoOutOfService),
            "Send Configuration Information" => Ok(TerminalCommand::SendConfigurationInformation),
            "Send Configuration ID" => Ok(TerminalCommand::SendConfigurationId),
            "Send Supply Counters" => Ok(TerminalCommand::SendSupplyCounters),
            _ => Err(Error::UnknownCommandCode {
                code: code.to_string(),
            }),
        }
    }

    /// The wire spelling of this command.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalCommand::GoInService => "Go in-service",
            TerminalCommand::GoOutOfService => "Go out-of-service",
            TerminalCommand::SendConfigurationInformation => "Send Configuration Information",
            TerminalCommand::SendConfigurationId => "Send Configuration ID",
            TerminalCommand::SendSupplyCounters => "Send Supply Counters",
        }
    }
}

/// One enhanced-configuration parameter: a 3-digit option ID and its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigParameter {
    pub id: String,
    pub value: String,
}

/// Payload of a Transaction Reply Command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReply {
    pub next_state: String,
    pub screen_display_update: Option<String>,
    pub notes_to_dispense: Option<String>,
    pub printer_data: Option<String>,
}

/// Every inbound command the terminal core understands.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Terminal(TerminalCommand),
    LoadScreens(Vec<String>),
    LoadStates(Vec<String>),
    LoadFits(Vec<String>),
    LoadConfigId(String),
    LoadEnhancedConfig(Vec<ConfigParameter>),
    InteractiveTransactionResponse {
        active_keys: Option<String>,
        screen_data: Option<String>,
    },
    /// Decipher new comms key with current master key.
    DecipherCommsKey {
        key_data: String,
        key_length: usize,
    },
    TransactionReply(TransactionReply),
    EmvConfiguration,
}

const SUBCLASS_CUSTOMIZATION: &str = "Customization Command";
const SUBCLASS_INTERACTIVE: &str = "Interactive Transaction Response";
const SUBCLASS_KEY_INFORMATION: &str = "Extended Encryption Key Information";
const MODIFIER_DECIPHER_COMMS_KEY: &str = "Decipher new comms key with current master key";

impl HostMessage {
    /// Classify this record into a [`HostCommand`].
    ///
    /// # Errors
    /// Returns an error for an unknown class, subclass, command code or
    /// message identifier, or when a required payload field is absent. The
    /// dispatcher converts any of these into a Command Reject.
    pub fn classify(&self) -> Result<HostCommand> {
        match self.message_class.as_str() {
            "Terminal Command" => {
                let code = self.require(&self.command_code, "command_code")?;
                Ok(HostCommand::Terminal(TerminalCommand::from_code(code)?))
            }
            "Data Command" => self.classify_data_command(),
            "Transaction Reply Command" => {
                let next_state = self.require(&self.next_state, "next_state")?;
                Ok(HostCommand::TransactionReply(TransactionReply {
                    next_state: next_state.to_string(),
                    screen_display_update: self.screen_display_update.clone(),
                    notes_to_dispense: self.notes_to_dispense.clone(),
                    printer_data: self.printer_data.clone(),
                }))
            }
            "EMV Configuration" => Ok(HostCommand::EmvConfiguration),
            other => Err(Error::UnknownMessageClass {
                class: other.to_string(),
            }),
        }
    }

    fn classify_data_command(&self) -> Result<HostCommand> {
        let subclass = self.require(&self.message_subclass, "message_subclass")?;
        match subclass {
            SUBCLASS_CUSTOMIZATION => {
                let identifier = self.require(&self.message_identifier, "message_identifier")?;
                self.classify_customization(identifier)
            }
            SUBCLASS_INTERACTIVE => Ok(HostCommand::InteractiveTransactionResponse {
                active_keys: self.active_keys.clone(),
                screen_data: self.screen_data.clone(),
            }),
            SUBCLASS_KEY_INFORMATION => {
                let modifier = self.require(&self.message_identifier, "message_identifier")?;
                if modifier != MODIFIER_DECIPHER_COMMS_KEY {
                    return Err(Error::UnknownMessageIdentifier {
                        identifier: modifier.to_string(),
                    });
                }
                let key_data = self.require(&self.new_key_data, "new_key_data")?;
                Ok(HostCommand::DecipherCommsKey {
                    key_data: key_data.to_string(),
                    key_length: self.new_key_length.unwrap_or(key_data.len()),
                })
            }
            other => Err(Error::UnknownMessageIdentifier {
                identifier: other.to_string(),
            }),
        }
    }

    fn classify_customization(&self, identifier: &str) -> Result<HostCommand> {
        match identifier {
            "Screen Data load" => Ok(HostCommand::LoadScreens(
                self.screens.clone().unwrap_or_default(),
            )),
            "State Tables load" => Ok(HostCommand::LoadStates(
                self.states.clone().unwrap_or_default(),
            )),
            "FIT Data load" => Ok(HostCommand::LoadFits(self.fits.clone().unwrap_or_default())),
            "Configuration ID number load" => {
                let id = self.require(&self.config_id, "config_id")?;
                Ok(HostCommand::LoadConfigId(id.to_string()))
            }
            "Enhanced Configuration Data Load" => Ok(HostCommand::LoadEnhancedConfig(
                self.parameters.clone().unwrap_or_default(),
            )),
            other => Err(Error::UnknownMessageIdentifier {
                identifier: other.to_string(),
            }),
        }
    }

    fn require<'a>(&self, field: &'a Option<String>, name: &str) -> Result<&'a str> {
        field
            .as_deref()
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }
}
