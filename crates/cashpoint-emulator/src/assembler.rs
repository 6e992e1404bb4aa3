//! Transaction request assembly.
//!
//! When state navigation reaches a transaction-request state, the send flags
//! on that state decide which buffers travel to the host. The envelope part
//! (LUNO, coordination number, time variant) is always present.

use crate::coordination::next_coordination_number;
use crate::terminal::Terminal;
use cashpoint_core::constants::{TIME_VARIANT_WIDTH, TOP_OF_RECEIPT};
use cashpoint_protocol::{TransactionRequest, TransactionRequestData};
use chrono::Local;
use tracing::warn;

/// A flag value of `"001"` gates a field in.
const FLAG_ON: &str = "001";

/// The send flags of a transaction-request state.
pub(crate) struct SendFlags<'a> {
    pub track2: &'a str,
    pub operation_code: &'a str,
    pub amount: &'a str,
    pub pin: &'a str,
    pub buffers: &'a str,
}

/// First eight numeric characters of the wall-clock ISO timestamp.
fn time_variant_number() -> String {
    Local::now()
        .to_rfc3339()
        .chars()
        .filter(char::is_ascii_digit)
        .take(TIME_VARIANT_WIDTH)
        .collect()
}

impl Terminal {
    /// Build the outbound transaction request from the current buffers and
    /// the state's send flags. Missing preconditions (card, PIN) downgrade
    /// to omitted fields with a warning; assembly itself never fails.
    pub(crate) fn assemble_transaction_request(&mut self, flags: SendFlags) -> TransactionRequest {
        let coordination = next_coordination_number(self.services.settings.as_mut());

        let mut data = TransactionRequestData {
            luno: self.luno(),
            top_of_receipt: TOP_OF_RECEIPT.to_string(),
            message_coordination_number: coordination.to_string(),
            time_variant_number: time_variant_number(),
            ..TransactionRequestData::default()
        };

        if flags.track2 == FLAG_ON {
            match &self.card {
                Some(card) => data.track2 = Some(card.track2.clone()),
                None => warn!("track 2 requested but no card present"),
            }
        }

        if flags.operation_code == FLAG_ON {
            data.operation_code = Some(self.buffers.opcode().get());
        }

        if flags.amount == FLAG_ON {
            data.amount = Some(self.buffers.amount().to_string());
        }

        match flags.pin {
            "001" | "129" => data.pin_buffer = self.build_pin_block(),
            "000" | "128" => {}
            other => warn!(flag = other, "unknown PIN buffer flag, omitting"),
        }

        match flags.buffers {
            "000" => {}
            "001" => data.buffer_b = Some(self.buffers.b().to_string()),
            "002" => data.buffer_c = Some(self.buffers.c().to_string()),
            "003" => {
                data.buffer_b = Some(self.buffers.b().to_string());
                data.buffer_c = Some(self.buffers.c().to_string());
            }
            other => {
                warn!(flag = other, "extension-driven buffer selection not supported, omitting");
            }
        }

        TransactionRequest::new(data)
    }

    fn build_pin_block(&self) -> Option<String> {
        let Some(card) = &self.card else {
            warn!("PIN block requested but no card present");
            return None;
        };
        if self.buffers.pin().is_empty() {
            warn!("PIN block requested but no PIN entered");
            return None;
        }
        let block = self
            .services
            .crypto
            .encrypted_pin(self.buffers.pin(), card.number.as_str());
        if block.is_none() {
            warn!("PIN block construction failed");
        }
        block
    }
}
