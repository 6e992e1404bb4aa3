//! Supply counters.
//!
//! Counters travel on the wire as fixed-width decimal strings; widths never
//! shrink, and all arithmetic is modulo the field width with left zero-pad.
//! The 20-digit note counters exceed `u64`, so arithmetic runs in `u128`.

use cashpoint_core::constants::{
    NOTES_COUNTER_WIDTH, SHORT_COUNTER_WIDTH, TRANSACTION_COUNT_WIDTH, TSN_WIDTH,
};
use serde::{Deserialize, Serialize};

/// The supply counters reported by a Send Supply Counters terminal command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyCounters {
    /// Transaction serial number (4 digits).
    #[serde(rename = "TSN")]
    pub tsn: String,

    /// Total transactions processed (7 digits).
    pub transaction_count: String,

    /// Notes remaining per cassette (20 digits).
    pub notes_in_cassettes: String,

    /// Notes diverted to the reject bin (20 digits).
    pub notes_rejected: String,

    /// Notes presented to customers (20 digits).
    pub notes_dispensed: String,

    /// Notes presented during the last transaction (20 digits).
    pub last_trxn_notes_dispensed: String,

    /// Cards retained by the terminal (5 digits).
    pub card_captured: String,

    /// Envelopes accepted by the depository (5 digits).
    pub envelopes_deposited: String,

    /// Remaining camera film frames (5 digits).
    pub camera_film_remaining: String,

    /// Serial number of the last accepted envelope (5 digits).
    pub last_envelope_serial: String,
}

impl Default for SupplyCounters {
    fn default() -> Self {
        SupplyCounters {
            tsn: zeroes(TSN_WIDTH),
            transaction_count: zeroes(TRANSACTION_COUNT_WIDTH),
            notes_in_cassettes: zeroes(NOTES_COUNTER_WIDTH),
            notes_rejected: zeroes(NOTES_COUNTER_WIDTH),
            notes_dispensed: zeroes(NOTES_COUNTER_WIDTH),
            last_trxn_notes_dispensed: zeroes(NOTES_COUNTER_WIDTH),
            card_captured: zeroes(SHORT_COUNTER_WIDTH),
            envelopes_deposited: zeroes(SHORT_COUNTER_WIDTH),
            camera_film_remaining: zeroes(SHORT_COUNTER_WIDTH),
            last_envelope_serial: zeroes(SHORT_COUNTER_WIDTH),
        }
    }
}

impl SupplyCounters {
    /// Add `amount` notes to the dispensed counter, modulo its 20-digit width.
    pub fn bump_notes_dispensed(&mut self, amount: u128) {
        self.notes_dispensed = bump(&self.notes_dispensed, amount, NOTES_COUNTER_WIDTH);
    }
}

fn zeroes(width: usize) -> String {
    "0".repeat(width)
}

/// Fixed-width counter arithmetic: parse, add, wrap at 10^width, re-pad.
fn bump(value: &str, amount: u128, width: usize) -> String {
    let current: u128 = value.parse().unwrap_or(0);
    let modulus = 10u128.pow(width as u32);
    let next = (current + amount) % modulus;
    format!("{:0>width$}", next)
}
