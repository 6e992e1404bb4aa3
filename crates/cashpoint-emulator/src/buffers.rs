//! The terminal buffer set: PIN, the general-purpose buffers B and C, the
//! fixed-width amount buffer, the operation code buffer and the remembered
//! FDK letter.
//!
//! Mutation rules are strict: the amount buffer is always exactly twelve
//! digits, B and C never exceed 32 characters, and any operation that would
//! break a cap is a no-op.

use crate::opcode::OpcodeBuffer;
use cashpoint_core::constants::{AMOUNT_BUFFER_WIDTH, GENERAL_BUFFER_CAPACITY};
use tracing::debug;

/// Selector for [`BufferSet::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Pin,
    B,
    C,
    Opcode,
    Amount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferSet {
    pin: String,
    b: String,
    c: String,
    amount: String,
    opcode: OpcodeBuffer,
    fdk: Option<char>,
}

impl Default for BufferSet {
    fn default() -> Self {
        BufferSet {
            pin: String::new(),
            b: String::new(),
            c: String::new(),
            amount: "0".repeat(AMOUNT_BUFFER_WIDTH),
            opcode: OpcodeBuffer::default(),
            fdk: None,
        }
    }
}

impl BufferSet {
    /// The current value of a buffer.
    #[must_use]
    pub fn get(&self, kind: BufferKind) -> String {
        match kind {
            BufferKind::Pin => self.pin.clone(),
            BufferKind::B => self.b.clone(),
            BufferKind::C => self.c.clone(),
            BufferKind::Opcode => self.opcode.get(),
            BufferKind::Amount => self.amount.clone(),
        }
    }

    /// Clear PIN, B, C and the FDK letter; reset the amount buffer to twelve
    /// zeroes; re-initialize the operation code buffer.
    pub fn init(&mut self) {
        self.pin.clear();
        self.b.clear();
        self.c.clear();
        self.amount = "0".repeat(AMOUNT_BUFFER_WIDTH);
        self.opcode.init();
        self.fdk = None;
    }

    /// Feed digits into the amount buffer from the right: existing digits
    /// shift left and the result is re-normalized to exactly twelve
    /// characters, left-padded with `'0'`. Non-digit input is a no-op.
    pub fn set_amount(&mut self, digits: &str) {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            debug!(input = digits, "ignoring non-numeric amount input");
            return;
        }
        let mut shifted = String::with_capacity(self.amount.len() + digits.len());
        shifted.push_str(&self.amount);
        shifted.push_str(digits);
        let keep = shifted.len() - AMOUNT_BUFFER_WIDTH.min(shifted.len());
        self.amount = format!("{:0>width$}", &shifted[keep..], width = AMOUNT_BUFFER_WIDTH);
    }

    /// Append one PIN digit, respecting the card's maximum PIN length.
    pub fn push_pin_digit(&mut self, digit: char, max_len: usize) {
        if !digit.is_ascii_digit() {
            debug!(%digit, "ignoring non-numeric PIN input");
            return;
        }
        if self.pin.len() >= max_len {
            debug!(max_len, "PIN buffer full");
            return;
        }
        self.pin.push(digit);
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn b(&self) -> &str {
        &self.b
    }

    pub fn c(&self) -> &str {
        &self.c
    }

    /// Replace buffer B. Values over capacity are a no-op.
    pub fn set_b(&mut self, value: &str) {
        if value.len() > GENERAL_BUFFER_CAPACITY {
            debug!(len = value.len(), "buffer B write exceeds capacity");
            return;
        }
        self.b = value.to_string();
    }

    /// Replace buffer C. Values over capacity are a no-op.
    pub fn set_c(&mut self, value: &str) {
        if value.len() > GENERAL_BUFFER_CAPACITY {
            debug!(len = value.len(), "buffer C write exceeds capacity");
            return;
        }
        self.c = value.to_string();
    }

    /// Append keyed text to buffer B, ignoring anything past capacity.
    pub fn append_b(&mut self, text: &str) {
        if self.b.len() + text.len() > GENERAL_BUFFER_CAPACITY {
            debug!("buffer B append exceeds capacity");
            return;
        }
        self.b.push_str(text);
    }

    /// Append keyed text to buffer C, ignoring anything past capacity.
    pub fn append_c(&mut self, text: &str) {
        if self.c.len() + text.len() > GENERAL_BUFFER_CAPACITY {
            debug!("buffer C append exceeds capacity");
            return;
        }
        self.c.push_str(text);
    }

    pub fn clear_b(&mut self) {
        self.b.clear();
    }

    pub fn clear_c(&mut self) {
        self.c.clear();
    }

    pub fn set_fdk(&mut self, letter: char) {
        self.fdk = Some(letter.to_ascii_uppercase());
    }

    pub fn fdk(&self) -> Option<char> {
        self.fdk
    }

    pub fn opcode(&self) -> &OpcodeBuffer {
        &self.opcode
    }

    pub fn opcode_mut(&mut self) -> &mut OpcodeBuffer {
        &mut self.opcode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_amount_is_twelve_zeroes() {
        let buffers = BufferSet::default();
        assert_eq!(buffers.amount(), "000000000000");
    }

    #[test]
    fn test_amount_entry_shifts_from_the_right() {
        let mut buffers = BufferSet::default();
        buffers.set_amount("1");
        assert_eq!(buffers.amount(), "000000000001");
        buffers.set_amount("0");
        assert_eq!(buffers.amount(), "000000000010");
        buffers.set_amount("0");
        assert_eq!(buffers.amount(), "000000000100");
    }

    #[test]
    fn test_amount_overflow_keeps_rightmost_digits() {
        let mut buffers = BufferSet::default();
        buffers.set_amount("1234567890123456");
        assert_eq!(buffers.amount(), "567890123456");
        assert_eq!(buffers.amount().len(), 12);
    }

    #[test]
    fn test_amount_rejects_non_digits() {
        let mut buffers = BufferSet::default();
        buffers.set_amount("12a");
        assert_eq!(buffers.amount(), "000000000000");
    }

    #[test]
    fn test_pin_respects_max_length() {
        let mut buffers = BufferSet::default();
        for digit in ['1', '2', '3', '4', '5'] {
            buffers.push_pin_digit(digit, 4);
        }
        assert_eq!(buffers.pin(), "1234");
    }

    #[test]
    fn test_general_buffer_capacity_is_a_no_op_boundary() {
        let mut buffers = BufferSet::default();
        buffers.set_b(&"9".repeat(33));
        assert_eq!(buffers.b(), "");
        buffers.set_b(&"9".repeat(32));
        assert_eq!(buffers.b().len(), 32);
        buffers.append_b("9");
        assert_eq!(buffers.b().len(), 32);
    }

    #[test]
    fn test_init_clears_everything() {
        let mut buffers = BufferSet::default();
        buffers.push_pin_digit('1', 6);
        buffers.set_b("hello");
        buffers.set_c("world");
        buffers.set_amount("42");
        buffers.set_fdk('c');
        buffers.opcode_mut().set_at(0, 'W').unwrap();

        buffers.init();

        assert_eq!(buffers.pin(), "");
        assert_eq!(buffers.b(), "");
        assert_eq!(buffers.c(), "");
        assert_eq!(buffers.amount(), "000000000000");
        assert_eq!(buffers.fdk(), None);
        assert_eq!(buffers.get(BufferKind::Opcode), "        ");
    }

    #[test]
    fn test_fdk_letter_is_uppercased() {
        let mut buffers = BufferSet::default();
        buffers.set_fdk('b');
        assert_eq!(buffers.fdk(), Some('B'));
    }

    #[test]
    fn test_get_selector() {
        let mut buffers = BufferSet::default();
        buffers.set_b("42");
        assert_eq!(buffers.get(BufferKind::B), "42");
        assert_eq!(buffers.get(BufferKind::Amount), "000000000000");
        assert_eq!(buffers.get(BufferKind::Pin), "");
    }
}
