//! The eight-position operation code buffer.
//!
//! State navigation assembles the transaction type into this buffer one slot
//! at a time; the finished string travels to the host inside the transaction
//! request.

use crate::states::OpcodeTemplate;
use cashpoint_core::constants::OPCODE_BUFFER_SLOTS;
use cashpoint_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeBuffer {
    slots: [char; OPCODE_BUFFER_SLOTS],
}

impl Default for OpcodeBuffer {
    fn default() -> Self {
        OpcodeBuffer {
            slots: [' '; OPCODE_BUFFER_SLOTS],
        }
    }
}

impl OpcodeBuffer {
    /// Reset every slot to a space.
    pub fn init(&mut self) {
        self.slots = [' '; OPCODE_BUFFER_SLOTS];
    }

    /// Write one character at a slot.
    ///
    /// # Errors
    /// Returns `Error::BufferIndexOutOfRange` for slots past 7; the buffer is
    /// left unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use cashpoint_emulator::OpcodeBuffer;
    ///
    /// let mut opcode = OpcodeBuffer::default();
    /// opcode.set_at(7, 'B').unwrap();
    /// assert_eq!(opcode.get(), "       B");
    /// assert!(opcode.set_at(8, 'X').is_err());
    /// ```
    pub fn set_at(&mut self, slot: usize, value: char) -> Result<()> {
        if slot >= OPCODE_BUFFER_SLOTS {
            return Err(Error::BufferIndexOutOfRange {
                index: slot,
                max: OPCODE_BUFFER_SLOTS - 1,
            });
        }
        self.slots[slot] = value;
        Ok(())
    }

    /// The eight-character buffer contents.
    #[must_use]
    pub fn get(&self) -> String {
        self.slots.iter().collect()
    }

    /// Install a pre-shaped template: `Some` cells are written, `None` cells
    /// leave the existing slot value in place.
    pub fn install(&mut self, template: &OpcodeTemplate) {
        for (slot, cell) in template.0.iter().enumerate() {
            if let Some(ch) = cell {
                self.slots[slot] = *ch;
            }
        }
    }
}
