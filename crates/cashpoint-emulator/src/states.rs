//! Terminal state model.
//!
//! The state table collaborator validates records on load and hands the
//! interpreter fully typed states: a 3-digit number plus a tagged kind whose
//! variant owns exactly the fields that kind uses. The interpreter never
//! performs stringly field lookup.

use cashpoint_core::constants::{EXTENSION_STATE_CLEAR, EXTENSION_STATE_NONE, EXIT_DISABLED};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the terminal state table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Three-digit state number.
    pub number: String,

    /// Operator-facing description.
    pub description: String,

    pub kind: StateKind,
}

impl State {
    pub fn new(number: impl Into<String>, description: impl Into<String>, kind: StateKind) -> Self {
        State {
            number: number.into(),
            description: description.into(),
            kind,
        }
    }

    /// The extension entries, when this is an extension state.
    #[must_use]
    pub fn as_extension(&self) -> Option<&[String]> {
        match &self.kind {
            StateKind::Extension { entries } => Some(entries),
            _ => None,
        }
    }
}

/// Exit states for the four selection keys A-D. `"255"` marks a key unused.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FdkExits {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
}

impl FdkExits {
    pub fn new(
        a: impl Into<String>,
        b: impl Into<String>,
        c: impl Into<String>,
        d: impl Into<String>,
    ) -> Self {
        FdkExits {
            a: a.into(),
            b: b.into(),
            c: c.into(),
            d: d.into(),
        }
    }

    /// The exit state for a key, if that key exists here at all.
    #[must_use]
    pub fn exit_for(&self, letter: char) -> Option<&str> {
        match letter.to_ascii_uppercase() {
            'A' => Some(&self.a),
            'B' => Some(&self.b),
            'C' => Some(&self.c),
            'D' => Some(&self.d),
            _ => None,
        }
    }

    /// The keys whose exit state is enabled.
    #[must_use]
    pub fn active_letters(&self) -> Vec<char> {
        ['A', 'B', 'C', 'D']
            .into_iter()
            .filter(|letter| {
                self.exit_for(*letter)
                    .is_some_and(|exit| exit != EXIT_DISABLED)
            })
            .collect()
    }
}

/// A pre-shaped operation-code template: cells to write, `None` leaves the
/// buffer slot untouched. Shaping from wire fields happens in the state
/// table collaborator, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpcodeTemplate(pub [Option<char>; 8]);

impl OpcodeTemplate {
    /// Build from a literal where `' '` writes a space and `'_'` skips a cell.
    #[must_use]
    pub fn from_literal(literal: &str) -> Self {
        let mut cells = [None; 8];
        for (slot, ch) in literal.chars().take(8).enumerate() {
            if ch != '_' {
                cells[slot] = Some(ch);
            }
        }
        OpcodeTemplate(cells)
    }

    /// Overlay single-character extension entries 2..=9 onto slots 0..=7.
    #[must_use]
    pub fn overlaid(&self, entries: &[String]) -> Self {
        let mut cells = self.0;
        for (slot, cell) in cells.iter_mut().enumerate() {
            if let Some(entry) = entries.get(slot + 2) {
                let mut chars = entry.chars();
                if let (Some(ch), None) = (chars.next(), chars.next()) {
                    *cell = Some(ch);
                }
            }
        }
        OpcodeTemplate(cells)
    }
}

/// Whether an extension-state field actually references an extension state.
#[must_use]
pub fn has_extension(extension_state: &str) -> bool {
    extension_state != EXTENSION_STATE_NONE && extension_state != EXTENSION_STATE_CLEAR
}

/// The extension entry index a selection key reads in a store-and-activate
/// state (`A` reads entry 2 and so on; `E` has no key).
#[must_use]
pub fn extension_entry_index(letter: char) -> Option<usize> {
    match letter.to_ascii_uppercase() {
        'A' => Some(2),
        'B' => Some(3),
        'C' => Some(4),
        'D' => Some(5),
        'F' => Some(6),
        'G' => Some(7),
        'H' => Some(8),
        'I' => Some(9),
        _ => None,
    }
}

/// All state kinds the interpreter understands, tagged by the table's
/// single-character type code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Type `A`: wait for a card, then follow the good-read exit.
    CardRead {
        screen_number: String,
        good_read_next_state: String,
    },

    /// Type `B`: collect PIN digits.
    PinEntry {
        screen_number: String,
        remote_pin_check_next_state: String,
    },

    /// Type `D`: pre-set the operation code buffer and move on.
    OpcodeLoad {
        next_state: String,
        extension_state: String,
        template: OpcodeTemplate,
    },

    /// Type `E`: four-key selection writing the chosen letter into the
    /// operation code buffer.
    FourFdkSelection {
        screen_number: String,
        /// Opcode slot selector; the write lands at slot `7 - location`.
        buffer_location: String,
        exits: FdkExits,
    },

    /// Type `F`: amount entry, exits on a selection key.
    AmountEntry {
        screen_number: String,
        exits: FdkExits,
    },

    /// Type `H`: free-form information entry into buffer B or C.
    InformationEntry {
        screen_number: String,
        /// Third character selects target buffer and echo mode.
        buffer_and_display_params: String,
        exits: FdkExits,
    },

    /// Type `I`: assemble and park a transaction request.
    TransactionRequest {
        screen_number: String,
        send_track2: String,
        send_operation_code: String,
        send_amount_data: String,
        send_pin_buffer: String,
        send_buffer_b_buffer_c: String,
    },

    /// Type `J`: close the session and eject the card.
    Close { receipt_delivered_screen: String },

    /// Type `K`: exit selection by financial institution.
    FitExit { state_exits: Vec<String> },

    /// Type `W`: exit selection by the remembered FDK letter.
    FdkLookup { states: BTreeMap<char, String> },

    /// Type `X`: remember the pressed key and optionally store an
    /// extension-supplied value into a buffer.
    StoreAndActivate {
        screen_number: String,
        fdk_active_mask: String,
        /// `[1]` selects the target buffer, `[2]` the number of appended zeroes.
        buffer_id: String,
        fdk_next_state: String,
        extension_state: String,
    },

    /// Type `Y`: remember the pressed key and write it into the operation
    /// code buffer.
    FdkToOpcode {
        screen_number: String,
        fdk_active_mask: String,
        buffer_positions: String,
        fdk_next_state: String,
        extension_state: String,
    },

    /// Type `Z`: an extension record carrying ten entry strings for the
    /// state that references it.
    Extension { entries: Vec<String> },

    /// Type `+`: begin chip-card initialization.
    IccInit { icc_init_not_started_next_state: String },

    /// Type `/`: complete chip-card application initialization.
    IccAppInit {
        please_wait_screen_number: String,
        extension_state: String,
    },

    /// Type `;`: chip-card re-initialization.
    IccReinit {
        processing_not_performed_next_state: String,
    },

    /// Type `?`: accept chip-card data and move on.
    IccSetData { next_state: String },

    /// A type code without interpreter support; logged and left waiting.
    Unsupported { type_code: char },
}
