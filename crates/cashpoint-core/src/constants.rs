/// Buffer capacities
pub const AMOUNT_BUFFER_WIDTH: usize = 12;
pub const GENERAL_BUFFER_CAPACITY: usize = 32;
pub const OPCODE_BUFFER_SLOTS: usize = 8;

/// PIN entry
pub const DEFAULT_MAX_PIN_LENGTH: usize = 6;
pub const MIN_PIN_LENGTH_FOR_ENTER: usize = 4;

/// State interpreter
pub const MAX_STATE_TRANSITIONS: usize = 20;
pub const EXTENSION_STATE_NONE: &str = "255";
pub const EXTENSION_STATE_CLEAR: &str = "000";
pub const EXIT_DISABLED: &str = "255";

/// Message coordination number (one ASCII char, cycling)
pub const MCN_MIN: u8 = 0x31; // '1'
pub const MCN_MAX: u8 = 0x7E; // '~'
pub const MCN_SEED: u8 = 0x30; // '0', so the first emitted value is '1'

/// FDK alphabets. Numeric masks skip the letter E; binary masks keep it.
pub const NUMERIC_MASK_FDKS: [char; 8] = ['A', 'B', 'C', 'D', 'F', 'G', 'H', 'I'];
pub const BINARY_MASK_FDKS: [char; 9] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I'];

/// Wire field widths
pub const LUNO_WIDTH: usize = 3;
pub const TIME_VARIANT_WIDTH: usize = 8;
pub const SCREEN_NUMBER_WIDTH: usize = 3;
pub const STATE_NUMBER_WIDTH: usize = 3;

/// Defaults
pub const DEFAULT_LUNO: &str = "009";
pub const DEFAULT_CONFIG_ID: &str = "0000";
pub const DEFAULT_INITIAL_SCREEN: &str = "001";
pub const TOP_OF_RECEIPT: &str = "1";

/// Settings keys
pub const SETTING_LUNO: &str = "host.luno";
pub const SETTING_MCN: &str = "message_coordination_number";
pub const SETTING_CONFIG_ID: &str = "config_id";

/// Supply counter widths
pub const TSN_WIDTH: usize = 4;
pub const TRANSACTION_COUNT_WIDTH: usize = 7;
pub const NOTES_COUNTER_WIDTH: usize = 20;
pub const SHORT_COUNTER_WIDTH: usize = 5;

/// Track 2 layout: `;PAN=YYMM SSS ...`; the service code sits at
/// offsets 4..7 of the region after the field separator.
pub const TRACK2_SENTINEL: char = ';';
pub const TRACK2_SEPARATOR: char = '=';
pub const SERVICE_CODE_OFFSET: usize = 4;
pub const SERVICE_CODE_WIDTH: usize = 3;
pub const MAX_PAN_LENGTH: usize = 19;
