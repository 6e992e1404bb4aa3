//! In-memory collaborator implementations.
//!
//! These back the default [`Services`](crate::services::Services) set: good
//! enough to run a self-contained simulator and to drive the test suite
//! without real screen stores, HSMs or persisted settings. Wire decoding of
//! state-table and FIT records belongs to the real collaborators; the
//! in-memory tables validate record shape on load and serve typed entries
//! injected through their `insert` methods.

use crate::services::{
    CryptoService, DisplayService, FitService, HardwareService, Screen, ScreenService,
    SettingsStore, StateService,
};
use crate::states::State;
use cashpoint_core::constants::{SCREEN_NUMBER_WIDTH, STATE_NUMBER_WIDTH};
use std::collections::HashMap;

/// Screen store backed by a map from screen number to display data.
#[derive(Debug, Default)]
pub struct TableScreens {
    screens: HashMap<String, String>,
}

impl TableScreens {
    /// The stored data for a screen number.
    #[must_use]
    pub fn data(&self, number: &str) -> Option<&str> {
        self.screens.get(number).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }
}

impl ScreenService for TableScreens {
    fn add(&mut self, screen_data: &str) -> bool {
        if screen_data.len() < SCREEN_NUMBER_WIDTH {
            return false;
        }
        let (number, data) = screen_data.split_at(SCREEN_NUMBER_WIDTH);
        if !number.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        self.screens.insert(number.to_string(), data.to_string());
        true
    }

    fn dynamic_screen(&self, data: &str) -> Option<Screen> {
        if data.is_empty() {
            return None;
        }
        Some(Screen::new("", data))
    }

    fn screen_display_update(&mut self, data: &str) -> Option<Screen> {
        if data.len() < SCREEN_NUMBER_WIDTH {
            return None;
        }
        let (number, body) = data.split_at(SCREEN_NUMBER_WIDTH);
        if !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.screens.insert(number.to_string(), body.to_string());
        Some(Screen::new(number, body))
    }
}

/// State table serving typed states.
#[derive(Debug, Default)]
pub struct TableStates {
    states: HashMap<String, State>,
    raw_records: Vec<String>,
}

/// Type codes a state record may carry.
const STATE_TYPE_CODES: &[char] = &[
    'A', 'B', 'D', 'E', 'F', 'H', 'I', 'J', 'K', 'W', 'X', 'Y', 'Z', '+', '/', ';', '?',
];

impl TableStates {
    /// Build a table from typed states.
    #[must_use]
    pub fn with_states(states: impl IntoIterator<Item = State>) -> Self {
        let mut table = TableStates::default();
        for state in states {
            table.insert(state);
        }
        table
    }

    /// Install a typed state, replacing any previous entry with that number.
    pub fn insert(&mut self, state: State) {
        self.states.insert(state.number.clone(), state);
    }

    /// Raw records accepted by [`StateService::add`].
    #[must_use]
    pub fn raw_records(&self) -> &[String] {
        &self.raw_records
    }
}

impl StateService for TableStates {
    fn add(&mut self, state_data: &str) -> bool {
        let number = state_data.get(..STATE_NUMBER_WIDTH);
        let type_code = state_data.chars().nth(STATE_NUMBER_WIDTH);

        let shape_ok = matches!(number, Some(n) if n.bytes().all(|b| b.is_ascii_digit()))
            && matches!(type_code, Some(code) if STATE_TYPE_CODES.contains(&code));
        if !shape_ok {
            return false;
        }
        self.raw_records.push(state_data.to_string());
        true
    }

    fn get(&self, number: &str) -> Option<State> {
        self.states.get(number).cloned()
    }
}

/// One financial-institution entry: a PAN prefix and its policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitEntry {
    pub institution_id: String,
    pub pan_prefix: String,
    pub max_pin_length: usize,
}

/// Financial institution table with prefix matching.
#[derive(Debug, Default)]
pub struct TableFits {
    entries: Vec<FitEntry>,
    raw_records: Vec<String>,
}

impl TableFits {
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = FitEntry>) -> Self {
        TableFits {
            entries: entries.into_iter().collect(),
            raw_records: Vec::new(),
        }
    }

    pub fn insert(&mut self, entry: FitEntry) {
        self.entries.push(entry);
    }

    /// The longest-prefix entry owning this card number.
    fn entry_for(&self, pan: &str) -> Option<&FitEntry> {
        self.entries
            .iter()
            .filter(|entry| pan.starts_with(&entry.pan_prefix))
            .max_by_key(|entry| entry.pan_prefix.len())
    }
}

impl FitService for TableFits {
    fn add(&mut self, fit_data: &str) -> bool {
        if fit_data.is_empty() || !fit_data.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        self.raw_records.push(fit_data.to_string());
        true
    }

    fn institution_by_card(&self, pan: &str) -> Option<String> {
        self.entry_for(pan).map(|entry| entry.institution_id.clone())
    }

    fn max_pin_length(&self, pan: &str) -> Option<usize> {
        self.entry_for(pan).map(|entry| entry.max_pin_length)
    }
}

/// Software stand-in for the PIN-block device.
///
/// Produces a deterministic 16-hex-digit block from the PIN and PAN; not a
/// real cipher, but stable enough for request assembly and assertions.
#[derive(Debug, Default)]
pub struct SoftHsm {
    comms_key: Option<String>,
}

impl SoftHsm {
    #[must_use]
    pub fn comms_key(&self) -> Option<&str> {
        self.comms_key.as_deref()
    }
}

impl CryptoService for SoftHsm {
    fn encrypted_pin(&self, clear_pin: &str, pan: &str) -> Option<String> {
        if clear_pin.is_empty() || pan.is_empty() {
            return None;
        }
        let mut block: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in clear_pin.bytes().chain(pan.bytes()) {
            block ^= u64::from(byte);
            block = block.wrapping_mul(0x0000_0100_0000_01b3);
        }
        Some(format!("{block:016X}"))
    }

    fn set_comms_key(&mut self, key_data: &str, key_length: usize) -> bool {
        let valid = !key_data.is_empty()
            && key_data.len() == key_length
            && key_data.bytes().all(|b| b.is_ascii_hexdigit());
        if valid {
            self.comms_key = Some(key_data.to_string());
        }
        valid
    }
}

/// Records what the customer would see.
#[derive(Debug, Default)]
pub struct PanelDisplay {
    screen: Option<Screen>,
    keyed_text: String,
}

impl PanelDisplay {
    /// The number of the screen currently shown, if any.
    #[must_use]
    pub fn current_screen_number(&self) -> Option<&str> {
        self.screen.as_ref().map(|screen| screen.number.as_str())
    }

    #[must_use]
    pub fn current_screen(&self) -> Option<&Screen> {
        self.screen.as_ref()
    }

    /// Echoed text since the last screen change (masked where requested).
    #[must_use]
    pub fn keyed_text(&self) -> &str {
        &self.keyed_text
    }
}

impl DisplayService for PanelDisplay {
    fn set_screen(&mut self, screen: &Screen) {
        self.screen = Some(screen.clone());
        self.keyed_text.clear();
    }

    fn set_screen_by_number(&mut self, number: &str) {
        self.screen = Some(Screen::new(number, ""));
        self.keyed_text.clear();
    }

    fn insert_text(&mut self, text: &str, mask: Option<char>) {
        match mask {
            Some(mask_char) => {
                self.keyed_text
                    .extend(std::iter::repeat_n(mask_char, text.chars().count()));
            }
            None => self.keyed_text.push_str(text),
        }
    }
}

/// Fixed hardware status strings.
#[derive(Debug, Clone)]
pub struct StaticHardware {
    pub fitness: String,
    pub supplies: String,
    pub release: String,
    pub software_id: String,
}

impl Default for StaticHardware {
    fn default() -> Self {
        StaticHardware {
            fitness: "00000000000000000000".to_string(),
            supplies: "0000000000000000".to_string(),
            release: "030300".to_string(),
            software_id: "G531-0283".to_string(),
        }
    }
}

impl HardwareService for StaticHardware {
    fn hardware_fitness(&self) -> String {
        self.fitness.clone()
    }

    fn supplies_status(&self) -> String {
        self.supplies.clone()
    }

    fn release_number(&self) -> String {
        self.release.clone()
    }

    fn hardware_id(&self) -> String {
        self.software_id.clone()
    }
}

/// Settings persistence backed by a plain map.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: HashMap<String, String>,
}

impl MemorySettings {
    /// Seed a settings store from key/value pairs.
    #[must_use]
    pub fn with_values<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        MemorySettings {
            values: pairs
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}
