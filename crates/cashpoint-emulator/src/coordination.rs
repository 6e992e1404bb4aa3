//! Message coordination number.
//!
//! One ASCII character pairing each transaction request with its reply. The
//! counter survives restarts by living in the settings store; this module
//! only knows how to advance it.

use crate::services::SettingsStore;
use cashpoint_core::constants::{MCN_MAX, MCN_MIN, MCN_SEED, SETTING_MCN};

/// Advance the coordination number and persist the new value.
///
/// An unset or out-of-range stored value is treated as `'0'`, so the first
/// emission is `'1'`. Incrementing past `'~'` wraps back to `'1'`.
pub fn next_coordination_number(settings: &mut dyn SettingsStore) -> char {
    let stored = settings
        .get(SETTING_MCN)
        .and_then(|value| value.bytes().next())
        .filter(|byte| (MCN_MIN..=MCN_MAX).contains(byte))
        .unwrap_or(MCN_SEED);

    let next = if stored >= MCN_MAX { MCN_MIN } else { stored + 1 };

    let next_char = next as char;
    settings.set(SETTING_MCN, &next_char.to_string());
    next_char
}
