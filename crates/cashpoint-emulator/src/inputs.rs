//! Operator input entry points: card reader, pinpad and FDK presses.
//!
//! Keypad digits mutate buffers directly according to the state the terminal
//! is resting at; key presses that states consume as events go through the
//! ordered input queue. Every entry point ends by driving the current state
//! so a completed entry advances immediately.

use crate::interpreter::BUTTON_ENTER;
use crate::states::StateKind;
use crate::terminal::Terminal;
use cashpoint_core::constants::DEFAULT_MAX_PIN_LENGTH;
use cashpoint_core::{Card, TerminalStatus};
use tracing::{debug, info, warn};

impl Terminal {
    /// Feed a card read from the magnetic stripe.
    ///
    /// A good read stores the card, moves the terminal to processing and
    /// drives the current state (a waiting card-read state advances). A parse
    /// failure takes the terminal out of service.
    pub fn read_card(&mut self, track2: &str) {
        match Card::from_track2(track2) {
            Ok(card) => {
                info!(pan = %card.number, "card read");
                self.card = Some(card);
                self.set_status(TerminalStatus::ProcessingCard);
                self.resume();
            }
            Err(error) => {
                warn!(%error, "card read failed");
                self.set_status(TerminalStatus::OutOfService);
            }
        }
    }

    /// Feed one pinpad button (`"0"`..`"9"`, `"enter"`, ...).
    pub fn process_pinpad_button(&mut self, button: &str) {
        let Some(state) = self
            .current_state
            .clone()
            .and_then(|number| self.services.states.get(&number))
        else {
            debug!(button, "pinpad input with no current state");
            return;
        };

        match &state.kind {
            StateKind::PinEntry { .. } => {
                if let Some(digit) = single_digit(button) {
                    let max = self
                        .card
                        .as_ref()
                        .and_then(|card| self.services.fits.max_pin_length(card.number.as_str()))
                        .unwrap_or(DEFAULT_MAX_PIN_LENGTH);
                    self.buffers.push_pin_digit(digit, max);
                    self.services.display.insert_text("*", Some('*'));
                } else if button == BUTTON_ENTER {
                    self.buttons_pressed.push_back(button.to_string());
                } else {
                    debug!(button, "ignoring pinpad input during PIN entry");
                }
            }

            StateKind::AmountEntry { .. } => {
                if let Some(digit) = single_digit(button) {
                    self.buffers.set_amount(&digit.to_string());
                } else {
                    debug!(button, "ignoring pinpad input during amount entry");
                }
            }

            StateKind::InformationEntry {
                buffer_and_display_params,
                ..
            } => {
                if single_digit(button).is_none() {
                    debug!(button, "ignoring pinpad input during information entry");
                } else {
                    // param[2] selects target buffer and echo mode
                    match buffer_and_display_params.chars().nth(2) {
                        Some('0') => {
                            self.buffers.append_c(button);
                            self.services.display.insert_text(button, Some('X'));
                        }
                        Some('1') => {
                            self.buffers.append_c(button);
                            self.services.display.insert_text(button, None);
                        }
                        Some('2') => {
                            self.buffers.append_b(button);
                            self.services.display.insert_text(button, Some('X'));
                        }
                        Some('3') => {
                            self.buffers.append_b(button);
                            self.services.display.insert_text(button, None);
                        }
                        other => warn!(?other, "unknown buffer selector"),
                    }
                }
            }

            StateKind::TransactionRequest { .. } if self.interactive_transaction => {
                self.buttons_pressed.push_back(button.to_string());
            }

            _ => {
                debug!(button, state = %state.number, "state does not take pinpad input");
                return;
            }
        }

        self.resume();
    }

    /// Feed one FDK press. Inactive keys are ignored.
    pub fn process_fdk_button(&mut self, letter: char) {
        if !self.fdks.is_active(letter) {
            debug!(%letter, "ignoring inactive key");
            return;
        }
        self.buttons_pressed
            .push_back(letter.to_ascii_uppercase().to_string());
        self.resume();
    }
}

fn single_digit(button: &str) -> Option<char> {
    let mut chars = button.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if ch.is_ascii_digit() => Some(ch),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FitEntry, TableFits, TableStates};
    use crate::services::Services;
    use crate::states::{FdkExits, State};

    fn pin_flow_terminal(max_pin_length: usize) -> Terminal {
        let services = Services::builder()
            .with_states(TableStates::with_states(vec![
                State::new(
                    "000",
                    "card read",
                    StateKind::CardRead {
                        screen_number: "023".into(),
                        good_read_next_state: "024".into(),
                    },
                ),
                State::new(
                    "024",
                    "pin entry",
                    StateKind::PinEntry {
                        screen_number: "024".into(),
                        remote_pin_check_next_state: "026".into(),
                    },
                ),
                State::new(
                    "026",
                    "select",
                    StateKind::FourFdkSelection {
                        screen_number: "026".into(),
                        buffer_location: "0".into(),
                        exits: FdkExits::new("030", "255", "255", "255"),
                    },
                ),
                State::new(
                    "030",
                    "close",
                    StateKind::Close {
                        receipt_delivered_screen: "010".into(),
                    },
                ),
            ]))
            .with_fits(TableFits::with_entries([FitEntry {
                institution_id: "1".into(),
                pan_prefix: "476173".into(),
                max_pin_length,
            }]))
            .build();
        let mut terminal = Terminal::new(services);
        terminal.process_state("000");
        terminal
    }

    #[test]
    fn test_good_card_read_advances_to_pin_entry() {
        let mut terminal = pin_flow_terminal(4);
        terminal.read_card(";4761739001010010=30121011000012340000?");
        assert_eq!(terminal.status(), TerminalStatus::ProcessingCard);
        assert_eq!(terminal.current_state(), Some("024"));
    }

    #[test]
    fn test_bad_card_read_goes_out_of_service() {
        let mut terminal = pin_flow_terminal(4);
        terminal.read_card("garbage");
        assert_eq!(terminal.status(), TerminalStatus::OutOfService);
        assert!(terminal.card().is_none());
    }

    #[test]
    fn test_pin_completes_at_institution_length_without_enter() {
        let mut terminal = pin_flow_terminal(4);
        terminal.read_card(";4761739001010010=30121011000012340000?");
        for digit in ["1", "2", "3", "4"] {
            terminal.process_pinpad_button(digit);
        }
        assert_eq!(terminal.buffers().pin(), "1234");
        assert_eq!(terminal.current_state(), Some("026"));
    }

    #[test]
    fn test_short_pin_needs_enter() {
        let mut terminal = pin_flow_terminal(6);
        terminal.read_card(";4761739001010010=30121011000012340000?");
        for digit in ["1", "2", "3", "4"] {
            terminal.process_pinpad_button(digit);
        }
        assert_eq!(terminal.current_state(), Some("024"));

        terminal.process_pinpad_button("enter");
        assert_eq!(terminal.current_state(), Some("026"));
    }

    #[test]
    fn test_three_digit_pin_not_accepted_by_enter() {
        let mut terminal = pin_flow_terminal(6);
        terminal.read_card(";4761739001010010=30121011000012340000?");
        for digit in ["1", "2", "3"] {
            terminal.process_pinpad_button(digit);
        }
        terminal.process_pinpad_button("enter");
        assert_eq!(terminal.current_state(), Some("024"));
    }

    #[test]
    fn test_fdk_press_requires_active_key() {
        let mut terminal = pin_flow_terminal(4);
        terminal.read_card(";4761739001010010=30121011000012340000?");
        for digit in ["1", "2", "3", "4"] {
            terminal.process_pinpad_button(digit);
        }
        // at state 026 only A is active
        terminal.process_fdk_button('B');
        assert_eq!(terminal.current_state(), Some("026"));

        terminal.process_fdk_button('a');
        assert_eq!(terminal.current_state(), Some("030"));
    }

    #[test]
    fn test_amount_entry_digits() {
        let services = Services::builder()
            .with_states(TableStates::with_states(vec![State::new(
                "040",
                "amount",
                StateKind::AmountEntry {
                    screen_number: "040".into(),
                    exits: FdkExits::new("050", "255", "255", "255"),
                },
            )]))
            .build();
        let mut terminal = Terminal::new(services);
        terminal.process_state("040");

        for digit in ["1", "0", "0"] {
            terminal.process_pinpad_button(digit);
        }
        assert_eq!(terminal.buffers().amount(), "000000000100");
    }

    #[test]
    fn test_information_entry_routes_to_buffer_b() {
        let services = Services::builder()
            .with_states(TableStates::with_states(vec![State::new(
                "080",
                "account entry",
                StateKind::InformationEntry {
                    screen_number: "080".into(),
                    buffer_and_display_params: "003".into(),
                    exits: FdkExits::new("090", "255", "255", "255"),
                },
            )]))
            .build();
        let mut terminal = Terminal::new(services);
        terminal.process_state("080");

        terminal.process_pinpad_button("4");
        terminal.process_pinpad_button("2");
        assert_eq!(terminal.buffers().b(), "42");
    }

    #[test]
    fn test_input_without_current_state_is_ignored() {
        let mut terminal = Terminal::new(Services::default());
        terminal.process_pinpad_button("5");
        assert_eq!(terminal.buffers().pin(), "");
        assert_eq!(terminal.buffers().amount(), "000000000000");
    }
}
