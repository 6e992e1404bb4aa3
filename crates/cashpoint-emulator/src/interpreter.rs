//! The state interpreter.
//!
//! Drives the terminal through its state table: fetch a state, dispatch on
//! its kind, follow the returned next-state number. A handler that returns
//! `None` leaves the terminal at rest awaiting input; the drive loop is
//! bounded so a mis-configured table cannot spin forever.

use crate::assembler::SendFlags;
use crate::states::{State, StateKind, extension_entry_index, has_extension};
use crate::terminal::Terminal;
use cashpoint_core::constants::{
    DEFAULT_MAX_PIN_LENGTH, MAX_STATE_TRANSITIONS, MIN_PIN_LENGTH_FOR_ENTER,
    OPCODE_BUFFER_SLOTS,
};
use tracing::{debug, error, warn};

/// The keypad button the PIN-entry state watches for.
pub(crate) const BUTTON_ENTER: &str = "enter";

impl Terminal {
    /// Drive the state table starting at `number` until a state awaits input.
    ///
    /// A missing state ends the drive with a warning. More than 20
    /// consecutive transitions means the table loops; the drive is aborted
    /// with an error log and the terminal stays at the last entered state.
    pub fn process_state(&mut self, number: &str) {
        let mut current = number.to_string();
        for _ in 0..MAX_STATE_TRANSITIONS {
            let Some(state) = self.services.states.get(&current) else {
                warn!(number = %current, "state not found in table");
                return;
            };
            // a drive that starts at the resting state is a re-drive, not an entry
            let entering = self.current_state.as_deref() != Some(current.as_str());
            self.current_state = Some(state.number.clone());
            debug!(number = %state.number, description = %state.description, entering, "running state");

            match self.run_state(&state, entering) {
                None => return,
                Some(next) => {
                    if next != current {
                        self.buttons_pressed.clear();
                    }
                    current = next;
                }
            }
        }
        error!(
            limit = MAX_STATE_TRANSITIONS,
            "state transition limit reached, configuration cycle suspected"
        );
    }

    /// Execute one state. Returns the next state number, or `None` to await
    /// input at this state. `entering` is false when the terminal was already
    /// resting at this state and is only being driven again by new input.
    fn run_state(&mut self, state: &State, entering: bool) -> Option<String> {
        match &state.kind {
            StateKind::CardRead {
                screen_number,
                good_read_next_state,
            } => {
                self.buffers.init();
                self.services.display.set_screen_by_number(screen_number);
                if self.card.is_some() {
                    Some(good_read_next_state.clone())
                } else {
                    None
                }
            }

            StateKind::PinEntry {
                screen_number,
                remote_pin_check_next_state,
            } => {
                self.services.display.set_screen_by_number(screen_number);
                let _ = self.fdks.set_active_mask("001");

                let max = self
                    .card
                    .as_ref()
                    .and_then(|card| self.services.fits.max_pin_length(card.number.as_str()))
                    .unwrap_or(DEFAULT_MAX_PIN_LENGTH);

                let pin_len = self.buffers.pin().len();
                let entered = pin_len >= MIN_PIN_LENGTH_FOR_ENTER
                    && self.buttons_pressed.iter().any(|b| b == BUTTON_ENTER);

                if pin_len >= max || entered {
                    self.buttons_pressed.clear();
                    Some(remote_pin_check_next_state.clone())
                } else {
                    None
                }
            }

            StateKind::OpcodeLoad {
                next_state,
                extension_state,
                template,
            } => {
                let template = if has_extension(extension_state) {
                    match self
                        .services
                        .states
                        .get(extension_state)
                        .as_ref()
                        .and_then(State::as_extension)
                    {
                        Some(entries) => template.overlaid(entries),
                        None => {
                            warn!(number = %extension_state, "extension state missing or not an extension");
                            *template
                        }
                    }
                } else {
                    *template
                };
                self.buffers.opcode_mut().install(&template);
                Some(next_state.clone())
            }

            StateKind::FourFdkSelection {
                screen_number,
                buffer_location,
                exits,
            } => {
                self.services.display.set_screen_by_number(screen_number);
                self.fdks.activate(&exits.active_letters());

                let letter = self.pressed_active_fdk()?;
                match buffer_location.parse::<usize>() {
                    Ok(location) if location < OPCODE_BUFFER_SLOTS => {
                        // set_at cannot fail for 7 - location
                        let _ = self
                            .buffers
                            .opcode_mut()
                            .set_at(OPCODE_BUFFER_SLOTS - 1 - location, letter);
                    }
                    _ => {
                        error!(location = %buffer_location, "opcode location out of range, skipping write");
                    }
                }
                exits.exit_for(letter).map(str::to_string)
            }

            StateKind::AmountEntry {
                screen_number,
                exits,
            } => {
                self.services.display.set_screen_by_number(screen_number);
                let _ = self.fdks.set_active_mask("015");

                let letter = self.pressed_active_fdk()?;
                exits.exit_for(letter).map(str::to_string)
            }

            StateKind::InformationEntry {
                screen_number,
                buffer_and_display_params,
                exits,
            } => {
                self.services.display.set_screen_by_number(screen_number);
                self.fdks.activate(&exits.active_letters());

                if let Some(letter) = self.pressed_active_fdk() {
                    return exits.exit_for(letter).map(str::to_string);
                }

                // the entry buffer starts clean once per visit; re-drives
                // triggered by keystrokes must not wipe what was keyed
                if entering {
                    match buffer_and_display_params.chars().nth(2) {
                        Some('0' | '1') => self.buffers.clear_c(),
                        Some('2' | '3') => self.buffers.clear_b(),
                        other => warn!(?other, "unknown buffer selector in information entry"),
                    }
                }
                None
            }

            StateKind::TransactionRequest {
                screen_number,
                send_track2,
                send_operation_code,
                send_amount_data,
                send_pin_buffer,
                send_buffer_b_buffer_c,
            } => {
                self.services.display.set_screen_by_number(screen_number);

                let interactive_input = if self.interactive_transaction {
                    let input = self.buttons_pressed.pop_front();
                    if let Some(value) = &input {
                        self.buffers.set_b(value);
                    }
                    input
                } else {
                    None
                };

                let mut request = self.assemble_transaction_request(SendFlags {
                    track2: send_track2,
                    operation_code: send_operation_code,
                    amount: send_amount_data,
                    pin: send_pin_buffer,
                    buffers: send_buffer_b_buffer_c,
                });
                if interactive_input.is_some() {
                    request.data.buffer_b = Some(self.buffers.b().to_string());
                }

                self.transaction_request = Some(request);
                None
            }

            StateKind::Close {
                receipt_delivered_screen,
            } => {
                self.services
                    .display
                    .set_screen_by_number(receipt_delivered_screen);
                let _ = self.fdks.set_active_mask("000");
                self.card = None;
                None
            }

            StateKind::FitExit { state_exits } => {
                let Some(card) = &self.card else {
                    warn!("institution lookup without a card");
                    return None;
                };
                let Some(institution) = self
                    .services
                    .fits
                    .institution_by_card(card.number.as_str())
                else {
                    debug!("card number matches no institution");
                    return None;
                };
                let Ok(index) = institution.parse::<usize>() else {
                    warn!(%institution, "institution id is not an exit index");
                    return None;
                };
                match state_exits.get(index) {
                    Some(exit) => Some(exit.clone()),
                    None => {
                        warn!(index, exits = state_exits.len(), "institution exit out of range");
                        None
                    }
                }
            }

            StateKind::FdkLookup { states } => {
                let letter = self.buffers.fdk()?;
                states.get(&letter).cloned()
            }

            StateKind::StoreAndActivate {
                screen_number,
                fdk_active_mask,
                buffer_id,
                fdk_next_state,
                extension_state,
            } => {
                self.services.display.set_screen_by_number(screen_number);
                if let Err(e) = self.fdks.set_active_mask(fdk_active_mask) {
                    warn!(error = %e, "bad activation mask");
                }

                let letter = self.pressed_active_fdk()?;
                self.buffers.set_fdk(letter);

                if has_extension(extension_state) {
                    self.store_extension_value(extension_state, buffer_id, letter);
                }
                Some(fdk_next_state.clone())
            }

            StateKind::FdkToOpcode {
                screen_number,
                fdk_active_mask,
                buffer_positions,
                fdk_next_state,
                extension_state,
            } => {
                self.services.display.set_screen_by_number(screen_number);
                if let Err(e) = self.fdks.set_active_mask(fdk_active_mask) {
                    warn!(error = %e, "bad activation mask");
                }

                if has_extension(extension_state) {
                    error!(
                        number = %extension_state,
                        "extension-state data for key-to-opcode states is not implemented"
                    );
                    return None;
                }

                let letter = self.pressed_active_fdk()?;
                self.buffers.set_fdk(letter);
                match buffer_positions.parse::<usize>() {
                    Ok(slot) => {
                        if let Err(e) = self.buffers.opcode_mut().set_at(slot, letter) {
                            error!(error = %e, "skipping opcode write");
                        }
                    }
                    Err(_) => {
                        error!(positions = %buffer_positions, "opcode position is not numeric");
                    }
                }
                Some(fdk_next_state.clone())
            }

            StateKind::Extension { .. } => {
                warn!(number = %state.number, "extension state entered directly");
                None
            }

            StateKind::IccInit {
                icc_init_not_started_next_state,
            } => Some(icc_init_not_started_next_state.clone()),

            StateKind::IccAppInit {
                please_wait_screen_number,
                extension_state,
            } => {
                self.services
                    .display
                    .set_screen_by_number(please_wait_screen_number);
                match self
                    .services
                    .states
                    .get(extension_state)
                    .as_ref()
                    .and_then(State::as_extension)
                    .and_then(|entries| entries.get(8))
                {
                    Some(next) => Some(next.clone()),
                    None => {
                        warn!(number = %extension_state, "missing extension entry for chip-card init");
                        None
                    }
                }
            }

            StateKind::IccReinit {
                processing_not_performed_next_state,
            } => Some(processing_not_performed_next_state.clone()),

            StateKind::IccSetData { next_state } => Some(next_state.clone()),

            StateKind::Unsupported { type_code } => {
                warn!(%type_code, number = %state.number, "unsupported state type");
                None
            }
        }
    }

    /// Consume the oldest pending input; return it when it names an active
    /// FDK. Inactive or non-key input is discarded.
    fn pressed_active_fdk(&mut self) -> Option<char> {
        let input = self.buttons_pressed.pop_front()?;
        let mut chars = input.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) if self.fdks.is_active(letter) => {
                Some(letter.to_ascii_uppercase())
            }
            _ => {
                debug!(%input, "discarding input that is not an active key");
                None
            }
        }
    }

    /// Store an extension-supplied value for a store-and-activate state: the
    /// key's extension entry, extended with the configured number of zeroes,
    /// written into the buffer `buffer_id` selects.
    fn store_extension_value(&mut self, extension_state: &str, buffer_id: &str, letter: char) {
        let Some(entries) = self
            .services
            .states
            .get(extension_state)
            .as_ref()
            .and_then(State::as_extension)
            .map(<[String]>::to_vec)
        else {
            warn!(number = %extension_state, "extension state missing or not an extension");
            return;
        };

        let Some(entry) = extension_entry_index(letter).and_then(|index| entries.get(index))
        else {
            warn!(%letter, "no extension entry for this key");
            return;
        };

        let zeroes = buffer_id
            .chars()
            .nth(2)
            .and_then(|c| c.to_digit(10))
            .unwrap_or(0) as usize;
        let value = format!("{}{}", entry, "0".repeat(zeroes));

        match buffer_id.chars().nth(1) {
            Some('1') => self.buffers.set_b(&value),
            Some('2') => self.buffers.set_c(&value),
            Some('3') => self.buffers.set_amount(&value),
            other => warn!(?other, "unknown target buffer id"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{TableFits, FitEntry, TableStates};
    use crate::services::Services;
    use crate::states::{FdkExits, OpcodeTemplate, StateKind};
    use cashpoint_core::Card;
    use std::collections::BTreeMap;

    fn card_read(number: &str, screen: &str, next: &str) -> State {
        State::new(
            number,
            "card read",
            StateKind::CardRead {
                screen_number: screen.into(),
                good_read_next_state: next.into(),
            },
        )
    }

    fn terminal_with_states(states: Vec<State>) -> Terminal {
        let services = Services::builder()
            .with_states(TableStates::with_states(states))
            .build();
        Terminal::new(services)
    }

    fn insert_test_card(terminal: &mut Terminal) {
        terminal.card = Some(Card::from_track2(";4761739001010010=30121011000012340000?").unwrap());
    }

    #[test]
    fn test_card_read_waits_without_card() {
        let mut terminal = terminal_with_states(vec![card_read("000", "023", "024")]);
        terminal.process_state("000");
        assert_eq!(terminal.current_state(), Some("000"));
    }

    #[test]
    fn test_card_read_advances_with_card() {
        let mut terminal = terminal_with_states(vec![
            card_read("000", "023", "024"),
            State::new(
                "024",
                "pin entry",
                StateKind::PinEntry {
                    screen_number: "024".into(),
                    remote_pin_check_next_state: "026".into(),
                },
            ),
        ]);
        insert_test_card(&mut terminal);
        terminal.process_state("000");
        assert_eq!(terminal.current_state(), Some("024"));
    }

    #[test]
    fn test_missing_state_ends_drive() {
        let mut terminal = terminal_with_states(vec![]);
        terminal.process_state("042");
        assert_eq!(terminal.current_state(), None);
    }

    #[test]
    fn test_transition_limit_aborts_cycle() {
        // two D states referring to each other forever
        let mut terminal = terminal_with_states(vec![
            State::new(
                "001",
                "loop a",
                StateKind::OpcodeLoad {
                    next_state: "002".into(),
                    extension_state: "255".into(),
                    template: OpcodeTemplate::default(),
                },
            ),
            State::new(
                "002",
                "loop b",
                StateKind::OpcodeLoad {
                    next_state: "001".into(),
                    extension_state: "255".into(),
                    template: OpcodeTemplate::default(),
                },
            ),
        ]);
        terminal.process_state("001");
        // still resting at one of the two loop states, not wedged
        assert!(matches!(terminal.current_state(), Some("001" | "002")));
    }

    #[test]
    fn test_opcode_load_installs_template() {
        let mut terminal = terminal_with_states(vec![
            State::new(
                "050",
                "preset opcode",
                StateKind::OpcodeLoad {
                    next_state: "051".into(),
                    extension_state: "255".into(),
                    template: OpcodeTemplate::from_literal("BA______"),
                },
            ),
            card_read("051", "023", "052"),
        ]);
        terminal.process_state("050");
        assert_eq!(terminal.buffers().opcode().get(), "BA      ");
        assert_eq!(terminal.current_state(), Some("051"));
    }

    #[test]
    fn test_opcode_load_with_extension_overlay() {
        let mut entries = vec!["000".to_string(); 10];
        entries[2] = "W".to_string();
        let mut terminal = terminal_with_states(vec![
            State::new(
                "050",
                "preset opcode",
                StateKind::OpcodeLoad {
                    next_state: "051".into(),
                    extension_state: "219".into(),
                    template: OpcodeTemplate::from_literal("_Z______"),
                },
            ),
            State::new("219", "extension", StateKind::Extension { entries }),
            card_read("051", "023", "052"),
        ]);
        terminal.process_state("050");
        assert_eq!(terminal.buffers().opcode().get(), "WZ      ");
    }

    #[test]
    fn test_four_fdk_selection_writes_mirrored_slot() {
        let mut terminal = terminal_with_states(vec![
            State::new(
                "060",
                "select transaction",
                StateKind::FourFdkSelection {
                    screen_number: "060".into(),
                    buffer_location: "2".into(),
                    exits: FdkExits::new("070", "071", "255", "255"),
                },
            ),
            card_read("071", "023", "072"),
        ]);
        terminal.buttons_pressed.push_back("B".to_string());
        terminal.process_state("060");
        // slot 7 - 2 = 5
        assert_eq!(terminal.buffers().opcode().get(), "     B  ");
        assert_eq!(terminal.current_state(), Some("071"));
    }

    #[test]
    fn test_four_fdk_selection_bad_location_still_transitions() {
        let mut terminal = terminal_with_states(vec![
            State::new(
                "060",
                "select transaction",
                StateKind::FourFdkSelection {
                    screen_number: "060".into(),
                    buffer_location: "9".into(),
                    exits: FdkExits::new("070", "255", "255", "255"),
                },
            ),
            card_read("070", "023", "072"),
        ]);
        terminal.buttons_pressed.push_back("A".to_string());
        terminal.process_state("060");
        assert_eq!(terminal.buffers().opcode().get(), "        ");
        assert_eq!(terminal.current_state(), Some("070"));
    }

    #[test]
    fn test_four_fdk_selection_ignores_inactive_key() {
        let mut terminal = terminal_with_states(vec![State::new(
            "060",
            "select transaction",
            StateKind::FourFdkSelection {
                screen_number: "060".into(),
                buffer_location: "0".into(),
                exits: FdkExits::new("070", "255", "255", "255"),
            },
        )]);
        terminal.buttons_pressed.push_back("C".to_string());
        terminal.process_state("060");
        assert_eq!(terminal.current_state(), Some("060"));
        assert!(terminal.buttons_pressed.is_empty());
    }

    #[test]
    fn test_information_entry_clears_selected_buffer() {
        let mut terminal = terminal_with_states(vec![State::new(
            "080",
            "account entry",
            StateKind::InformationEntry {
                screen_number: "080".into(),
                buffer_and_display_params: "002".into(),
                exits: FdkExits::new("090", "255", "255", "255"),
            },
        )]);
        terminal.buffers.set_b("stale");
        terminal.buffers.set_c("kept");
        terminal.process_state("080");
        assert_eq!(terminal.buffers().b(), "");
        assert_eq!(terminal.buffers().c(), "kept");
    }

    #[test]
    fn test_fit_exit_selects_by_institution() {
        let fits = TableFits::with_entries([FitEntry {
            institution_id: "1".into(),
            pan_prefix: "476173".into(),
            max_pin_length: 4,
        }]);
        let services = Services::builder()
            .with_states(TableStates::with_states(vec![
                State::new(
                    "100",
                    "fit exit",
                    StateKind::FitExit {
                        state_exits: vec!["110".into(), "111".into(), "112".into()],
                    },
                ),
                card_read("111", "023", "112"),
            ]))
            .with_fits(fits)
            .build();
        let mut terminal = Terminal::new(services);
        insert_test_card(&mut terminal);
        terminal.process_state("100");
        assert_eq!(terminal.current_state(), Some("111"));
    }

    #[test]
    fn test_fit_exit_without_match_waits() {
        let mut terminal = terminal_with_states(vec![State::new(
            "100",
            "fit exit",
            StateKind::FitExit {
                state_exits: vec!["110".into()],
            },
        )]);
        insert_test_card(&mut terminal);
        terminal.process_state("100");
        assert_eq!(terminal.current_state(), Some("100"));
    }

    #[test]
    fn test_fdk_lookup_uses_remembered_letter() {
        let mut table = BTreeMap::new();
        table.insert('C', "140".to_string());
        let mut terminal = terminal_with_states(vec![
            State::new("130", "lookup", StateKind::FdkLookup { states: table }),
            card_read("140", "023", "141"),
        ]);
        terminal.buffers.set_fdk('C');
        terminal.process_state("130");
        assert_eq!(terminal.current_state(), Some("140"));
    }

    #[test]
    fn test_store_and_activate_with_extension() {
        let mut entries = vec!["000".to_string(); 10];
        entries[3] = "25".to_string(); // entry for key B
        let mut terminal = terminal_with_states(vec![
            State::new(
                "150",
                "fast cash",
                StateKind::StoreAndActivate {
                    screen_number: "150".into(),
                    fdk_active_mask: "015".into(),
                    buffer_id: "032".into(), // target amount, two zeroes
                    fdk_next_state: "160".into(),
                    extension_state: "151".into(),
                },
            ),
            State::new("151", "extension", StateKind::Extension { entries }),
            card_read("160", "023", "161"),
        ]);
        terminal.buttons_pressed.push_back("B".to_string());
        terminal.process_state("150");
        assert_eq!(terminal.buffers().fdk(), Some('B'));
        assert_eq!(terminal.buffers().amount(), "000000002500");
        assert_eq!(terminal.current_state(), Some("160"));
    }

    #[test]
    fn test_fdk_to_opcode_writes_letter() {
        let mut terminal = terminal_with_states(vec![
            State::new(
                "170",
                "store key",
                StateKind::FdkToOpcode {
                    screen_number: "170".into(),
                    fdk_active_mask: "015".into(),
                    buffer_positions: "3".into(),
                    fdk_next_state: "180".into(),
                    extension_state: "255".into(),
                },
            ),
            card_read("180", "023", "181"),
        ]);
        terminal.buttons_pressed.push_back("D".to_string());
        terminal.process_state("170");
        assert_eq!(terminal.buffers().opcode().get(), "   D    ");
        assert_eq!(terminal.current_state(), Some("180"));
    }

    #[test]
    fn test_fdk_to_opcode_extension_gap_waits() {
        let mut terminal = terminal_with_states(vec![State::new(
            "170",
            "store key",
            StateKind::FdkToOpcode {
                screen_number: "170".into(),
                fdk_active_mask: "015".into(),
                buffer_positions: "3".into(),
                fdk_next_state: "180".into(),
                extension_state: "171".into(),
            },
        )]);
        terminal.buttons_pressed.push_back("A".to_string());
        terminal.process_state("170");
        assert_eq!(terminal.current_state(), Some("170"));
    }

    #[test]
    fn test_close_clears_card() {
        let mut terminal = terminal_with_states(vec![State::new(
            "133",
            "close",
            StateKind::Close {
                receipt_delivered_screen: "010".into(),
            },
        )]);
        insert_test_card(&mut terminal);
        terminal.process_state("133");
        assert!(terminal.card().is_none());
        assert!(terminal.active_fdks().is_empty());
    }

    #[test]
    fn test_icc_states_chain_through() {
        let mut entries = vec!["000".to_string(); 10];
        entries[8] = "205".to_string();
        let mut terminal = terminal_with_states(vec![
            State::new(
                "200",
                "icc init",
                StateKind::IccInit {
                    icc_init_not_started_next_state: "201".into(),
                },
            ),
            State::new(
                "201",
                "icc app init",
                StateKind::IccAppInit {
                    please_wait_screen_number: "070".into(),
                    extension_state: "202".into(),
                },
            ),
            State::new("202", "extension", StateKind::Extension { entries }),
            State::new(
                "205",
                "icc data",
                StateKind::IccSetData {
                    next_state: "206".into(),
                },
            ),
            State::new(
                "206",
                "icc reinit",
                StateKind::IccReinit {
                    processing_not_performed_next_state: "207".into(),
                },
            ),
            card_read("207", "023", "208"),
        ]);
        terminal.process_state("200");
        assert_eq!(terminal.current_state(), Some("207"));
    }

    #[test]
    fn test_queue_cleared_on_transition_preserved_on_wait() {
        let mut terminal = terminal_with_states(vec![
            State::new(
                "060",
                "select",
                StateKind::FourFdkSelection {
                    screen_number: "060".into(),
                    buffer_location: "0".into(),
                    exits: FdkExits::new("070", "255", "255", "255"),
                },
            ),
            card_read("070", "023", "071"),
        ]);
        // waiting state keeps an empty queue intact, nothing to consume
        terminal.process_state("060");
        assert_eq!(terminal.current_state(), Some("060"));

        terminal.buttons_pressed.push_back("A".to_string());
        terminal.buttons_pressed.push_back("B".to_string());
        terminal.process_state("060");
        // transition away consumed A and dropped the leftover B
        assert!(terminal.buttons_pressed.is_empty());
    }
}
