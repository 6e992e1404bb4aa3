//! Host message dispatch.
//!
//! Classifies each inbound record, routes it to the matching mutation or
//! state drive, and synthesizes the solicited status reply. Anything that
//! fails classification or a collaborator load comes back as a Command
//! Reject; the terminal itself never errors across this boundary.

use crate::terminal::Terminal;
use cashpoint_core::TerminalStatus;
use cashpoint_protocol::{
    HostCommand, HostMessage, SolicitedStatus, TerminalCommand, TransactionReply,
};
use tracing::{debug, info, warn};

impl Terminal {
    /// Process one host message and produce the solicited status reply.
    pub fn process_host_message(&mut self, message: &HostMessage) -> Option<SolicitedStatus> {
        let command = match message.classify() {
            Ok(command) => command,
            Err(error) => {
                warn!(%error, class = %message.message_class, "rejecting host message");
                return Some(SolicitedStatus::command_reject(&self.luno()));
            }
        };

        match command {
            HostCommand::Terminal(command) => Some(self.run_terminal_command(command)),

            HostCommand::LoadScreens(screens) => {
                let ok = screens
                    .iter()
                    .all(|record| self.services.screens.add(record));
                Some(self.load_result("screen data", ok))
            }

            HostCommand::LoadStates(states) => {
                let ok = states.iter().all(|record| self.services.states.add(record));
                Some(self.load_result("state tables", ok))
            }

            HostCommand::LoadFits(fits) => {
                let ok = fits.iter().all(|record| self.services.fits.add(record));
                Some(self.load_result("FIT data", ok))
            }

            HostCommand::LoadConfigId(config_id) => {
                self.set_config_id(&config_id);
                Some(SolicitedStatus::ready(&self.luno()))
            }

            HostCommand::LoadEnhancedConfig(parameters) => {
                self.apply_enhanced_config(&parameters);
                Some(SolicitedStatus::ready(&self.luno()))
            }

            HostCommand::InteractiveTransactionResponse {
                active_keys,
                screen_data,
            } => {
                self.interactive_transaction = true;
                if let Some(mask) = active_keys
                    && let Err(error) = self.fdks.set_active_mask(&mask)
                {
                    warn!(%error, "interactive response carried a bad key mask");
                }
                if let Some(data) = screen_data {
                    match self.services.screens.dynamic_screen(&data) {
                        Some(screen) => self.services.display.set_screen(&screen),
                        None => warn!("interactive response carried unusable screen data"),
                    }
                }
                Some(SolicitedStatus::ready(&self.luno()))
            }

            HostCommand::DecipherCommsKey {
                key_data,
                key_length,
            } => {
                if self.services.crypto.set_comms_key(&key_data, key_length) {
                    info!("communications key installed");
                    Some(SolicitedStatus::ready(&self.luno()))
                } else {
                    warn!("communications key rejected");
                    Some(SolicitedStatus::command_reject(&self.luno()))
                }
            }

            HostCommand::TransactionReply(reply) => Some(self.run_transaction_reply(&reply)),

            HostCommand::EmvConfiguration => {
                // accepted and acknowledged, no semantic processing
                Some(SolicitedStatus::ready(&self.luno()))
            }
        }
    }

    fn run_terminal_command(&mut self, command: TerminalCommand) -> SolicitedStatus {
        match command {
            TerminalCommand::GoInService => {
                self.set_status(TerminalStatus::InService);
                let entry_state = self
                    .host_config
                    .initial_screen_number
                    .clone()
                    .unwrap_or_else(|| "000".to_string());
                self.process_state(&entry_state);
                self.buffers.init();
                self.fdks.clear();
                self.buttons_pressed.clear();
                SolicitedStatus::ready(&self.luno())
            }

            TerminalCommand::GoOutOfService => {
                self.set_status(TerminalStatus::OutOfService);
                self.buffers.init();
                self.fdks.clear();
                self.buttons_pressed.clear();
                self.card = None;
                SolicitedStatus::ready(&self.luno())
            }

            TerminalCommand::SendConfigurationId => {
                SolicitedStatus::terminal_state(&self.luno(), &self.config_id)
            }

            TerminalCommand::SendConfigurationInformation => {
                let mut reply = SolicitedStatus::terminal_state(&self.luno(), &self.config_id);
                reply.data.hardware_fitness = Some(self.services.hardware.hardware_fitness());
                reply.data.hardware_configuration = Some(
                    self.host_config
                        .hardware_configuration
                        .clone()
                        .unwrap_or_default(),
                );
                reply.data.supplies_status = Some(self.services.hardware.supplies_status());
                reply.data.sensor_status =
                    Some(self.host_config.sensor_status.clone().unwrap_or_default());
                reply.data.release_number = Some(self.services.hardware.release_number());
                reply.data.ndc_software_id = Some(self.services.hardware.hardware_id());
                reply
            }

            TerminalCommand::SendSupplyCounters => {
                SolicitedStatus::terminal_state(&self.luno(), &self.config_id)
                    .with_supply_counters(self.supply_counters.clone())
            }
        }
    }

    fn run_transaction_reply(&mut self, reply: &TransactionReply) -> SolicitedStatus {
        self.process_state(&reply.next_state);

        if let Some(update) = &reply.screen_display_update {
            match self.services.screens.screen_display_update(update) {
                Some(screen) => self.services.display.set_screen(&screen),
                None => warn!("unusable screen display update"),
            }
        }

        if let Some(notes) = &reply.notes_to_dispense
            && !notes.is_empty()
        {
            let count: u128 = notes.parse().unwrap_or_else(|_| {
                warn!(%notes, "notes to dispense is not numeric");
                0
            });
            info!(count, "dispensing notes");
            self.supply_counters.bump_notes_dispensed(count);
        }

        if let Some(data) = &reply.printer_data {
            info!(%data, "printing");
        }

        SolicitedStatus::ready(&self.luno())
    }

    fn load_result(&self, what: &str, ok: bool) -> SolicitedStatus {
        if ok {
            debug!(what, "load accepted");
            SolicitedStatus::ready(&self.luno())
        } else {
            warn!(what, "load rejected");
            SolicitedStatus::command_reject(&self.luno())
        }
    }
}
