//! The terminal instance.
//!
//! Owns every piece of mutable state (status, configuration, buffers, card,
//! interpreter context) plus the collaborator set it was constructed with.
//! There is no module-level state anywhere in this crate; two terminals in
//! one process stay completely independent.

use crate::buffers::BufferSet;
use crate::fdk::ActiveFdks;
use crate::services::Services;
use cashpoint_core::constants::{
    DEFAULT_CONFIG_ID, DEFAULT_INITIAL_SCREEN, DEFAULT_LUNO, SETTING_CONFIG_ID, SETTING_LUNO,
};
use cashpoint_core::{Card, Luno, TerminalStatus};
use cashpoint_protocol::{ConfigParameter, SupplyCounters, TransactionRequest};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, warn};

/// Configuration pushed down by the host through Enhanced Configuration Data
/// loads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostConfiguration {
    /// Screen to drive when the terminal goes in service (option `000`).
    pub initial_screen_number: Option<String>,

    /// Hardware configuration hex string (option `010`).
    pub hardware_configuration: Option<String>,

    /// Sensor status hex string (option `020`).
    pub sensor_status: Option<String>,

    /// Remaining host-supplied options, keyed by their 3-digit IDs.
    pub parameters: BTreeMap<String, String>,
}

/// A simulated ATM terminal.
///
/// All entry points (`process_host_message`, `read_card`,
/// `process_pinpad_button`, `process_fdk_button`) run to completion on the
/// single driver thread; a state handler that awaits input leaves the
/// terminal at rest until the next entry-point call.
pub struct Terminal {
    pub(crate) services: Services,
    pub(crate) status: TerminalStatus,
    pub(crate) config_id: String,
    pub(crate) supply_counters: SupplyCounters,
    pub(crate) host_config: HostConfiguration,
    pub(crate) buffers: BufferSet,
    pub(crate) fdks: ActiveFdks,
    pub(crate) card: Option<Card>,
    pub(crate) current_state: Option<String>,
    pub(crate) buttons_pressed: VecDeque<String>,
    pub(crate) transaction_request: Option<TransactionRequest>,
    pub(crate) interactive_transaction: bool,
}

impl Terminal {
    /// Create a terminal with the given capability set and load the supply
    /// counters and config id from settings.
    #[must_use]
    pub fn new(services: Services) -> Self {
        let mut terminal = Terminal {
            services,
            status: TerminalStatus::Offline,
            config_id: DEFAULT_CONFIG_ID.to_string(),
            supply_counters: SupplyCounters::default(),
            host_config: HostConfiguration::default(),
            buffers: BufferSet::default(),
            fdks: ActiveFdks::default(),
            card: None,
            current_state: None,
            buttons_pressed: VecDeque::new(),
            transaction_request: None,
            interactive_transaction: false,
        };
        terminal.init_counters();
        terminal
    }

    /// Update the terminal status. Going Offline or Out of service resets the
    /// displayed screen to the initial screen.
    pub fn set_status(&mut self, status: TerminalStatus) {
        debug!(%status, "terminal status change");
        self.status = status;
        if matches!(
            status,
            TerminalStatus::Offline | TerminalStatus::OutOfService
        ) {
            let screen = self
                .host_config
                .initial_screen_number
                .clone()
                .unwrap_or_else(|| DEFAULT_INITIAL_SCREEN.to_string());
            self.services.display.set_screen_by_number(&screen);
        }
    }

    /// Set the configuration id and mirror it to persisted settings.
    pub fn set_config_id(&mut self, config_id: &str) {
        self.config_id = config_id.to_string();
        self.services.settings.set(SETTING_CONFIG_ID, config_id);
    }

    /// Load the config id from settings and install the default counters.
    pub fn init_counters(&mut self) {
        self.config_id = self
            .services
            .settings
            .get(SETTING_CONFIG_ID)
            .unwrap_or_else(|| DEFAULT_CONFIG_ID.to_string());
        self.supply_counters = SupplyCounters::default();
    }

    /// Apply enhanced-configuration parameters. Recognized option IDs land in
    /// their named slots, other well-formed IDs in the parameter map;
    /// malformed IDs are logged and ignored.
    pub fn apply_enhanced_config(&mut self, parameters: &[ConfigParameter]) {
        for parameter in parameters {
            match parameter.id.as_str() {
                "000" => {
                    self.host_config.initial_screen_number =
                        Some(format!("{:0>3}", parameter.value));
                }
                "010" => {
                    self.host_config.hardware_configuration = Some(parameter.value.clone());
                }
                "020" => {
                    self.host_config.sensor_status = Some(parameter.value.clone());
                }
                id if id.len() == 3 && id.bytes().all(|b| b.is_ascii_digit()) => {
                    debug!(id, value = %parameter.value, "storing configuration option");
                    self.host_config
                        .parameters
                        .insert(id.to_string(), parameter.value.clone());
                }
                id => {
                    warn!(id, "ignoring malformed configuration option id");
                }
            }
        }
    }

    /// The terminal's LUNO from settings, zero-padded and validated, falling
    /// back to the default.
    #[must_use]
    pub fn luno(&self) -> String {
        match self.services.settings.get(SETTING_LUNO).as_deref() {
            Some(configured) => match Luno::new(configured) {
                Ok(luno) => luno.to_string(),
                Err(error) => {
                    warn!(%error, "ignoring malformed LUNO setting");
                    DEFAULT_LUNO.to_string()
                }
            },
            None => DEFAULT_LUNO.to_string(),
        }
    }

    pub fn status(&self) -> TerminalStatus {
        self.status
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn supply_counters(&self) -> &SupplyCounters {
        &self.supply_counters
    }

    pub fn host_config(&self) -> &HostConfiguration {
        &self.host_config
    }

    pub fn card(&self) -> Option<&Card> {
        self.card.as_ref()
    }

    /// The state the interpreter is currently resting at.
    pub fn current_state(&self) -> Option<&str> {
        self.current_state.as_deref()
    }

    pub fn buffers(&self) -> &BufferSet {
        &self.buffers
    }

    pub fn active_fdks(&self) -> &ActiveFdks {
        &self.fdks
    }

    /// The pending transaction request, if state navigation assembled one.
    pub fn transaction_request(&self) -> Option<&TransactionRequest> {
        self.transaction_request.as_ref()
    }

    /// Hand the pending transaction request to the transport, clearing it.
    pub fn take_transaction_request(&mut self) -> Option<TransactionRequest> {
        self.transaction_request.take()
    }

    pub fn is_interactive_transaction(&self) -> bool {
        self.interactive_transaction
    }

    /// Drive the current state again, if the terminal is resting at one.
    pub(crate) fn resume(&mut self) {
        if let Some(current) = self.current_state.clone() {
            self.process_state(&current);
        }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Terminal::new(Services::default())
    }
}
