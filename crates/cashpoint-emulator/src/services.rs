//! Collaborator trait definitions.
//!
//! These traits establish the contract between the terminal core and its
//! collaborators (screen store, state table, FIT table, crypto device,
//! display, hardware status, settings), enabling substitution between the
//! in-memory implementations in [`mock`](crate::mock) and real backends.
//!
//! The terminal owns one boxed implementation of each; everything runs on the
//! single driver thread, so the traits are plain synchronous interfaces.

use crate::states::State;

/// A screen as handed to the display: its table number and raw display data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screen {
    /// Three-digit screen number, empty for purely dynamic screens.
    pub number: String,

    /// Raw display payload (control sequences included).
    pub data: String,
}

impl Screen {
    pub fn new(number: impl Into<String>, data: impl Into<String>) -> Self {
        Screen {
            number: number.into(),
            data: data.into(),
        }
    }
}

/// Screen store: holds host-loaded screens and understands the dynamic
/// screen-data formats the host sends at transaction time.
pub trait ScreenService {
    /// Store one screen record. Returns `false` when the record is rejected.
    fn add(&mut self, screen_data: &str) -> bool;

    /// Parse dynamic screen data into a displayable screen.
    fn dynamic_screen(&self, data: &str) -> Option<Screen>;

    /// Apply a screen display update and return the resulting screen.
    fn screen_display_update(&mut self, data: &str) -> Option<Screen>;
}

/// State table: holds host-loaded states keyed by their 3-digit number.
pub trait StateService {
    /// Store one state record. Returns `false` when the record is rejected.
    fn add(&mut self, state_data: &str) -> bool;

    /// Fetch a state by number.
    fn get(&self, number: &str) -> Option<State>;
}

/// Financial institution table: maps card numbers to institution metadata.
pub trait FitService {
    /// Store one FIT record. Returns `false` when the record is rejected.
    fn add(&mut self, fit_data: &str) -> bool;

    /// The institution id owning this card number, if any.
    fn institution_by_card(&self, pan: &str) -> Option<String>;

    /// The institution's PIN-length policy for this card number.
    fn max_pin_length(&self, pan: &str) -> Option<usize>;
}

/// PIN-block construction and key storage.
pub trait CryptoService {
    /// Build an encrypted PIN block from the clear PIN and the PAN.
    fn encrypted_pin(&self, clear_pin: &str, pan: &str) -> Option<String>;

    /// Install a new communications key. Returns `false` on rejection.
    fn set_comms_key(&mut self, key_data: &str, key_length: usize) -> bool;
}

/// The customer-facing display.
pub trait DisplayService {
    fn set_screen(&mut self, screen: &Screen);

    fn set_screen_by_number(&mut self, number: &str);

    /// Echo keyed text at the cursor, masked when `mask` is set.
    fn insert_text(&mut self, text: &str, mask: Option<char>);
}

/// Hardware status provision for configuration-information replies.
pub trait HardwareService {
    fn hardware_fitness(&self) -> String;

    fn supplies_status(&self) -> String;

    fn release_number(&self) -> String;

    fn hardware_id(&self) -> String;
}

/// Key/value settings persistence.
///
/// The core touches exactly three keys: `host.luno`,
/// `message_coordination_number` and `config_id`.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str);
}

/// The full capability set a terminal is constructed with.
pub struct Services {
    pub screens: Box<dyn ScreenService>,
    pub states: Box<dyn StateService>,
    pub fits: Box<dyn FitService>,
    pub crypto: Box<dyn CryptoService>,
    pub display: Box<dyn DisplayService>,
    pub hardware: Box<dyn HardwareService>,
    pub settings: Box<dyn SettingsStore>,
}

impl Services {
    /// Create a builder pre-populated with the in-memory implementations.
    #[must_use]
    pub fn builder() -> ServicesBuilder {
        ServicesBuilder::default()
    }
}

impl Default for Services {
    fn default() -> Self {
        Services::builder().build()
    }
}

/// Builder for a [`Services`] set; every slot defaults to the corresponding
/// in-memory implementation from [`mock`](crate::mock).
#[derive(Default)]
pub struct ServicesBuilder {
    screens: Option<Box<dyn ScreenService>>,
    states: Option<Box<dyn StateService>>,
    fits: Option<Box<dyn FitService>>,
    crypto: Option<Box<dyn CryptoService>>,
    display: Option<Box<dyn DisplayService>>,
    hardware: Option<Box<dyn HardwareService>>,
    settings: Option<Box<dyn SettingsStore>>,
}

impl ServicesBuilder {
    pub fn with_screens(mut self, screens: impl ScreenService + 'static) -> Self {
        self.screens = Some(Box::new(screens));
        self
    }

    pub fn with_states(mut self, states: impl StateService + 'static) -> Self {
        self.states = Some(Box::new(states));
        self
    }

    pub fn with_fits(mut self, fits: impl FitService + 'static) -> Self {
        self.fits = Some(Box::new(fits));
        self
    }

    pub fn with_crypto(mut self, crypto: impl CryptoService + 'static) -> Self {
        self.crypto = Some(Box::new(crypto));
        self
    }

    pub fn with_display(mut self, display: impl DisplayService + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    pub fn with_hardware(mut self, hardware: impl HardwareService + 'static) -> Self {
        self.hardware = Some(Box::new(hardware));
        self
    }

    pub fn with_settings(mut self, settings: impl SettingsStore + 'static) -> Self {
        self.settings = Some(Box::new(settings));
        self
    }

    /// Build the capability set, filling empty slots with in-memory defaults.
    #[must_use]
    pub fn build(self) -> Services {
        use crate::mock;

        Services {
            screens: self
                .screens
                .unwrap_or_else(|| Box::new(mock::TableScreens::default())),
            states: self
                .states
                .unwrap_or_else(|| Box::new(mock::TableStates::default())),
            fits: self
                .fits
                .unwrap_or_else(|| Box::new(mock::TableFits::default())),
            crypto: self
                .crypto
                .unwrap_or_else(|| Box::new(mock::SoftHsm::default())),
            display: self
                .display
                .unwrap_or_else(|| Box::new(mock::PanelDisplay::default())),
            hardware: self
                .hardware
                .unwrap_or_else(|| Box::new(mock::StaticHardware::default())),
            settings: self
                .settings
                .unwrap_or_else(|| Box::new(mock::MemorySettings::default())),
        }
    }
}
