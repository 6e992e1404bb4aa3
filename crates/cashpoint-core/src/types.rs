use crate::{
    Result,
    constants::{
        LUNO_WIDTH, MAX_PAN_LENGTH, SERVICE_CODE_OFFSET, SERVICE_CODE_WIDTH, TRACK2_SENTINEL,
        TRACK2_SEPARATOR,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Logical Unit Number (3 digits, zero-padded)
///
/// Identifies the terminal towards the authorization host. Every outbound
/// message carries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Luno(String);

impl Luno {
    /// Create a new LUNO with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` if the value is not 1-3 ASCII digits.
    pub fn new(luno: &str) -> Result<Self> {
        if luno.is_empty() || luno.len() > LUNO_WIDTH || !luno.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidMessageFormat {
                message: format!("LUNO must be 1-{LUNO_WIDTH} digits, got '{luno}'"),
            });
        }
        Ok(Luno(format!("{:0>width$}", luno, width = LUNO_WIDTH)))
    }

    /// Get the zero-padded LUNO as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Luno {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Luno {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Luno::new(s)
    }
}

/// Primary Account Number
///
/// # Security
/// This type implements constant-time comparison to prevent timing attacks
/// when matching account numbers against institution tables.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Pan(String);

impl Pan {
    /// Create a new PAN with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardFormat` if the PAN is empty, longer than
    /// 19 digits, or contains non-digit characters.
    pub fn new(pan: &str) -> Result<Self> {
        if pan.is_empty() || pan.len() > MAX_PAN_LENGTH {
            return Err(Error::InvalidCardFormat(format!(
                "PAN must be 1-{MAX_PAN_LENGTH} digits, got {} chars",
                pan.len()
            )));
        }
        if !pan.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidCardFormat(
                "PAN must contain only digits".to_string(),
            ));
        }
        Ok(Pan(pan.to_string()))
    }

    /// Get the PAN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Pan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Pan::new(s)
    }
}

/// Constant-time comparison implementation for Pan
impl PartialEq for Pan {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for Pan {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// A card read from the magnetic stripe.
///
/// Parsed from the ISO 7813 Track 2 image: the PAN sits between the `;`
/// start sentinel and the `=` field separator; the expiry (4 digits) and the
/// service code (3 digits) follow the separator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Primary account number.
    pub number: Pan,

    /// Three-digit service code from the discretionary region.
    pub service_code: String,

    /// The raw Track 2 string as read.
    pub track2: String,
}

impl Card {
    /// Parse a card from its Track 2 image.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardFormat` if the sentinel or separator is
    /// missing, the PAN is malformed, or the region after the separator is
    /// too short to carry a service code.
    ///
    /// # Examples
    ///
    /// ```
    /// use cashpoint_core::Card;
    ///
    /// let card = Card::from_track2(";4761739001010010=30121011000012340000?").unwrap();
    /// assert_eq!(card.number.as_str(), "4761739001010010");
    /// assert_eq!(card.service_code, "101");
    /// ```
    pub fn from_track2(track2: &str) -> Result<Self> {
        let body = track2
            .strip_prefix(TRACK2_SENTINEL)
            .ok_or_else(|| Error::InvalidCardFormat("missing start sentinel".to_string()))?;

        let (pan, rest) = body.split_once(TRACK2_SEPARATOR).ok_or_else(|| {
            Error::InvalidCardFormat("missing field separator".to_string())
        })?;

        let number = Pan::new(pan)?;

        let service_code = rest
            .get(SERVICE_CODE_OFFSET..SERVICE_CODE_OFFSET + SERVICE_CODE_WIDTH)
            .ok_or_else(|| {
                Error::InvalidCardFormat("track too short for service code".to_string())
            })?;
        if !service_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidCardFormat(format!(
                "service code must be numeric, got '{service_code}'"
            )));
        }

        Ok(Card {
            number,
            service_code: service_code.to_string(),
            track2: track2.to_string(),
        })
    }
}

/// Terminal status
///
/// Drives default screen selection and which inputs the terminal accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    /// No host connection established.
    Offline,
    /// Connected to the host but not yet placed in service.
    Connected,
    /// Serving customers.
    InService,
    /// Taken out of service by the host.
    OutOfService,
    /// A card is inside the terminal and a transaction is in flight.
    ProcessingCard,
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            TerminalStatus::Offline => "Offline",
            TerminalStatus::Connected => "Connected",
            TerminalStatus::InService => "In service",
            TerminalStatus::OutOfService => "Out of service",
            TerminalStatus::ProcessingCard => "Processing card",
        };
        write!(f, "{}", status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("009", "009")]
    #[case("9", "009")]
    #[case("123", "123")]
    fn test_luno_valid(#[case] input: &str, #[case] expected: &str) {
        let luno: Luno = input.parse().unwrap();
        assert_eq!(luno.as_str(), expected);
    }

    #[rstest]
    #[case("")] // empty
    #[case("1234")] // too long
    #[case("0a9")] // non-numeric
    fn test_luno_invalid(#[case] input: &str) {
        let result: Result<Luno> = input.parse();
        assert!(result.is_err());
    }

    #[rstest]
    #[case("4761739001010010")]
    #[case("1234567890123456789")] // 19 digits, the ISO maximum
    fn test_pan_valid(#[case] input: &str) {
        let pan = Pan::new(input).unwrap();
        assert_eq!(pan.as_str(), input);
    }

    #[rstest]
    #[case("")]
    #[case("12345678901234567890")] // 20 digits
    #[case("4761x39001010010")]
    fn test_pan_invalid(#[case] input: &str) {
        assert!(Pan::new(input).is_err());
    }

    #[test]
    fn test_pan_equality() {
        let a = Pan::new("4761739001010010").unwrap();
        let b = Pan::new("4761739001010010").unwrap();
        let c = Pan::new("4761739001010011").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_card_from_track2() {
        let raw = ";4761739001010010=30121011000012340000?";
        let card = Card::from_track2(raw).unwrap();
        assert_eq!(card.number.as_str(), "4761739001010010");
        assert_eq!(card.service_code, "101");
        assert_eq!(card.track2, raw);
    }

    #[rstest]
    #[case("4761739001010010=30121011000012340000?")] // no sentinel
    #[case(";4761739001010010")] // no separator
    #[case(";4761739001010010=301")] // too short for service code
    #[case(";476173900101001x=30121011000012340000?")] // bad PAN
    #[case(";4761739001010010=3012xx1000012340000?")] // bad service code
    fn test_card_from_track2_invalid(#[case] input: &str) {
        assert!(Card::from_track2(input).is_err());
    }

    #[test]
    fn test_terminal_status_display() {
        assert_eq!(TerminalStatus::InService.to_string(), "In service");
        assert_eq!(TerminalStatus::OutOfService.to_string(), "Out of service");
    }

    #[test]
    fn test_terminal_status_serialization() {
        let serialized = serde_json::to_string(&TerminalStatus::ProcessingCard).unwrap();
        assert_eq!(serialized, "\"processing_card\"");

        let deserialized: TerminalStatus = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, TerminalStatus::ProcessingCard);
    }
}
