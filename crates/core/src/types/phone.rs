//! Mobile number type used for OTP login and family-member contacts.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains characters other than digits, spaces, `-` or a leading `+91`.
    #[error("phone number may only contain digits")]
    InvalidCharacter,
    /// The number does not have exactly ten digits.
    #[error("phone number must have 10 digits (got {0})")]
    WrongLength(usize),
}

/// A ten-digit Indian mobile number.
///
/// Accepts an optional `+91`/`91` country prefix and common separators and
/// stores the bare ten digits.
///
/// ```
/// use medico_core::PhoneNumber;
///
/// let phone = PhoneNumber::parse("+91 98765-43210").unwrap();
/// assert_eq!(phone.as_str(), "9876543210");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Number of digits in a national mobile number.
    pub const DIGITS: usize = 10;

    /// Parse a `PhoneNumber` from user input.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] if the input is empty, contains letters, or
    /// does not reduce to exactly ten digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let rest = s.strip_prefix('+').unwrap_or(s);
        if rest
            .chars()
            .any(|c| !(c.is_ascii_digit() || c == ' ' || c == '-'))
        {
            return Err(PhoneError::InvalidCharacter);
        }

        let mut digits: String = rest.chars().filter(char::is_ascii_digit).collect();
        if digits.len() == Self::DIGITS + 2 && digits.starts_with("91") {
            digits.drain(..2);
        }
        if digits.len() != Self::DIGITS {
            return Err(PhoneError::WrongLength(digits.len()));
        }

        Ok(Self(digits))
    }

    /// Returns the ten digits as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}
