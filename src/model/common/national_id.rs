use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of digits in a national ID.
pub const NATIONAL_ID_LENGTH: usize = 16;

/// A citizen's national ID: exactly 16 ASCII digits.
///
/// Only the format is checked; whether the ID is actually registered is up to
/// the NIDA verification flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NationalId(String);

impl NationalId {
    /// Year of birth encoded in digits 1 to 4 of the ID.
    pub fn birth_year(&self) -> i32 {
        // Valid because the ID is all ASCII digits.
        self.0[1..5].parse().unwrap()
    }

    /// The final digit of the ID.
    pub fn last_digit(&self) -> u32 {
        self.0
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NationalIdError {
    #[error("National ID must be {NATIONAL_ID_LENGTH} digits, got {0}")]
    InvalidLength(usize),
    #[error("National ID must only contain digits, found '{0}'")]
    InvalidChar(char),
}

impl FromStr for NationalId {
    type Err = NationalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(c) = s.chars().find(|c| !c.is_ascii_digit()) {
            return Err(NationalIdError::InvalidChar(c));
        }
        if s.len() != NATIONAL_ID_LENGTH {
            return Err(NationalIdError::InvalidLength(s.len()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for NationalId {
    type Error = NationalIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NationalId> for String {
    fn from(id: NationalId) -> Self {
        id.0
    }
}

impl Deref for NationalId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for NationalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let id: NationalId = "1199080012345673".parse().unwrap();
        assert_eq!(id.birth_year(), 1990);
        assert_eq!(id.last_digit(), 3);

        assert_eq!(
            "123".parse::<NationalId>(),
            Err(NationalIdError::InvalidLength(3))
        );
        assert_eq!(
            "11990800123456731".parse::<NationalId>(),
            Err(NationalIdError::InvalidLength(17))
        );
        assert_eq!(
            "11990800123a5673".parse::<NationalId>(),
            Err(NationalIdError::InvalidChar('a'))
        );
        // Non-ASCII digits are not digits here.
        assert!("119908001234567٣".parse::<NationalId>().is_err());
    }
}
