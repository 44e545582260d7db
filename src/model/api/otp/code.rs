use std::fmt::Display;
use std::str::FromStr;

use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LENGTH: usize = 6;

/// A one-time-password code: exactly [`LENGTH`] decimal digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code([u8; LENGTH]);

impl Code {
    /// Generate a random code.
    pub fn random() -> Self {
        let digit_dist = Uniform::from(0..=9);
        let mut rng = rand::thread_rng();
        let mut digits = [0; LENGTH];
        for digit in &mut digits {
            *digit = digit_dist.sample(&mut rng);
        }
        Self(digits)
    }

    pub fn digits(&self) -> &[u8; LENGTH] {
        &self.0
    }
}

impl Display for Code {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for digit in self.0 {
            write!(formatter, "{digit}")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodeError {
    #[error("code must contain exactly {LENGTH} characters, found {0}")]
    InvalidLength(usize),
    #[error("code must contain only digits, found '{0}'")]
    InvalidChar(char),
}

impl FromStr for Code {
    type Err = CodeError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let mut digits = [0; LENGTH];
        let mut len = 0;
        for c in string.chars() {
            let digit = c.to_digit(10).ok_or(CodeError::InvalidChar(c))?;
            if len < LENGTH {
                digits[len] = digit as u8;
            }
            len += 1;
        }
        if len != LENGTH {
            return Err(CodeError::InvalidLength(len));
        }
        Ok(Self(digits))
    }
}

impl TryFrom<String> for Code {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.to_string()
    }
}
