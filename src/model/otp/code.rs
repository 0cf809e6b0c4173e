use std::fmt::Display;
use std::ops::Deref;
use std::str::FromStr;

use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CODE_LENGTH: usize = 6;

/// A one-time-passcode: exactly six decimal digits, stored digit-by-digit
/// but always read and written as a string like `"042917"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code {
    digits: [u8; CODE_LENGTH],
}

impl Code {
    /// Generate a random code.
    pub fn random() -> Self {
        let digit_dist = Uniform::from(0..=9);
        let mut rng = rand::thread_rng();
        let mut digits = [0; CODE_LENGTH];
        for digit in &mut digits {
            *digit = digit_dist.sample(&mut rng);
        }
        Self { digits }
    }
}

impl Deref for Code {
    type Target = [u8; CODE_LENGTH];

    fn deref(&self) -> &Self::Target {
        &self.digits
    }
}

impl Display for Code {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for digit in self.digits {
            // Valid as every element is a single decimal digit.
            write!(formatter, "{}", char::from_digit(digit.into(), 10).unwrap())?;
        }
        Ok(())
    }
}

impl FromStr for Code {
    type Err = ParseError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        if string.len() != CODE_LENGTH {
            return Err(ParseError::InvalidLength(string.len()));
        }
        let mut digits = [0; CODE_LENGTH];
        for (digit, c) in digits.iter_mut().zip(string.chars()) {
            *digit = c
                .to_digit(10)
                .map(|d| d as u8)
                .ok_or(ParseError::InvalidChar(c))?;
        }
        Ok(Self { digits })
    }
}

impl TryFrom<String> for Code {
    type Error = ParseError;

    fn try_from(string: String) -> Result<Self, Self::Error> {
        string.parse()
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.to_string()
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("code must contain exactly {CODE_LENGTH} characters, got {0}")]
    InvalidLength(usize),
    #[error("code must contain only digits, got '{0}'")]
    InvalidChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_its_string_form() {
        let code = Code {
            digits: [0, 4, 2, 9, 1, 7],
        };
        assert_eq!(code.to_string(), "042917");
        assert_eq!("042917".parse::<Code>().unwrap(), code);
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(matches!(
            "12345".parse::<Code>(),
            Err(ParseError::InvalidLength(5))
        ));
        assert!(matches!(
            "1234567".parse::<Code>(),
            Err(ParseError::InvalidLength(7))
        ));
        assert!(matches!(
            "12345x".parse::<Code>(),
            Err(ParseError::InvalidChar('x'))
        ));
        assert!("".parse::<Code>().is_err());
    }

    #[test]
    fn serde_uses_the_string_form() {
        use rocket::serde::json::serde_json;

        let code = "309154".parse::<Code>().unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"309154\"");
        let back: Code = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn random_codes_are_well_formed() {
        for _ in 0..100 {
            let code = Code::random();
            assert!(code.iter().all(|digit| *digit <= 9));
            assert_eq!(code.to_string().len(), CODE_LENGTH);
        }
    }
}
