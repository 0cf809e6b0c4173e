use std::{ops::Deref, str::FromStr};

use phonenumber::PhoneNumber;
use serde::{Deserialize, Serialize};

/// A voter's phone number, validated at the serde boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone {
    inner: PhoneNumber,
}

impl Deref for Phone {
    type Target = PhoneNumber;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FromStr for Phone {
    type Err = phonenumber::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Phone {
            inner: s.parse::<PhoneNumber>()?,
        })
    }
}

impl TryFrom<String> for Phone {
    type Error = phonenumber::ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_international_numbers() {
        assert!("+441234567890".parse::<Phone>().is_ok());
    }

    #[test]
    fn rejects_junk() {
        assert!("not a number".parse::<Phone>().is_err());
    }
}
