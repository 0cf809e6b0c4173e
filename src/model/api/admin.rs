use serde::{Deserialize, Serialize};

/// Admin sign-in credentials.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCredentials {
        pub fn example() -> Self {
            Self {
                username: "returning-officer".to_string(),
                password: "correct horse battery staple".to_string(),
            }
        }

        pub fn empty() -> Self {
            Self {
                username: String::new(),
                password: String::new(),
            }
        }
    }
}
