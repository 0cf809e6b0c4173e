use serde::{Deserialize, Serialize};

use crate::model::api::phone::Phone;

/// Request body for voter registration.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub voter_id: String,
    pub name: String,
    pub email: String,
    pub phone: Phone,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::db::voter::NewVoter;

    impl RegistrationRequest {
        pub fn example() -> Self {
            let voter = NewVoter::example();
            Self {
                voter_id: voter.voter_id,
                name: voter.name,
                email: voter.email,
                phone: voter.phone,
            }
        }
    }
}
