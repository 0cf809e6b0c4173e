use serde::{Deserialize, Serialize};

use crate::model::otp::Code;

/// Request body for starting the OTP exchange.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRequest {
    pub voter_id: String,
    pub email: String,
}

/// Request body for completing the OTP exchange.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub voter_id: String,
    pub code: Code,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::db::voter::NewVoter;

    impl ChallengeRequest {
        pub fn example() -> Self {
            let voter = NewVoter::example();
            Self {
                voter_id: voter.voter_id,
                email: voter.email,
            }
        }
    }

    impl VerifyRequest {
        pub fn example(code: Code) -> Self {
            Self {
                voter_id: NewVoter::example().voter_id,
                code,
            }
        }
    }
}
