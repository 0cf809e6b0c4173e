use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{api::candidate::CandidateSpec, mongodb::Id};

/// Core candidate data, as stored in the database.
///
/// `vote_count` is owned by the vote ledger and only ever changes by an
/// atomic increment inside its transaction, so it is monotonically
/// non-decreasing while the election runs.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub name: String,
    pub party: String,
    pub vote_count: i64,
}

impl From<CandidateSpec> for CandidateCore {
    fn from(spec: CandidateSpec) -> Self {
        Self {
            name: spec.name,
            party: spec.party,
            vote_count: 0,
        }
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example() -> Self {
            Self {
                name: "Rowan Vale".to_string(),
                party: "Unity".to_string(),
                vote_count: 0,
            }
        }

        pub fn example2() -> Self {
            Self {
                name: "Jules Harrow".to_string(),
                party: "Progress".to_string(),
                vote_count: 0,
            }
        }
    }
}
