use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{
    api::{phone::Phone, voter::RegistrationRequest},
    mongodb::Id,
};

/// Core voter data, as stored in the database.
///
/// `has_voted` is owned by the vote ledger: nothing else ever writes it, and
/// it moves from false to true exactly once.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// The registration identity the voter signs in with.
    pub voter_id: String,
    pub name: String,
    pub email: String,
    pub phone: Phone,
    pub has_voted: bool,
}

impl From<RegistrationRequest> for VoterCore {
    fn from(registration: RegistrationRequest) -> Self {
        Self {
            voter_id: registration.voter_id,
            name: registration.name,
            email: registration.email,
            phone: registration.phone,
            has_voted: false,
        }
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with their unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}
