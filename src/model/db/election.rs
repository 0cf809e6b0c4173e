use mongodb::{
    bson::{doc, Document},
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
    ClientSession,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Coll;

/// Well-known ID of the single election state document.
pub const ELECTION_STATE_ID: &str = "election";

/// The global election state: a single document whose `is_open` flag gates
/// vote acceptance. Only the admin toggle writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionState {
    #[serde(rename = "_id")]
    pub id: String,
    pub is_open: bool,
}

impl ElectionState {
    /// A filter matching the state document.
    pub fn filter() -> Document {
        doc! { "_id": ELECTION_STATE_ID }
    }

    /// Create the state document if it does not exist yet, with the given
    /// initial state. Idempotent: an existing document is left untouched.
    pub async fn ensure_exists(
        states: &Coll<ElectionState>,
        starts_open: bool,
    ) -> std::result::Result<(), DbError> {
        let options = UpdateOptions::builder().upsert(true).build();
        states
            .update_one(
                Self::filter(),
                doc! { "$setOnInsert": { "is_open": starts_open } },
                options,
            )
            .await?;
        Ok(())
    }

    /// Read the current state.
    pub async fn get(states: &Coll<ElectionState>) -> Result<ElectionState> {
        states
            .find_one(Self::filter(), None)
            .await?
            .ok_or_else(|| Error::not_found("Election state"))
    }

    /// Read the current state from within a transaction.
    pub async fn get_with_session(
        states: &Coll<ElectionState>,
        session: &mut ClientSession,
    ) -> Result<ElectionState> {
        states
            .find_one_with_session(Self::filter(), None, session)
            .await?
            .ok_or_else(|| Error::not_found("Election state"))
    }

    /// Atomically flip the open/closed flag and return the new value.
    ///
    /// The flip happens server-side in a single pipeline update, so
    /// concurrent toggles and readers only ever see the pre- or post-toggle
    /// value.
    pub async fn toggle(states: &Coll<ElectionState>) -> Result<bool> {
        let flip = vec![doc! { "$set": { "is_open": { "$not": "$is_open" } } }];
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let state = states
            .find_one_and_update(Self::filter(), flip, options)
            .await?
            .ok_or_else(|| Error::not_found("Election state"))?;
        info!(
            "Election is now {}",
            if state.is_open { "OPEN" } else { "CLOSED" }
        );
        Ok(state.is_open)
    }
}
