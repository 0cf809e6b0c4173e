use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Request body for casting a vote.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub candidate: Id,
}
