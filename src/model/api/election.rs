use serde::{Deserialize, Serialize};

use super::candidate::ResultsEntry;

/// The election state as reported to clients.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionStatus {
    pub is_open: bool,
}

/// Everything the admin dashboard shows in one response: the current state
/// and the live tallies.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub is_open: bool,
    pub results: Vec<ResultsEntry>,
}
