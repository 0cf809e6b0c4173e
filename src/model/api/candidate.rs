use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::model::{db::candidate::Candidate, mongodb::Id};

/// Request body for creating a candidate.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    pub party: String,
}

/// A candidate as shown on the ballot: no tally.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: Id,
    pub name: String,
    pub party: String,
}

impl From<Candidate> for CandidateSummary {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.candidate.name,
            party: candidate.candidate.party,
        }
    }
}

/// One row of the published results.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsEntry {
    pub name: String,
    pub party: String,
    pub vote_count: i64,
}

impl ResultsEntry {
    /// Order candidates by tally, highest first. The sort is stable, so
    /// tied candidates keep the order they were read in (insertion order,
    /// since ObjectIds are monotonic).
    pub fn ranked(mut candidates: Vec<Candidate>) -> Vec<ResultsEntry> {
        candidates.sort_by_key(|candidate| Reverse(candidate.vote_count));
        candidates.into_iter().map(Into::into).collect()
    }
}

impl From<Candidate> for ResultsEntry {
    fn from(candidate: Candidate) -> Self {
        Self {
            name: candidate.candidate.name,
            party: candidate.candidate.party,
            vote_count: candidate.candidate.vote_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::db::candidate::CandidateCore;

    fn candidate(name: &str, vote_count: i64) -> Candidate {
        Candidate {
            id: Id::new(),
            candidate: CandidateCore {
                name: name.to_string(),
                party: format!("{name} party"),
                vote_count,
            },
        }
    }

    #[test]
    fn orders_by_tally_descending() {
        let ranked = ResultsEntry::ranked(vec![
            candidate("low", 1),
            candidate("high", 7),
            candidate("mid", 3),
        ]);
        let names: Vec<_> = ranked.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, ["high", "mid", "low"]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let ranked = ResultsEntry::ranked(vec![
            candidate("first", 2),
            candidate("second", 2),
            candidate("third", 2),
            candidate("winner", 5),
        ]);
        let names: Vec<_> = ranked.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, ["winner", "first", "second", "third"]);
    }

    #[test]
    fn empty_field_is_fine() {
        assert!(ResultsEntry::ranked(Vec::new()).is_empty());
    }
}
