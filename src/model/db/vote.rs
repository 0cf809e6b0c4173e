use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime},
    error::{TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::{Acknowledgment, TransactionOptions, WriteConcern},
    Client, ClientSession, Database,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    db::{candidate::Candidate, election::ElectionState, voter::Voter},
    mongodb::{Coll, Id},
};

/// The four ways a vote-casting attempt can end, other than infrastructure
/// failure. The rejections are terminal outcomes, not errors to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    Accepted,
    AlreadyVoted,
    ElectionClosed,
    InvalidCandidate,
}

/// Core audit record data: one row per committed vote, appended inside the
/// casting transaction and never mutated afterwards.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub voter: Id,
    pub candidate: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

/// A vote record without an ID.
pub type NewVote = VoteCore;

/// A vote record from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

/// Cast a vote: the one indivisible operation of the whole system.
///
/// Inside a single majority-write transaction this checks the election is
/// open, marks the voter as having voted, increments the chosen candidate's
/// count, and appends the audit record. If any step rejects or fails, the
/// transaction aborts and no partial effect survives.
///
/// The eligibility check and the flag write are one conditional update on
/// the voter document, which is what serializes concurrent attempts for the
/// same voter: the first committer wins, the loser's transaction conflicts,
/// retries, and then sees `has_voted == true`. Attempts for different voters
/// proceed independently; the candidate increment is a server-side `$inc`,
/// so simultaneous votes for the same candidate never lose updates.
pub async fn cast_vote(
    client: &Client,
    db: &Database,
    voter: Id,
    candidate: Id,
) -> Result<CastOutcome> {
    let options = TransactionOptions::builder()
        .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
        .build();
    let mut session = client.start_session(None).await?;

    'transaction: loop {
        session.start_transaction(options.clone()).await?;

        let outcome = match attempt_cast(db, &mut session, voter, candidate).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Abort before deciding anything; a failed abort on an
                // already-dead transaction is not interesting.
                let _ = session.abort_transaction().await;
                if is_transient(&err) {
                    continue 'transaction;
                }
                return Err(err);
            }
        };

        if outcome != CastOutcome::Accepted {
            // Terminal rejection: roll back so nothing is left behind.
            session.abort_transaction().await?;
            return Ok(outcome);
        }

        loop {
            match session.commit_transaction().await {
                Ok(()) => return Ok(CastOutcome::Accepted),
                Err(err) if err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) => continue,
                Err(err) if err.contains_label(TRANSIENT_TRANSACTION_ERROR) => {
                    continue 'transaction
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// One attempt at the casting transaction body.
async fn attempt_cast(
    db: &Database,
    session: &mut ClientSession,
    voter: Id,
    candidate: Id,
) -> Result<CastOutcome> {
    // The state read joins the transaction, so a concurrent toggle either
    // happens entirely before or entirely after this vote.
    let states = Coll::<ElectionState>::from_db(db);
    let state = ElectionState::get_with_session(&states, session).await?;
    if !state.is_open {
        return Ok(CastOutcome::ElectionClosed);
    }

    // Eligibility check and flag write in one conditional update. Matching
    // zero documents means the flag was already set: the auth guard has
    // already proven this voter exists.
    let voters = Coll::<Voter>::from_db(db);
    let eligible = doc! { "_id": voter, "has_voted": false };
    let marked = voters
        .update_one_with_session(eligible, doc! { "$set": { "has_voted": true } }, None, session)
        .await?;
    if marked.matched_count == 0 {
        return Ok(CastOutcome::AlreadyVoted);
    }

    // Candidate existence check and tally increment, also in one update.
    let candidates = Coll::<Candidate>::from_db(db);
    let incremented = candidates
        .update_one_with_session(
            doc! { "_id": candidate },
            doc! { "$inc": { "vote_count": 1 } },
            None,
            session,
        )
        .await?;
    if incremented.matched_count == 0 {
        return Ok(CastOutcome::InvalidCandidate);
    }

    let votes = Coll::<NewVote>::from_db(db);
    let record = NewVote {
        voter,
        candidate,
        cast_at: Utc::now(),
    };
    votes.insert_one_with_session(&record, None, session).await?;

    Ok(CastOutcome::Accepted)
}

/// Should the whole transaction be retried from the top?
fn is_transient(err: &Error) -> bool {
    matches!(err, Error::Db(db_err) if db_err.contains_label(TRANSIENT_TRANSACTION_ERROR))
}
