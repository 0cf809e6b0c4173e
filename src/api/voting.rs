use mongodb::{Client, Database};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{candidate::CandidateSummary, vote::VoteRequest},
        auth::AuthToken,
        db::{
            candidate::Candidate,
            vote::{cast_vote, CastOutcome},
            voter::Voter,
        },
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_candidates, cast]
}

/// The ballot as shown to a signed-in voter: candidates without tallies.
#[get("/voter/candidates")]
pub async fn get_candidates(
    _token: AuthToken<Voter>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateSummary>>> {
    let field: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;
    Ok(Json(field.into_iter().map(Into::into).collect()))
}

#[post("/voter/votes", data = "<vote>", format = "json")]
pub async fn cast(
    token: AuthToken<Voter>,
    vote: Json<VoteRequest>,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<()> {
    match cast_vote(db_client, db, token.id, vote.candidate).await? {
        CastOutcome::Accepted => {
            info!("Voter {} cast their vote", token.id);
            Ok(())
        }
        CastOutcome::AlreadyVoted => Err(Error::AlreadyVoted),
        CastOutcome::ElectionClosed => Err(Error::ElectionClosed),
        CastOutcome::InvalidCandidate => {
            Err(Error::not_found(format!("Candidate {}", vote.candidate)))
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::{bson::doc, Database};
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use crate::model::{
        db::{
            candidate::{CandidateCore, NewCandidate},
            election::ElectionState,
            vote::Vote,
        },
        mongodb::Id,
    };

    use super::*;

    #[backend_test]
    async fn ballot_requires_login(client: Client) {
        let response = client.get(uri!(get_candidates)).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(voter)]
    async fn ballot_lists_candidates_without_tallies(client: Client, db: Database) {
        insert_candidates(&db).await;

        let response = client.get(uri!(get_candidates)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let raw_response = response.into_string().await.unwrap();
        let ballot: Vec<CandidateSummary> =
            rocket::serde::json::serde_json::from_str(&raw_response).unwrap();
        assert_eq!(ballot.len(), 2);
        assert_eq!(ballot[0].name, NewCandidate::example().name);
        assert_eq!(ballot[1].name, NewCandidate::example2().name);
    }

    #[backend_test(voter)]
    async fn accepted_vote_updates_tally_flag_and_audit(client: Client, db: Database) {
        open_election(&db).await;
        let (first, second) = insert_candidates(&db).await;

        let response = cast_for(&client, first).await;
        assert_eq!(Status::Ok, response);

        // Tally: exactly one increment, on the chosen candidate only.
        assert_eq!(vote_count(&db, first).await, 1);
        assert_eq!(vote_count(&db, second).await, 0);

        // Flag: the voter is now ineligible.
        let voter = Coll::<Voter>::from_db(&db)
            .find_one(None, None)
            .await
            .unwrap()
            .unwrap();
        assert!(voter.has_voted);

        // Audit: one record, consistent with the tally.
        let audit: Vec<Vote> = Coll::<Vote>::from_db(&db)
            .find(None, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].voter, voter.id);
        assert_eq!(audit[0].candidate, first);
    }

    #[backend_test(voter)]
    async fn second_vote_rejected_and_tally_unchanged(client: Client, db: Database) {
        open_election(&db).await;
        let (first, second) = insert_candidates(&db).await;

        assert_eq!(cast_for(&client, first).await, Status::Ok);

        // Voting again, even for a different candidate, changes nothing.
        assert_eq!(cast_for(&client, second).await, Status::Conflict);
        assert_eq!(vote_count(&db, first).await, 1);
        assert_eq!(vote_count(&db, second).await, 0);

        let audit_rows = Coll::<Vote>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(audit_rows, 1);
    }

    #[backend_test(voter)]
    async fn closed_election_rejects_votes(client: Client, db: Database) {
        // The scratch deployment starts closed.
        let (first, _) = insert_candidates(&db).await;

        assert_eq!(cast_for(&client, first).await, Status::Forbidden);

        assert_eq!(vote_count(&db, first).await, 0);
        let voter = Coll::<Voter>::from_db(&db)
            .find_one(None, None)
            .await
            .unwrap()
            .unwrap();
        assert!(!voter.has_voted);
    }

    #[backend_test(voter)]
    async fn invalid_candidate_rolls_back_the_flag(client: Client, db: Database) {
        open_election(&db).await;
        insert_candidates(&db).await;

        assert_eq!(cast_for(&client, Id::new()).await, Status::NotFound);

        // The eligibility write happened inside the aborted transaction, so
        // the voter can still vote.
        let voter = Coll::<Voter>::from_db(&db)
            .find_one(None, None)
            .await
            .unwrap()
            .unwrap();
        assert!(!voter.has_voted);
        let audit_rows = Coll::<Vote>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(audit_rows, 0);

        // A retry with a real candidate succeeds.
        let (first, _) = candidate_ids(&db).await;
        assert_eq!(cast_for(&client, first).await, Status::Ok);
    }

    #[backend_test(voter)]
    async fn concurrent_votes_accept_exactly_one(client: Client, db: Database) {
        open_election(&db).await;
        let (first, _) = insert_candidates(&db).await;

        let body = json!(VoteRequest { candidate: first }).to_string();
        let request_a = client
            .post(uri!(cast))
            .header(ContentType::JSON)
            .body(body.clone());
        let request_b = client
            .post(uri!(cast))
            .header(ContentType::JSON)
            .body(body);

        let (response_a, response_b) =
            rocket::futures::join!(request_a.dispatch(), request_b.dispatch());
        let statuses = [response_a.status(), response_b.status()];
        assert!(statuses.contains(&Status::Ok));
        assert!(statuses.contains(&Status::Conflict));

        assert_eq!(vote_count(&db, first).await, 1);
        let audit_rows = Coll::<Vote>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(audit_rows, 1);
    }

    async fn open_election(db: &Database) {
        Coll::<ElectionState>::from_db(db)
            .update_one(
                ElectionState::filter(),
                doc! { "$set": { "is_open": true } },
                None,
            )
            .await
            .unwrap();
    }

    async fn insert_candidates(db: &Database) -> (Id, Id) {
        Coll::<NewCandidate>::from_db(db)
            .insert_one(NewCandidate::example(), None)
            .await
            .unwrap();
        Coll::<NewCandidate>::from_db(db)
            .insert_one(NewCandidate::example2(), None)
            .await
            .unwrap();
        candidate_ids(db).await
    }

    async fn candidate_ids(db: &Database) -> (Id, Id) {
        let find = |core: CandidateCore| async move {
            Coll::<Candidate>::from_db(db)
                .find_one(doc! { "name": core.name }, None)
                .await
                .unwrap()
                .unwrap()
                .id
        };
        (
            find(NewCandidate::example()).await,
            find(NewCandidate::example2()).await,
        )
    }

    async fn vote_count(db: &Database, candidate: Id) -> i64 {
        Coll::<Candidate>::from_db(db)
            .find_one(candidate.as_doc(), None)
            .await
            .unwrap()
            .unwrap()
            .vote_count
    }

    async fn cast_for(client: &Client, candidate: Id) -> Status {
        client
            .post(uri!(cast))
            .header(ContentType::JSON)
            .body(json!(VoteRequest { candidate }).to_string())
            .dispatch()
            .await
            .status()
    }
}
