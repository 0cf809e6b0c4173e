use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::{
            candidate::{CandidateSpec, CandidateSummary, ResultsEntry},
            election::{Dashboard, ElectionStatus},
        },
        auth::AuthToken,
        db::{
            admin::Admin,
            candidate::{Candidate, NewCandidate},
            election::ElectionState,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![toggle_election, add_candidate, dashboard]
}

/// Flip the election between open and closed, reporting the new state.
#[post("/admin/election/toggle")]
pub async fn toggle_election(
    _token: AuthToken<Admin>,
    states: Coll<ElectionState>,
) -> Result<Json<ElectionStatus>> {
    let is_open = ElectionState::toggle(&states).await?;
    Ok(Json(ElectionStatus { is_open }))
}

#[post("/admin/candidates", data = "<spec>", format = "json")]
pub async fn add_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    new_candidates: Coll<NewCandidate>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateSummary>> {
    let candidate: NewCandidate = spec.0.into();
    let new_id: Id = new_candidates
        .insert_one(&candidate, None)
        .await?
        .inserted_id
        .as_object_id()
        .unwrap() // Valid because the ID comes directly from the database.
        .into();

    let candidate = candidates.find_one(new_id.as_doc(), None).await?.unwrap();
    Ok(Json(candidate.into()))
}

/// The admin view: current state plus live tallies. Unlike the public
/// results, this is gated only by the admin token, not by the unlock time.
#[get("/admin/dashboard")]
pub async fn dashboard(
    _token: AuthToken<Admin>,
    states: Coll<ElectionState>,
    candidates: Coll<Candidate>,
) -> Result<Json<Dashboard>> {
    let state = ElectionState::get(&states).await?;
    let field: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;
    Ok(Json(Dashboard {
        is_open: state.is_open,
        results: ResultsEntry::ranked(field),
    }))
}
