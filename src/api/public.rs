use chrono::Utc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::candidate::ResultsEntry, db::candidate::Candidate, mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![results]
}

/// The public results, ordered by tally.
///
/// Locked until the configured unlock instant. This gate is independent of
/// the admin's open/closed toggle: closing the election early does not
/// publish the results early.
#[get("/results")]
pub async fn results(
    config: &State<Config>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<ResultsEntry>>> {
    if !config.results_unlocked(Utc::now()) {
        return Err(Error::ResultsLocked);
    }

    let field: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;
    Ok(Json(ResultsEntry::ranked(field)))
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::Status,
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::model::db::candidate::{CandidateCore, NewCandidate};

    use super::*;

    #[backend_test]
    async fn results_are_ordered_once_unlocked(client: Client, db: Database) {
        // The test config's unlock instant is in the past.
        insert_tallies(&db).await;

        let response = client.get(uri!(results)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let rows: Vec<ResultsEntry> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let names: Vec<_> = rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, ["Jules Harrow", "Rowan Vale", "Sasha Quill"]);
        assert_eq!(rows[0].vote_count, 5);
    }

    #[backend_test]
    async fn results_need_no_credentials(client: Client) {
        let response = client.get(uri!(results)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
    }

    /// Results stay locked before the unlock instant, even though the
    /// election state is untouched.
    #[test]
    fn results_locked_before_unlock_instant() {
        let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let db_client = crate::db_client().await;
            let db_name = crate::database();
            let figment =
                rocket::Config::figment().merge(("results_unlock", "2999-01-01T00:00:00Z"));
            let client = Client::tracked(
                crate::rocket_with_figment(db_client.clone(), &db_name, figment).await,
            )
            .await
            .unwrap();

            let response = client.get(uri!(results)).dispatch().await;
            assert_eq!(Status::Forbidden, response.status());

            db_client.database(&db_name).drop(None).await.unwrap();
        });
    }

    async fn insert_tallies(db: &Database) {
        let field = [
            ("Rowan Vale", "Unity", 2),
            ("Jules Harrow", "Progress", 5),
            ("Sasha Quill", "Reform", 2),
        ]
        .map(|(name, party, vote_count)| CandidateCore {
            name: name.to_string(),
            party: party.to_string(),
            vote_count,
        });
        Coll::<NewCandidate>::from_db(db)
            .insert_many(field, None)
            .await
            .unwrap();
    }
}
