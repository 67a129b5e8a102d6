use rocket::{http::Status, response::status, serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        api::session::{ResetRequest, SessionUpdate, StartRequest},
        auth::AuthToken,
        common::session::{QuestionSpec, VotingQuestion, VotingSession},
        mongodb::Id,
    },
    Assembly,
};

pub fn routes() -> Vec<Route> {
    routes![
        current_session,
        start_voting,
        stop_voting,
        update_session,
        reset_session,
        create_question,
        list_questions,
        delete_question,
        start_question,
    ]
}

/// Public: the voting screen polls this to know what to show.
#[get("/sessions/current")]
pub async fn current_session(assembly: &State<Assembly>) -> Result<Json<VotingSession>> {
    Ok(Json(assembly.current_session().await?))
}

#[post("/sessions/current/start", data = "<request>", format = "json")]
pub async fn start_voting(
    _token: AuthToken,
    request: Json<StartRequest>,
    assembly: &State<Assembly>,
) -> Result<Json<VotingSession>> {
    Ok(Json(assembly.start_voting(request.0.question).await?))
}

#[post("/sessions/current/stop")]
pub async fn stop_voting(
    _token: AuthToken,
    assembly: &State<Assembly>,
) -> Result<Json<VotingSession>> {
    Ok(Json(assembly.stop_voting().await?))
}

#[patch("/sessions/current", data = "<update>", format = "json")]
pub async fn update_session(
    _token: AuthToken,
    update: Json<SessionUpdate>,
    assembly: &State<Assembly>,
) -> Result<Json<VotingSession>> {
    Ok(Json(assembly.set_results_visible(update.results_visible).await?))
}

/// Without a body, or without `"confirm": true`, nothing is deleted.
#[post("/sessions/current/reset", data = "<request>")]
pub async fn reset_session(
    _token: AuthToken,
    request: Option<Json<ResetRequest>>,
    assembly: &State<Assembly>,
) -> Result<Json<VotingSession>> {
    let confirm = request.map(|r| r.confirm).unwrap_or_default();
    Ok(Json(assembly.reset_session(confirm).await?))
}

#[post("/questions", data = "<spec>", format = "json")]
pub async fn create_question(
    _token: AuthToken,
    spec: Json<QuestionSpec>,
    assembly: &State<Assembly>,
) -> Result<status::Custom<Json<VotingQuestion>>> {
    let question = assembly.create_question(spec.0).await?;
    Ok(status::Custom(Status::Created, Json(question)))
}

#[get("/questions")]
pub async fn list_questions(
    _token: AuthToken,
    assembly: &State<Assembly>,
) -> Result<Json<Vec<VotingQuestion>>> {
    Ok(Json(assembly.list_questions().await?))
}

#[delete("/questions/<question_id>")]
pub async fn delete_question(
    _token: AuthToken,
    question_id: Id,
    assembly: &State<Assembly>,
) -> Result<()> {
    assembly.delete_question(question_id).await
}

#[post("/questions/<question_id>/start")]
pub async fn start_question(
    _token: AuthToken,
    question_id: Id,
    assembly: &State<Assembly>,
) -> Result<Json<VotingSession>> {
    Ok(Json(assembly.start_question(question_id).await?))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::{serde_json, serde_json::json},
    };

    use crate::model::common::session::SessionPhase;

    use super::*;

    async fn start(client: &Client) -> rocket::local::asynchronous::LocalResponse<'_> {
        client
            .post(uri!(start_voting))
            .header(ContentType::JSON)
            .body(json!({ "question": QuestionSpec::example() }).to_string())
            .dispatch()
            .await
    }

    #[backend_test(admin)]
    async fn lifecycle(client: Client) {
        let response = client.get(uri!(current_session)).dispatch().await;
        let session: VotingSession = response.into_json().await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);

        let response = start(&client).await;
        assert_eq!(Status::Ok, response.status());
        let session: VotingSession = response.into_json().await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Open);
        assert_eq!(session.question.unwrap().title, QuestionSpec::example().title);

        let response = start(&client).await;
        assert_eq!(Status::Conflict, response.status());
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], "AlreadyActive");

        let response = client
            .patch(uri!(update_session))
            .header(ContentType::JSON)
            .body(json!({ "resultsVisible": true }).to_string())
            .dispatch()
            .await;
        let session: VotingSession = response.into_json().await.unwrap();
        assert!(session.results_visible);

        let response = client.post(uri!(stop_voting)).dispatch().await;
        let session: VotingSession = response.into_json().await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Closed);

        // Stopping twice is harmless.
        let response = client.post(uri!(stop_voting)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test(admin)]
    async fn reset_needs_confirmation(client: Client) {
        start(&client).await;

        let response = client.post(uri!(reset_session)).dispatch().await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .post(uri!(reset_session))
            .header(ContentType::JSON)
            .body(json!({ "confirm": false }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .post(uri!(reset_session))
            .header(ContentType::JSON)
            .body(json!({ "confirm": true }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let session: VotingSession = response.into_json().await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[backend_test(admin)]
    async fn question_bank(client: Client) {
        let response = client
            .post(uri!(create_question))
            .header(ContentType::JSON)
            .body(json!(QuestionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let question: VotingQuestion = response.into_json().await.unwrap();

        let response = client.get(uri!(list_questions)).dispatch().await;
        let questions: Vec<VotingQuestion> = response.into_json().await.unwrap();
        assert_eq!(questions, vec![question.clone()]);

        let response = client
            .post(uri!(start_question(question.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let session: VotingSession = response.into_json().await.unwrap();
        assert_eq!(session.question.as_ref().map(|q| q.id), Some(question.id));

        let response = client
            .delete(uri!(delete_question(question.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let response = client
            .delete(uri!(delete_question(question.id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn invalid_questions(client: Client) {
        let response = client
            .post(uri!(create_question))
            .header(ContentType::JSON)
            .body(json!({ "title": "Solo una", "options": ["Sí"] }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .post(uri!(start_question(Id::new())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn only_the_current_session_is_public(client: Client) {
        let response = client.get(uri!(current_session)).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let response = start(&client).await;
        assert_eq!(Status::Unauthorized, response.status());
        let response = client.post(uri!(stop_voting)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
