//! HTTP surface over [`AdmissionController`].
//!
//! | Route | Method | Purpose |
//! |---|---|---|
//! | `/api/questions` | GET | deal a random question set |
//! | `/api/validate` | POST | grade answers without submitting |
//! | `/api/submit` | POST | claim a winner slot |
//! | `/api/leaderboard` | GET | ranked winners plus phase |
//! | `/api/quiz-state` | GET | phase and winner count |
//! | `/api/quiz-state` | POST | admin lifecycle action (`Authorization: <secret>`) |
//!
//! Bodies are JSON with camelCase keys; errors come back as
//! `{"message": "..."}`, including bodies that fail to parse.

use axum::{
    Json, Router, async_trait,
    extract::{FromRequest, Request, State, rejection::JsonRejection},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, warn};

use crate::admission::{AdmissionController, Submission};
use crate::error::QuizError;
use crate::leaderboard::RankedEntry;
use crate::lifecycle::LifecycleAction;
use crate::questions::ClientQuestion;
use crate::session::Phase;

/// Builds the application router around a shared controller.
pub fn router(controller: AdmissionController) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api/questions", get(questions))
        .route("/api/validate", post(validate))
        .route("/api/submit", post(submit))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/quiz-state", get(quiz_state).post(change_quiz_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(controller)
}

/// JSON request body whose rejection is [`QuizError::InvalidInput`], so
/// malformed bodies get the same `{"message"}` shape as every other error.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = QuizError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(
                    status = %rejection.status(),
                    reason = %rejection.body_text(),
                    "rejected request body"
                );
                let reason = match rejection {
                    JsonRejection::MissingJsonContentType(_) => "expected a JSON request body",
                    _ => "invalid request body",
                };
                Err(QuizError::InvalidInput(reason.to_string()))
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub questions: Vec<ClientQuestion>,
    pub count: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateRequest {
    pub question_ids: Vec<usize>,
    pub answers: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub correct_count: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitRequest {
    pub user_id: Option<String>,
    pub question_ids: Vec<usize>,
    pub answers: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub rank: usize,
    pub winner_count: usize,
    pub quiz_ended: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<RankedEntry>,
    pub winner_count: usize,
    pub quiz_state: Phase,
    pub capacity: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStateResponse {
    pub state: Phase,
    pub winner_count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActionRequest {
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub state: Phase,
    pub message: String,
}

async fn questions(State(controller): State<AdmissionController>) -> Json<QuestionsResponse> {
    let questions = controller.question_set();
    Json(QuestionsResponse {
        count: questions.len(),
        questions,
    })
}

async fn validate(
    State(controller): State<AdmissionController>,
    JsonBody(request): JsonBody<ValidateRequest>,
) -> Result<Json<ValidateResponse>, QuizError> {
    let correct_count = controller
        .validate(&request.question_ids, &request.answers)
        .await?;
    Ok(Json(ValidateResponse { correct_count }))
}

async fn submit(
    State(controller): State<AdmissionController>,
    JsonBody(request): JsonBody<SubmitRequest>,
) -> Result<Json<SubmitResponse>, QuizError> {
    let submission = Submission {
        user_id: request.user_id.unwrap_or_default(),
        question_ids: request.question_ids,
        answers: request.answers,
    };
    let admission = controller.submit(&submission).await?;
    Ok(Json(SubmitResponse {
        message: "Submission successful".to_string(),
        rank: admission.rank,
        winner_count: admission.winner_count,
        quiz_ended: admission.session_ended,
    }))
}

async fn leaderboard(
    State(controller): State<AdmissionController>,
) -> Result<Json<LeaderboardResponse>, QuizError> {
    let view = controller.read().await?;
    Ok(Json(LeaderboardResponse {
        leaderboard: view.winners,
        winner_count: view.winner_count,
        quiz_state: view.phase,
        capacity: view.capacity,
    }))
}

async fn quiz_state(
    State(controller): State<AdmissionController>,
) -> Result<Json<QuizStateResponse>, QuizError> {
    let view = controller.read().await?;
    Ok(Json(QuizStateResponse {
        state: view.phase,
        winner_count: view.winner_count,
    }))
}

async fn change_quiz_state(
    State(controller): State<AdmissionController>,
    headers: HeaderMap,
    body: Result<JsonBody<ActionRequest>, QuizError>,
) -> Result<Json<ActionResponse>, QuizError> {
    let secret = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    // Credentials are checked before the body is even parsed.
    if !controller.is_admin(secret) {
        return Err(QuizError::Unauthorized);
    }

    let JsonBody(request) = body?;
    let action: LifecycleAction = request.action.parse()?;
    let state = controller.apply(secret, action).await?;
    let message = match action {
        LifecycleAction::Start => "Quiz started",
        LifecycleAction::End => "Quiz ended",
        LifecycleAction::Reset => "Quiz reset successfully",
    };
    Ok(Json(ActionResponse {
        state,
        message: message.to_string(),
    }))
}

impl IntoResponse for QuizError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            QuizError::InvalidInput(reason) => (StatusCode::BAD_REQUEST, capitalize(reason)),
            QuizError::IncorrectSubmission { required } => (
                StatusCode::BAD_REQUEST,
                format!("Must answer all {required} questions correctly"),
            ),
            QuizError::SessionNotAcceptingSubmissions => {
                (StatusCode::BAD_REQUEST, "Quiz has ended".to_string())
            }
            QuizError::InvalidTransition { action, .. } => {
                let expected = match action {
                    LifecycleAction::Start => "Quiz is not inactive",
                    LifecycleAction::End | LifecycleAction::Reset => "Quiz is not live",
                };
                (StatusCode::BAD_REQUEST, expected.to_string())
            }
            QuizError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            QuizError::Contention { .. } => (
                StatusCode::CONFLICT,
                "Too many simultaneous submissions, please retry".to_string(),
            ),
            QuizError::StoreUnavailable(err) => {
                warn!(error = %err, "request failed on state store");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "State store unavailable".to_string(),
                )
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
