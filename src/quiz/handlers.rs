//! Quiz submission handler.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::Claims;
use crate::error::ApiError;
use crate::quiz::models::{Chapter, ScoreRecord};
use crate::quiz::scores::SubmissionError;
use crate::validation::{Validate, ValidatedJson, ValidationError};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitQuizRequest {
    pub score: Option<i64>,
    /// Legacy clients also post `userId`; the authenticated identity is
    /// authoritative, so the field is accepted and ignored.
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl Validate for SubmitQuizRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        match self.score {
            None => Err(ValidationError::for_field("score", "Field is required")),
            Some(score) if score < 0 => Err(ValidationError::for_field(
                "score",
                "Score must be non-negative",
            )),
            Some(_) => Ok(()),
        }
    }
}

#[derive(Serialize)]
pub struct SubmitQuizResponse {
    pub message: String,
    pub score: ScoreRecord,
}

/// POST /api/submit-quiz/{chapter}: record a scored attempt.
///
/// The chapter comes from the path and must belong to the closed chapter
/// set. The score delta is added to the chapter counter, never replacing
/// it, subject to the per-user sliding-window cap.
pub async fn submit_quiz(
    State(state): State<AppState>,
    Path(chapter): Path<String>,
    claims: Claims,
    ValidatedJson(input): ValidatedJson<SubmitQuizRequest>,
) -> Result<Json<SubmitQuizResponse>, ApiError> {
    let chapter: Chapter = chapter.parse()?;
    let points = input.score.unwrap_or_default();

    let now_ms = Utc::now().timestamp_millis();
    let record = state
        .scores
        .submit(claims.user_id(), chapter, points, now_ms)
        .await
        .map_err(|e| match e {
            SubmissionError::RateLimited => {
                warn!(
                    event = "quiz.rate_limited",
                    user_id = %claims.sub,
                    chapter = %chapter,
                    "Submission cap reached"
                );
                ApiError::rate_limited("You have reached the limit of quiz attempts in one hour")
            }
            SubmissionError::Storage(e) => e.into(),
        })?;

    info!(
        event = "quiz.submitted",
        user_id = %claims.sub,
        chapter = %chapter,
        points,
        "Quiz submitted"
    );

    Ok(Json(SubmitQuizResponse {
        message: "Quiz submitted successfully".to_string(),
        score: record,
    }))
}
