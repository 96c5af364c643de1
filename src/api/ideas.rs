//! 创意生成端点（无状态）

use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{GenerateIdeasRequest, GenerateIdeasResponse, IdeaRequest};
use crate::state::AppState;

/// 直接生成创意
async fn generate_ideas(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateIdeasRequest>,
) -> AppResult<Json<GenerateIdeasResponse>> {
    let request = IdeaRequest::new(&req.topic, req.difficulty)
        .ok_or_else(|| AppError::BadRequest("topic must not be empty".to_string()))?
        .with_exclusions(&req.exclude_titles);

    let ideas = state.generator.generate(&request).await?;

    Ok(Json(GenerateIdeasResponse {
        success: true,
        ideas,
    }))
}

/// 创建创意路由
pub fn idea_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/ideas", post(generate_ideas))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::test_support::{gemini_ideas, gemini_text, send, state_for};

    #[tokio::test]
    async fn test_generate_ideas_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(gemini_ideas(&["A", "B", "C"], "Advanced")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server);
        let (status, body) = send(
            &state,
            "POST",
            "/api/ideas",
            Some(json!({ "topic": "compilers", "difficulty": "Advanced", "excludeTitles": ["Old"] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["ideas"].as_array().unwrap().len(), 3);
        assert_eq!(body["ideas"][1]["title"], "B");
        assert_eq!(body["ideas"][0]["difficulty"], "Advanced");
    }

    #[tokio::test]
    async fn test_blank_topic_issues_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let state = state_for(&server);
        let (status, body) = send(
            &state,
            "POST",
            "/api/ideas",
            Some(json!({ "topic": "   ", "difficulty": "Beginner" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");
    }

    #[tokio::test]
    async fn test_malformed_payload_returns_generic_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_text("{not json")))
            .mount(&server)
            .await;

        let state = state_for(&server);
        let (status, body) = send(
            &state,
            "POST",
            "/api/ideas",
            Some(json!({ "topic": "robots", "difficulty": "Beginner" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "generation_failure");
        assert_eq!(body["error"], "Could not generate ideas. Please try again.");
        assert!(body.get("ideas").is_none());
    }

    #[tokio::test]
    async fn test_unknown_difficulty_rejected() {
        let server = MockServer::start().await;
        let state = state_for(&server);
        let (status, _) = send(
            &state,
            "POST",
            "/api/ideas",
            Some(json!({ "topic": "robots", "difficulty": "Expert" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
