pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::generation::handlers as resumes;
use crate::session::handlers as sessions;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Stateless generation and revision
        .route("/api/v1/resumes/generate", post(resumes::handle_generate))
        .route("/api/v1/resumes/revise", post(resumes::handle_revise))
        // Revision sessions
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(sessions::handle_get_session).delete(sessions::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/job-description",
            put(sessions::handle_set_job_description),
        )
        .route(
            "/api/v1/sessions/:id/resume",
            put(sessions::handle_replace_resume),
        )
        .route(
            "/api/v1/sessions/:id/generate",
            post(sessions::handle_session_generate),
        )
        .route("/api/v1/sessions/:id/score", post(sessions::handle_score))
        .route("/api/v1/sessions/:id/rewrite", post(sessions::handle_rewrite))
        .route("/api/v1/sessions/:id/optimize", post(sessions::handle_optimize))
        .route(
            "/api/v1/sessions/:id/custom",
            post(sessions::handle_custom_instruction),
        )
        .route("/api/v1/sessions/:id/revert", post(sessions::handle_revert))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::llm_client::testing::ScriptedGateway;
    use crate::llm_client::{LlmClient, ModelGateway};
    use crate::session::registry::SessionRegistry;

    fn app(gateway: Arc<dyn ModelGateway>) -> Router {
        let config = Config::from_lookup(|_| None).unwrap();
        build_router(AppState {
            config,
            gateway,
            sessions: Arc::new(SessionRegistry::new()),
        })
    }

    fn unconfigured_app() -> Router {
        let config = Config::from_lookup(|_| None).unwrap();
        app(Arc::new(LlmClient::new(&config.llm).unwrap()))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn resume_json() -> Value {
        json!({
            "profile": { "name": "Ada Lovelace", "email": "", "phone": "", "url": "", "summary": "", "location": "" },
            "workExperiences": [
                { "company": "Acme", "jobTitle": "Engineer", "date": "2020 - 2023",
                  "descriptions": ["Built billing service in Go"] }
            ],
            "educations": [],
            "projects": [],
            "skills": { "featuredSkills": [], "descriptions": [] },
            "custom": { "descriptions": [] }
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&unconfigured_app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["llmConfigured"], false);
        assert_eq!(body["activeSessions"], 0);
    }

    #[tokio::test]
    async fn test_generate_without_api_key_is_configuration_error() {
        let (status, body) = send(
            &unconfigured_app(),
            Method::POST,
            "/api/v1/resumes/generate",
            Some(json!({ "jobDescription": "Senior Go engineer" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "CONFIGURATION_ERROR");
        assert!(body["error"].as_str().unwrap().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_generate_requires_job_description() {
        let (status, body) = send(
            &unconfigured_app(),
            Method::POST,
            "/api/v1/resumes/generate",
            Some(json!({ "jobDescription": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_revise_rejects_unknown_stage() {
        let (status, body) = send(
            &unconfigured_app(),
            Method::POST,
            "/api/v1/resumes/revise",
            Some(json!({ "stage": 4, "resume": resume_json() })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid stage. Must be 1, 2, or 3.");
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let app = unconfigured_app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/resumes/revise")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_revise_stage_one_returns_analysis() {
        let gateway = ScriptedGateway::new().reply_json(json!({
            "score": 140.0,
            "missingKeywords": ["a", "b", "c", "d", "e", "f"]
        }));
        let (status, body) = send(
            &app(Arc::new(gateway)),
            Method::POST,
            "/api/v1/resumes/revise",
            Some(json!({ "stage": 1, "jobDescription": "Go role", "resume": resume_json() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 100);
        assert_eq!(body["missingKeywords"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_session_flow_score_rewrite_revert() {
        let gateway = ScriptedGateway::new()
            .reply_json(json!({ "score": 55, "missingKeywords": ["Kubernetes"] }))
            .reply_json(json!({
                "workExperiences": [
                    { "company": "Acme", "jobTitle": "Engineer", "date": "2020 - 2023",
                      "descriptions": ["Delivered the **Go** billing service"] }
                ]
            }));
        let app = app(Arc::new(gateway));

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "resume": resume_json(), "jobDescription": "Go role" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["session"]["stage"], "idle");
        let id = created["sessionId"].as_str().unwrap().to_string();

        let (status, _) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/optimize"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, scored) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/score"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(scored["session"]["stage"], "scored");
        assert_eq!(scored["matchAnalysis"]["score"], 55);

        let (status, rewritten) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/rewrite"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rewritten["session"]["stage"], "rewritten");
        assert_eq!(
            rewritten["resume"]["workExperiences"][0]["descriptions"][0],
            "Delivered the **Go** billing service"
        );

        let (status, reverted) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/revert"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reverted["reverted"], true);
        assert_eq!(reverted["session"]["stage"], "idle");
        assert_eq!(
            reverted["resume"]["workExperiences"],
            created["resume"]["workExperiences"]
        );
    }

    #[tokio::test]
    async fn test_session_documents_carry_six_featured_skills() {
        let gateway = ScriptedGateway::new()
            .reply_json(json!({ "score": 55, "missingKeywords": ["Kubernetes"] }))
            .reply_json(json!({
                "workExperiences": [
                    { "company": "Acme", "jobTitle": "Engineer", "date": "2020 - 2023",
                      "descriptions": ["Delivered the **Go** billing service"] }
                ]
            }));
        let app = app(Arc::new(gateway));
        let featured = |body: &Value| {
            body["resume"]["skills"]["featuredSkills"]
                .as_array()
                .map(Vec::len)
                .unwrap_or_default()
        };

        let mut resume = resume_json();
        resume["skills"]["featuredSkills"] = json!([
            { "skill": "Go", "rating": 5 },
            { "skill": "SQL", "rating": 4 },
            { "skill": "Docker", "rating": 3 }
        ]);
        let (status, created) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "resume": resume, "jobDescription": "Go role" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(featured(&created), 6);
        assert_eq!(created["resume"]["skills"]["featuredSkills"][0]["skill"], "Go");
        let id = created["sessionId"].as_str().unwrap().to_string();

        let (_, fetched) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(featured(&fetched), 6);

        send(&app, Method::POST, &format!("/api/v1/sessions/{id}/score"), None).await;
        let (status, rewritten) =
            send(&app, Method::POST, &format!("/api/v1/sessions/{id}/rewrite"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(featured(&rewritten), 6);

        let (status, replaced) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/sessions/{id}/resume"),
            Some(json!({ "resume": resume_json() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(featured(&replaced), 6);

        let (_, reverted) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/revert"), None).await;
        assert_eq!(featured(&reverted), 6);
    }

    #[tokio::test]
    async fn test_revise_accepts_whole_number_float_stage() {
        let (status, body) = send(
            &unconfigured_app(),
            Method::POST,
            "/api/v1/resumes/revise",
            Some(json!({ "stage": 3.0, "resume": resume_json() })),
        )
        .await;
        // Passes request validation and reaches the gateway.
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_session_job_description_change_resets() {
        let gateway = ScriptedGateway::new()
            .reply_json(json!({ "score": 70, "missingKeywords": [] }));
        let app = app(Arc::new(gateway));
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "jobDescription": "Go role" })),
        )
        .await;
        let id = created["sessionId"].as_str().unwrap().to_string();

        send(&app, Method::POST, &format!("/api/v1/sessions/{id}/score"), None).await;
        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/sessions/{id}/job-description"),
            Some(json!({ "jobDescription": "Rust role" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["stage"], "idle");
        assert_eq!(body["session"]["matchScore"], Value::Null);
        assert_eq!(body["session"]["hasSnapshot"], false);
    }

    #[tokio::test]
    async fn test_unknown_and_deleted_sessions() {
        let app = unconfigured_app();
        let missing = uuid::Uuid::new_v4();
        let (status, body) = send(&app, Method::GET, &format!("/api/v1/sessions/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, _) = send(&app, Method::GET, "/api/v1/sessions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, created) = send(&app, Method::POST, "/api/v1/sessions", Some(json!({}))).await;
        let id = created["sessionId"].as_str().unwrap().to_string();
        let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_stage_failure_is_reported_in_session() {
        let app = unconfigured_app();
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "resume": resume_json(), "jobDescription": "Go role" })),
        )
        .await;
        let id = created["sessionId"].as_str().unwrap().to_string();

        let (status, body) = send(&app, Method::POST, &format!("/api/v1/sessions/{id}/score"), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "CONFIGURATION_ERROR");

        let (_, view) = send(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(view["session"]["stage"], "idle");
        assert!(view["session"]["error"].as_str().unwrap().contains("OPENAI_API_KEY"));
    }
}
