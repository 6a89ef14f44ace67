use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use validator::Validate;

use crate::access::Role;
use crate::database::Database;
use crate::services::Services;

pub const SYSTEM_NAME: &str = "Vanguard Advisor-Assist";

#[derive(Clone)]
pub struct AppState {
    services: Services,
    audit: Option<Arc<Database>>,
    timeout: Duration,
}

impl AppState {
    pub fn new(services: Services, audit: Option<Database>) -> Self {
        let timeout = services.config.request_timeout;
        Self {
            services,
            audit: audit.map(Arc::new),
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 4000))]
    pub question: String,
    /// Role: 'advisor' or 'intern'
    #[validate(length(min = 1, max = 100))]
    pub user_role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub user_role_used: String,
    pub status: String,
}

#[derive(Serialize)]
struct ApiResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    system: &'static str,
}

/// Error surface of the API. Carries no internal detail, so nothing from a
/// provider or store can leak into a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    InvalidRequest,
    Internal,
    Timeout,
}

impl ApiError {
    fn status(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest => "invalid_request",
            ApiError::Internal => "error",
            ApiError::Timeout => "timeout",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match self {
            ApiError::InvalidRequest => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        };
        (code, Json(ApiResponse { status: self.status() })).into_response()
    }
}

/// Create and configure the API router
pub fn create_api(state: AppState) -> Router {
    let max_in_flight = state.services.config.max_concurrent_requests.max(1);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/", get(health_check))
        .route("/ask", post(ask_handler))
        .layer(ConcurrencyLimitLayer::new(max_in_flight))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_api(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("API server listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running",
        system: SYSTEM_NAME,
    })
}

async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        log::warn!("Rejected malformed /ask body: {}", e);
        ApiError::InvalidRequest
    })?;
    if let Err(e) = request.validate() {
        log::warn!("Rejected invalid /ask request: {}", e);
        return Err(ApiError::InvalidRequest);
    }

    log::info!(
        "AUDIT LOG: User Role '{}' asked: '{}'",
        request.user_role,
        request.question
    );

    let role = Role::parse(&request.user_role);
    let agent = state.services.agent_for(role);
    let outcome = match tokio::time::timeout(state.timeout, agent.run(&request.question)).await {
        Ok(Ok(run)) => Ok(run.answer),
        Ok(Err(e)) => {
            log::error!("Agent failed: {}", e);
            Err(ApiError::Internal)
        }
        Err(_) => {
            log::error!("Request timed out after {:?}", state.timeout);
            Err(ApiError::Timeout)
        }
    };

    let status = match &outcome {
        Ok(_) => "success",
        Err(e) => e.status(),
    };
    if let Some(audit) = &state.audit {
        if let Err(e) = audit.record_query(&request.user_role, &request.question, status).await {
            log::error!("Failed to write audit entry: {}", e);
        }
    }

    let answer = outcome?;
    Ok(Json(AskResponse {
        answer,
        user_role_used: request.user_role,
        status: "success".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Message, ToolSpec};
    use crate::config::AppConfig;
    use crate::database::LocalVectorStore;
    use crate::providers::{AssistantTurn, CompletionProvider};
    use crate::testing::{FailingProvider, FakeEmbedder, ScriptedProvider};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use std::collections::HashMap;
    use tower::ServiceExt;

    struct SlowProvider;

    #[async_trait]
    impl CompletionProvider for SlowProvider {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(String::new())
        }

        async fn chat(&self, _messages: &[Message], _tools: &[ToolSpec]) -> anyhow::Result<AssistantTurn> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(AssistantTurn::answer("too late"))
        }

        fn get_model_info(&self) -> String {
            "slow".to_string()
        }
    }

    fn state_with(generator: Arc<dyn CompletionProvider>, audit: Option<Database>) -> AppState {
        let empty: HashMap<String, String> = HashMap::new();
        let config = AppConfig::from_lookup(|key| empty.get(key).cloned()).unwrap();
        let services = Services::from_parts(
            config,
            generator,
            Arc::new(FakeEmbedder::new(8)),
            Arc::new(LocalVectorStore::in_memory()),
        );
        AppState::new(services, audit)
    }

    fn ask(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ask")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check_reports_running() {
        let app = create_api(state_with(Arc::new(ScriptedProvider::new(vec![])), None));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["system"], SYSTEM_NAME);
    }

    #[tokio::test]
    async fn ask_returns_answer_and_audits() {
        let audit = Database::in_memory().await.unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![AssistantTurn::answer("VYM fees are low.")]));
        let app = create_api(state_with(provider, Some(audit.clone())));

        let response = app
            .oneshot(ask(r#"{"question": "What are the fund costs for VYM?", "user_role": "intern"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["answer"], "VYM fees are low.");
        assert_eq!(body["user_role_used"], "intern");
        assert_eq!(body["status"], "success");

        let entries = audit.recent_queries(5).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_role, "intern");
        assert_eq!(entries[0].status, "success");
    }

    #[tokio::test]
    async fn invalid_requests_get_422() {
        let app = create_api(state_with(Arc::new(ScriptedProvider::new(vec![])), None));
        let response = app
            .clone()
            .oneshot(ask(r#"{"question": "", "user_role": "advisor"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["status"], "invalid_request");

        let response = app.oneshot(ask(r#"{"question": "fees?"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn internal_errors_hide_detail() {
        let audit = Database::in_memory().await.unwrap();
        let app = create_api(state_with(Arc::new(FailingProvider), Some(audit.clone())));
        let response = app
            .oneshot(ask(r#"{"question": "fees?", "user_role": "advisor"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(text, r#"{"status":"error"}"#);
        assert!(!text.contains("secret-token-123"));
        assert_eq!(audit.recent_queries(1).await.unwrap()[0].status, "error");
    }

    #[tokio::test]
    async fn slow_requests_time_out() {
        let state = state_with(Arc::new(SlowProvider), None).with_timeout(Duration::from_millis(20));
        let response = create_api(state)
            .oneshot(ask(r#"{"question": "fees?", "user_role": "advisor"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json_body(response).await["status"], "timeout");
    }
}
