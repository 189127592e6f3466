//! REST API Server for the finance planner
//!
//! Exposes the orchestrator to the browser UI. Every call answers with the
//! reconciled plan, or `null` data plus a human-readable error.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::PlannerError;
use crate::intents::{FieldEdits, ItemRequest};
use crate::models::{Allocation, FinancialData};
use crate::orchestrator::PlanOrchestrator;

const ANONYMOUS_USER: &str = "anonymous-user";

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub user_key: Option<String>,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdateRequest {
    pub user_key: Option<String>,
    #[serde(flatten)]
    pub edits: FieldEdits,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdateRequest {
    pub user_key: Option<String>,
    #[serde(flatten)]
    pub item: ItemRequest,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioRequest {
    pub user_key: Option<String>,
    pub allocations: Vec<Allocation>,
}

fn user_key(value: &Option<String>) -> &str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_USER)
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn status_for(error: &PlannerError) -> StatusCode {
    match error {
        PlannerError::UpdateInProgress => StatusCode::CONFLICT,
        PlannerError::NoPlan | PlannerError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        PlannerError::NothingToUpdate | PlannerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        e if e.is_generator_error() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond(result: crate::Result<FinancialData>) -> (StatusCode, Json<ApiResponse>) {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))),
        Err(e) => {
            warn!("Request failed: {}", e);
            (status_for(&e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<PlanOrchestrator>,
}

/// =============================
/// Endpoints
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn generate_plan(
    State(state): State<ApiState>,
    Json(req): Json<GenerateRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!(chars = req.text.len(), "Received generation request");
    respond(
        state
            .orchestrator
            .generate(user_key(&req.user_key), &req.text)
            .await,
    )
}

async fn update_fields(
    State(state): State<ApiState>,
    Json(req): Json<FieldUpdateRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    respond(
        state
            .orchestrator
            .update_fields(user_key(&req.user_key), &req.edits)
            .await,
    )
}

async fn update_item(
    State(state): State<ApiState>,
    Json(req): Json<ItemUpdateRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    respond(
        state
            .orchestrator
            .update_item(user_key(&req.user_key), &req.item)
            .await,
    )
}

async fn update_portfolio(
    State(state): State<ApiState>,
    Json(req): Json<PortfolioRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    respond(
        state
            .orchestrator
            .update_portfolio(user_key(&req.user_key), &req.allocations)
            .await,
    )
}

async fn check_portfolio_quality(
    State(state): State<ApiState>,
    Json(req): Json<PortfolioRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    respond(
        state
            .orchestrator
            .check_portfolio_quality(user_key(&req.user_key), &req.allocations)
            .await,
    )
}

async fn load_plan(
    State(state): State<ApiState>,
    Path(user_key): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    respond(state.orchestrator.load(&user_key).await)
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<PlanOrchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/api/plan/generate", post(generate_plan))
        .route("/api/plan/update", post(update_fields))
        .route("/api/plan/item", post(update_item))
        .route("/api/plan/:user_key", get(load_plan))
        .route("/api/portfolio", post(update_portfolio))
        .route("/api/portfolio/quality", post(check_portfolio_quality))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<PlanOrchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::StaticGenerator;
    use crate::state::InMemoryPlanStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn router(response: &str) -> Router {
        create_router(Arc::new(PlanOrchestrator::new(
            Box::new(StaticGenerator::new(response)),
            Box::new(InMemoryPlanStore::new()),
        )))
    }

    async fn call(router: &Router, method: &str, uri: &str, body: serde_json::Value) -> (StatusCode, ApiResponse) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_generate_then_load() {
        let router = router("{}");

        let (status, response) = call(
            &router,
            "POST",
            "/api/plan/generate",
            serde_json::json!({"userKey": "alice", "text": "Income: $4000\nRent: $1200"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(data["income"], 4000.0);
        assert_eq!(data["expenses"][0]["name"], "rent");

        let (status, response) =
            call(&router, "GET", "/api/plan/alice", serde_json::Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.data.unwrap()["plan"]["monthlyBudget"]["needs"], 2000.0);
    }

    #[tokio::test]
    async fn test_errors_carry_message_and_null_data() {
        let router = router("{}");

        let (status, response) = call(
            &router,
            "POST",
            "/api/plan/update",
            serde_json::json!({"userKey": "bob", "income": "100"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!response.success);
        assert!(response.data.is_none());
        assert!(response.error.unwrap().contains("No plan"));
    }

    #[tokio::test]
    async fn test_unparseable_generator_response() {
        let router = router("<html>oops</html>");

        let (status, response) = call(
            &router,
            "POST",
            "/api/plan/generate",
            serde_json::json!({"text": "Income: $4000"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(response.error.unwrap().starts_with("Generation failed"));
    }

    #[tokio::test]
    async fn test_item_update_route() {
        let router = router("{}");
        call(
            &router,
            "POST",
            "/api/plan/generate",
            serde_json::json!({"userKey": "carol", "text": "Income: $4000\nRent: $1200"}),
        )
        .await;

        let (status, response) = call(
            &router,
            "POST",
            "/api/plan/item",
            serde_json::json!({"userKey": "carol", "kind": "expense", "action": "remix", "target": "Rent"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.data.unwrap()["expenses"][0]["amount"], 1200.0);
    }
}
