//! HTTP handlers for reference data
//!
//! - GET  /api/agents: registered agents
//! - GET  /api/policies: policy flags
//! - POST /api/policies: update one flag

use super::{AgentDirectory, AgentRecord, PolicyService, PolicyUpdate, PolicyUpdated};
use crate::error::Result;
use axum::{extract::State, routing::get, Json, Router};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared state for admin handlers
#[derive(Clone)]
pub struct AdminState {
    pub policies: Arc<PolicyService>,
    pub directory: Arc<AgentDirectory>,
}

pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/api/agents", get(list_agents))
        .route("/api/policies", get(get_policies).post(update_policy))
        .with_state(state)
}

/// GET /api/agents
async fn list_agents(State(state): State<AdminState>) -> Json<Vec<AgentRecord>> {
    Json(state.directory.list().to_vec())
}

/// GET /api/policies
async fn get_policies(State(state): State<AdminState>) -> Json<BTreeMap<String, bool>> {
    Json(state.policies.snapshot().await)
}

/// POST /api/policies
async fn update_policy(
    State(state): State<AdminState>,
    Json(update): Json<PolicyUpdate>,
) -> Result<Json<PolicyUpdated>> {
    Ok(Json(state.policies.update(update).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentsConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_app() -> (Router, Arc<PolicyService>) {
        let policies = Arc::new(PolicyService::new());
        let state = AdminState {
            policies: policies.clone(),
            directory: Arc::new(AgentDirectory::new(AgentsConfig::default().directory)),
        };
        (admin_router(state), policies)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_policy(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/policies")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_agents() {
        let (app, _) = make_app();
        let resp = app
            .oneshot(Request::builder().uri("/api/agents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["id"], "ag-hw1");
    }

    #[tokio::test]
    async fn test_get_policies() {
        let (app, _) = make_app();
        let resp = app
            .oneshot(Request::builder().uri("/api/policies").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["promptInjection"], true);
        assert_eq!(json["toolAccess"], false);
        assert_eq!(json["humanApproval"], true);
        assert_eq!(json["dataLeakage"], true);
    }

    #[tokio::test]
    async fn test_update_policy() {
        let (app, policies) = make_app();
        let resp = app
            .oneshot(post_policy(
                serde_json::json!({"policy": "humanApproval", "value": false}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["value"], false);
        assert_eq!(policies.get("humanApproval").await, Some(false));
    }

    #[tokio::test]
    async fn test_update_unknown_policy_404() {
        let (app, _) = make_app();
        let resp = app
            .oneshot(post_policy(serde_json::json!({"policy": "nope", "value": true})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }
}
