//! HTTP handlers for audit reporting
//!
//! - GET /api/stats: request counters
//! - GET /api/risk-analysis: risk distribution and blocked-per-day chart
//! - GET /api/logs: retained events, oldest first

use super::analytics::{self, RiskAnalysis, Stats};
use super::{AuditEvent, AuditLog};
use crate::admin::AgentDirectory;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

/// Shared state for audit handlers
#[derive(Clone)]
pub struct AuditState {
    pub log: Arc<AuditLog>,
    pub directory: Arc<AgentDirectory>,
}

pub fn audit_router(state: AuditState) -> Router {
    Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/risk-analysis", get(get_risk_analysis))
        .route("/api/logs", get(get_logs))
        .with_state(state)
}

/// GET /api/stats
async fn get_stats(State(state): State<AuditState>) -> Json<Stats> {
    let events = state.log.recent().await;
    Json(analytics::stats(&events, state.directory.active_count()))
}

/// GET /api/risk-analysis
async fn get_risk_analysis(State(state): State<AuditState>) -> Json<RiskAnalysis> {
    let events = state.log.recent().await;
    Json(analytics::risk_analysis(&events, chrono::Utc::now()))
}

/// GET /api/logs
async fn get_logs(State(state): State<AuditState>) -> Json<Vec<AuditEvent>> {
    Json(state.log.recent().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{Decision, RequestKind};
    use crate::config::AgentsConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn make_app() -> (Router, Arc<AuditLog>) {
        let log = Arc::new(AuditLog::in_memory(20));
        let state = AuditState {
            log: log.clone(),
            directory: Arc::new(AgentDirectory::new(AgentsConfig::default().directory)),
        };
        (audit_router(state), log)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn get(app: Router, uri: &str) -> serde_json::Value {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        body_json(resp).await
    }

    async fn seed(log: &AuditLog) {
        log.append(AuditEvent::new(RequestKind::Gateway, "ls", 0.0, Decision::Allow, 200))
            .await;
        log.append(AuditEvent::new(
            RequestKind::Validate,
            "rm -rf /",
            1.0,
            Decision::Block,
            200,
        ))
        .await;
    }

    #[tokio::test]
    async fn test_stats_empty() {
        let (app, _) = make_app().await;
        let json = get(app, "/api/stats").await;
        assert_eq!(json["totalRequests"], 0);
        assert_eq!(json["activeAgents"], 2);
    }

    #[tokio::test]
    async fn test_stats_seeded() {
        let (app, log) = make_app().await;
        seed(&log).await;
        let json = get(app, "/api/stats").await;
        assert_eq!(json["totalRequests"], 2);
        assert_eq!(json["blockedRequests"], 1);
        assert_eq!(json["highRiskAlerts"], 1);
    }

    #[tokio::test]
    async fn test_logs_in_order() {
        let (app, log) = make_app().await;
        seed(&log).await;
        let json = get(app, "/api/logs").await;
        let events = json.as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["prompt"], "ls");
        assert_eq!(events[1]["decision"], "BLOCK");
    }

    #[tokio::test]
    async fn test_risk_analysis() {
        let (app, log) = make_app().await;
        seed(&log).await;
        let json = get(app, "/api/risk-analysis").await;
        assert_eq!(json["pieChart"]["low"], 50);
        assert_eq!(json["pieChart"]["high"], 50);
        let data = json["barChart"]["data"].as_array().unwrap();
        assert_eq!(data.len(), 7);
        assert_eq!(data[6], 1);
    }
}
