//! Unified API router for OpenSec
//!
//! Merges all module routers into a single axum `Router` with CORS and
//! request tracing.
//!
//! ## Endpoint Map
//!
//! | Path                                | Module  | Description                      |
//! |-------------------------------------|---------|----------------------------------|
//! | `/`, `/health`                      | api     | Liveness and version             |
//! | `/gateway`, `/api/validate`         | gateway | Screen and execute / validate    |
//! | `/api/agent-message`                | gateway | Screened agent-to-agent dispatch |
//! | `/api/validate-sql`                 | gateway | SQL firewall                     |
//! | `/bifrost/v1/chat/completions`      | gateway | Screened model proxy             |
//! | `/api/stats`, `/api/risk-analysis`, `/api/logs` | audit | Audit views          |
//! | `/api/agents`, `/api/policies`      | admin   | Reference data                   |

use crate::admin::{admin_router, AdminState};
use crate::audit::{audit_router, AuditState};
use crate::gateway::{gateway_router, Gateway};
use axum::{
    http::{header, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete OpenSec HTTP application
pub fn build_app(gateway: Arc<Gateway>, cors_origins: &[String]) -> Router {
    let admin_state = AdminState {
        policies: gateway.policies().clone(),
        directory: gateway.directory().clone(),
    };
    let audit_state = AuditState {
        log: gateway.audit_log().clone(),
        directory: gateway.directory().clone(),
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(gateway_router(gateway))
        .merge(audit_router(audit_state))
        .merge(admin_router(admin_state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(cors_origins))
}

#[derive(Serialize)]
struct RootResponse {
    status: &'static str,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "OpenSec Gateway running",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        if parsed.len() < origins.len() {
            tracing::warn!("Ignoring unparsable CORS origins");
        }
        cors.allow_origin(parsed)
    }
}
