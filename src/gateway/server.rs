//! Gateway orchestrator
//!
//! Every inbound request class runs the same screening pipeline before
//! anything leaves the process:
//!
//! ```text
//! text ─▶ Interceptor ─▶ RiskEngine ─▶ executor | downstream agent | router
//!            │ block         │ block
//!            └───────────────┴──────────▶ AuditLog (every decision)
//! ```

use crate::admin::{AgentDirectory, PolicyService};
use crate::audit::{AuditEvent, AuditLog, Decision, RequestKind};
use crate::config::OpenSecConfig;
use crate::dispatch::{executor_from_config, AgentDispatcher, DispatchOutput, Executor};
use crate::error::{Error, Result};
use crate::interceptor::Interceptor;
use crate::router::{ProviderRouter, RoutedResponse};
use crate::scanner::{RiskEngine, ScanOutcome};
use crate::sql::SqlFirewall;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a prompt that passed both screening stages
#[derive(Debug, Clone)]
pub struct Inspection {
    /// Prompt with sensitive spans replaced by markers
    pub redacted: String,
    pub outcome: ScanOutcome,
}

/// Response of `POST /gateway`
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    pub status: String,
    pub message: String,
    pub output: String,
    pub details: String,
}

/// Response of `POST /api/validate` and `POST /api/validate-sql`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub status: String,
    pub decision: Decision,
    pub details: String,
}

/// Response of `POST /api/agent-message`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessageResponse {
    pub status: String,
    pub target_agent: String,
    pub details: String,
    pub output: DispatchOutput,
}

/// OpenSec gateway
pub struct Gateway {
    interceptor: Interceptor,
    engine: RiskEngine,
    router: ProviderRouter,
    executor: Arc<dyn Executor>,
    dispatcher: AgentDispatcher,
    sql: SqlFirewall,
    audit: Arc<AuditLog>,
    policies: Arc<PolicyService>,
    directory: Arc<AgentDirectory>,
    excerpt_chars: usize,
}

impl Gateway {
    pub fn audit_log(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn policies(&self) -> &Arc<PolicyService> {
        &self.policies
    }

    pub fn directory(&self) -> &Arc<AgentDirectory> {
        &self.directory
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    /// Screen and score `text`, recording the decision.
    ///
    /// A transfer request is refused by the interceptor before any scanner
    /// runs and is recorded with score 1.0.
    pub async fn inspect(&self, kind: RequestKind, text: &str) -> Result<Inspection> {
        let screen = self.interceptor.screen(text);
        if !screen.allowed {
            let reason = screen.reason.unwrap_or_default();
            tracing::warn!(kind = ?kind, findings = screen.findings.len(), "Interceptor block");
            self.record(kind, &self.interceptor.redact(text), 1.0, Decision::Block)
                .await;
            return Err(Error::SecurityBlock(reason));
        }

        if !screen.findings.is_empty() {
            tracing::info!(kind = ?kind, findings = screen.findings.len(), "Sensitive data redacted");
        }

        let outcome = self.engine.evaluate(&screen.redacted).await;
        let decision = Decision::from_blocked(outcome.blocked);
        self.record(kind, &screen.redacted, outcome.score, decision)
            .await;

        if outcome.blocked {
            tracing::warn!(kind = ?kind, score = outcome.score, reasons = %outcome.details(), "Risk engine block");
            return Err(Error::SecurityBlock(outcome.details()));
        }

        Ok(Inspection {
            redacted: screen.redacted,
            outcome,
        })
    }

    /// Screen a prompt and run it in the sandbox
    pub async fn execute(&self, prompt: &str) -> Result<ExecuteResponse> {
        let inspection = self.inspect(RequestKind::Gateway, prompt).await?;

        let output = match self.executor.execute(&inspection.redacted).await {
            Ok(output) => output.combined(),
            Err(e) => {
                tracing::error!(executor = self.executor.name(), error = %e, "Sandbox execution failed");
                format!("Error executing in sandbox: {}", e)
            }
        };

        Ok(ExecuteResponse {
            status: "success".to_string(),
            message: "Prompt allowed and executed.".to_string(),
            output,
            details: inspection.outcome.details(),
        })
    }

    /// Screen a prompt without acting on it
    pub async fn validate(&self, prompt: &str) -> Result<ValidateResponse> {
        let inspection = self.inspect(RequestKind::Validate, prompt).await?;
        Ok(ValidateResponse {
            status: "success".to_string(),
            decision: Decision::Allow,
            details: inspection.outcome.details(),
        })
    }

    /// Screen a payload one agent sends to another, then hand it to the
    /// target's process
    pub async fn agent_message(
        &self,
        source: &str,
        target: &str,
        payload: &str,
    ) -> Result<AgentMessageResponse> {
        let inspection = self.inspect(RequestKind::AgentMessage, payload).await?;
        if !self.dispatcher.has_agent(target) {
            return Err(Error::UnknownAgent(target.to_string()));
        }

        let output = self
            .dispatcher
            .dispatch(source, target, &inspection.redacted)
            .await?;

        Ok(AgentMessageResponse {
            status: "delivered".to_string(),
            target_agent: target.to_string(),
            details: inspection.outcome.details(),
            output,
        })
    }

    /// Check an agent-issued SQL query against the firewall
    pub async fn validate_sql(&self, query: &str, agent_id: &str) -> Result<ValidateResponse> {
        let verdict = self.sql.check(query);
        let (score, decision) = if verdict.allowed {
            (0.0, Decision::Allow)
        } else {
            (1.0, Decision::Block)
        };
        let excerpt = self.interceptor.redact(query);
        self.record(RequestKind::Sql, &excerpt, score, decision).await;

        if !verdict.allowed {
            tracing::warn!(agent = agent_id, reasons = %verdict.details(), "SQL firewall block");
            return Err(Error::SecurityBlock(verdict.details()));
        }

        tracing::debug!(agent = agent_id, "SQL query allowed");
        Ok(ValidateResponse {
            status: "success".to_string(),
            decision: Decision::Allow,
            details: "Query allowed".to_string(),
        })
    }

    /// Screen a prompt and route it to a model
    pub async fn proxy_completion(
        &self,
        model: &str,
        prompt: &str,
        temperature: f64,
    ) -> Result<RoutedResponse> {
        let inspection = self.inspect(RequestKind::ModelProxy, prompt).await?;
        self.router
            .route(model, &inspection.redacted, temperature)
            .await
    }

    async fn record(&self, kind: RequestKind, text: &str, score: f64, decision: Decision) {
        self.audit
            .append(AuditEvent::new(
                kind,
                text,
                score,
                decision,
                self.excerpt_chars,
            ))
            .await;
    }
}

/// Builder for [`Gateway`]
///
/// Components left unset are built from the configuration.
pub struct GatewayBuilder {
    config: OpenSecConfig,
    engine: Option<RiskEngine>,
    router: Option<ProviderRouter>,
    executor: Option<Arc<dyn Executor>>,
    audit: Option<AuditLog>,
}

impl GatewayBuilder {
    /// Create a new builder with default config
    pub fn new() -> Self {
        Self {
            config: OpenSecConfig::default(),
            engine: None,
            router: None,
            executor: None,
            audit: None,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: OpenSecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine(mut self, engine: RiskEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn router(mut self, router: ProviderRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Build the gateway. Spawns the dispatch worker, so this must run
    /// inside a tokio runtime.
    pub async fn build(self) -> Result<Gateway> {
        let config = self.config;
        config.validate()?;

        let engine = match self.engine {
            Some(engine) => engine,
            None => RiskEngine::from_config(&config.scanners)?,
        };
        let router = match self.router {
            Some(router) => router,
            None => ProviderRouter::from_config(&config.routes, &config.providers, &config.cache)?,
        };
        let executor = match self.executor {
            Some(executor) => executor,
            None => executor_from_config(&config.executor)?,
        };
        let audit = match self.audit {
            Some(audit) => audit,
            None => match config.audit.storage_path() {
                Some(path) => AuditLog::open(path, config.audit.capacity).await,
                None => AuditLog::in_memory(config.audit.capacity),
            },
        };

        tracing::info!(
            scanners = ?engine.scanner_names(),
            aliases = ?router.aliases(),
            executor = executor.name(),
            "Gateway assembled"
        );

        Ok(Gateway {
            interceptor: Interceptor::new()?,
            engine,
            router,
            executor,
            dispatcher: AgentDispatcher::spawn(&config.agents),
            sql: SqlFirewall::new(&config.sql)?,
            audit: Arc::new(audit),
            policies: Arc::new(PolicyService::new()),
            directory: Arc::new(AgentDirectory::new(config.agents.directory.clone())),
            excerpt_chars: config.audit.excerpt_chars,
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
