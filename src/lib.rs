//! OpenSec - runtime security gateway for autonomous AI agents
//!
//! OpenSec sits between an agent and the tools and models it calls. Every
//! outbound request is screened for sensitive data, scored for malicious
//! intent by several independent scanners, and only then forwarded to a
//! sandbox, a downstream agent, or a language-model provider.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         OpenSec Gateway                          │
//! │                                                                  │
//! │  request ──▶ Interceptor ──▶ RiskEngine ──┬──▶ Sandbox executor   │
//! │              (redact /       (scanners,   ├──▶ Downstream agents  │
//! │               transfer        max score)  └──▶ Provider router    │
//! │               block)                            (fallback, cache) │
//! │                    │              │                               │
//! │                    └──────┬───────┘                               │
//! │                           ▼                                       │
//! │                      Audit log ──▶ stats / risk analysis          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`interceptor`]: credit cards, SSNs, emails, phones, transfer phrases
//! - [`scanner`]: scanner adapters and the risk engine
//! - [`router`]: model aliases with fallbacks and a response cache
//! - [`audit`]: bounded audit trail and derived analytics
//! - [`dispatch`]: sandbox executors and downstream agent processes
//! - [`sql`]: SQL firewall for agent queries
//! - [`admin`]: policy flags and agent directory
//! - [`gateway`]: the orchestrator tying the above together
//! - [`api`]: the combined HTTP application

pub mod admin;
pub mod api;
pub mod audit;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod interceptor;
pub mod router;
pub mod scanner;
pub mod sql;

pub use error::{Error, Result};
