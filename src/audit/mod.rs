//! Audit trail and reporting
//!
//! Every screened request leaves one [`AuditEvent`]. The trail keeps only
//! the most recent events (20 by default) and is the sole input for the
//! dashboard statistics and risk analysis.

pub mod analytics;
pub mod handler;
mod log;

pub use analytics::{RiskAnalysis, RiskDistribution, Stats};
pub use handler::{audit_router, AuditState};
pub use log::{AuditEvent, AuditLog, Decision, RequestKind};
