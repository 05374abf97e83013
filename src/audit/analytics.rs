//! Derived views over the audit trail

use super::log::{AuditEvent, Decision};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Scores at or above this count as high-risk alerts when blocked
pub const HIGH_RISK_SCORE: f64 = 0.8;

/// Dashboard counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_requests: usize,
    pub blocked_requests: usize,
    pub active_agents: usize,
    pub high_risk_alerts: usize,
}

/// Percent of events per risk band
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskDistribution {
    /// score < 0.3
    pub low: u32,
    /// 0.3 <= score < 0.7
    pub medium: u32,
    /// score >= 0.7
    pub high: u32,
}

/// Blocked events per day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarChart {
    pub labels: Vec<String>,
    pub data: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub pie_chart: RiskDistribution,
    pub bar_chart: BarChart,
}

pub fn stats(events: &[AuditEvent], active_agents: usize) -> Stats {
    let blocked = events.iter().filter(|e| e.decision == Decision::Block);
    Stats {
        total_requests: events.len(),
        blocked_requests: blocked.clone().count(),
        active_agents,
        high_risk_alerts: blocked.filter(|e| e.score >= HIGH_RISK_SCORE).count(),
    }
}

/// Rounded percentages; all zero for an empty trail
pub fn risk_distribution(events: &[AuditEvent]) -> RiskDistribution {
    let total = events.len();
    if total == 0 {
        return RiskDistribution {
            low: 0,
            medium: 0,
            high: 0,
        };
    }

    let (mut low, mut medium, mut high) = (0usize, 0usize, 0usize);
    for event in events {
        if event.score < 0.3 {
            low += 1;
        } else if event.score < 0.7 {
            medium += 1;
        } else {
            high += 1;
        }
    }

    let percent = |n: usize| ((n as f64 / total as f64) * 100.0).round() as u32;
    RiskDistribution {
        low: percent(low),
        medium: percent(medium),
        high: percent(high),
    }
}

/// Blocked events for each of the seven days ending on `now`, oldest first,
/// labelled with abbreviated weekday names.
pub fn blocked_by_day(events: &[AuditEvent], now: DateTime<Utc>) -> BarChart {
    let today = now.date_naive();
    let days: Vec<_> = (0..7).rev().map(|back| today - Duration::days(back)).collect();

    let data = days
        .iter()
        .map(|day| {
            events
                .iter()
                .filter(|e| e.decision == Decision::Block && e.timestamp.date_naive() == *day)
                .count()
        })
        .collect();

    BarChart {
        labels: days.iter().map(|d| d.format("%a").to_string()).collect(),
        data,
    }
}

pub fn risk_analysis(events: &[AuditEvent], now: DateTime<Utc>) -> RiskAnalysis {
    RiskAnalysis {
        pie_chart: risk_distribution(events),
        bar_chart: blocked_by_day(events, now),
    }
}
