use std::fmt;

use serde::{Deserialize, Serialize};

use crate::date_util::round2;

/// Unit tag carried by every metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "per day")]
    PerDay,
    #[serde(rename = "days")]
    Days,
    #[serde(rename = "hours")]
    Hours,
    #[serde(rename = "percent")]
    Percent,
    #[serde(rename = "score")]
    Score,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::PerDay => "per day",
            Unit::Days => "days",
            Unit::Hours => "hours",
            Unit::Percent => "percent",
            Unit::Score => "score",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single normalized metric: `{ "value": 1.23, "unit": "days" }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub value: f64,
    pub unit: Unit,
}

impl MetricResult {
    /// Value is rounded to two decimals.
    pub fn new(value: f64, unit: Unit) -> Self {
        Self {
            value: round2(value),
            unit,
        }
    }

    pub fn zero(unit: Unit) -> Self {
        Self { value: 0.0, unit }
    }
}

impl fmt::Display for MetricResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.value, self.unit)
    }
}

/// DORA four-keys metrics over the trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FourKeysMetrics {
    pub deployment_frequency: MetricResult,
    pub lead_time: MetricResult,
    pub change_failure_rate: MetricResult,
    pub time_to_restore: MetricResult,
}

impl FourKeysMetrics {
    /// All four metrics zero-valued with their units.
    pub fn empty() -> Self {
        Self {
            deployment_frequency: MetricResult::zero(Unit::PerDay),
            lead_time: MetricResult::zero(Unit::Days),
            change_failure_rate: MetricResult::zero(Unit::Percent),
            time_to_restore: MetricResult::zero(Unit::Hours),
        }
    }

    pub fn entries(&self) -> [(&'static str, MetricResult); 4] {
        [
            ("deployment_frequency", self.deployment_frequency),
            ("lead_time", self.lead_time),
            ("change_failure_rate", self.change_failure_rate),
            ("time_to_restore", self.time_to_restore),
        ]
    }
}

/// Issue-tracker metrics over the trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IssueTrackerMetrics {
    pub ticket_completion_rate: MetricResult,
    pub average_resolution_time: MetricResult,
    pub backlog_health: MetricResult,
}

impl IssueTrackerMetrics {
    pub fn empty() -> Self {
        Self {
            ticket_completion_rate: MetricResult::zero(Unit::Percent),
            average_resolution_time: MetricResult::zero(Unit::Days),
            backlog_health: MetricResult::zero(Unit::Score),
        }
    }

    pub fn entries(&self) -> [(&'static str, MetricResult); 3] {
        [
            ("ticket_completion_rate", self.ticket_completion_rate),
            ("average_resolution_time", self.average_resolution_time),
            ("backlog_health", self.backlog_health),
        ]
    }
}

/// Everything the dashboard renders for one user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub github_metrics: FourKeysMetrics,
    pub jira_metrics: IssueTrackerMetrics,
}
