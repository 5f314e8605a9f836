pub mod types;

pub use types::*;

use crate::error::{Error, Result};
use crate::window::TimeWindow;

/// Deployments per day over the window. Days are floored at 1.
pub fn deployment_frequency(deployments: usize, window: &TimeWindow) -> Result<MetricResult> {
    let value = deployments as f64 / window.days() as f64;
    finite(value, Unit::PerDay)
}

/// Mean lead time in days over qualifying pull requests; 0 if none.
pub fn lead_time(lead_times_days: &[f64]) -> Result<MetricResult> {
    finite(average(lead_times_days), Unit::Days)
}

/// Share of deployments with a failure status, in percent; 0 if none.
pub fn change_failure_rate(total: usize, failed: usize) -> Result<MetricResult> {
    if failed > total {
        return Err(Error::Aggregate(format!(
            "{failed} failed deployments out of {total}"
        )));
    }
    finite(percentage(failed, total), Unit::Percent)
}

/// Mean incident restore time in hours; 0 if none.
pub fn time_to_restore(restore_hours: &[f64]) -> Result<MetricResult> {
    finite(average(restore_hours), Unit::Hours)
}

/// Tickets created in the window that were resolved, in percent.
pub fn ticket_completion_rate(created: usize, resolved: usize) -> Result<MetricResult> {
    if resolved > created {
        return Err(Error::Aggregate(format!(
            "{resolved} resolved tickets out of {created} created"
        )));
    }
    finite(percentage(resolved, created), Unit::Percent)
}

/// Mean days from creation to resolution; 0 if nothing was resolved.
pub fn average_resolution_time(resolution_days: &[f64]) -> Result<MetricResult> {
    finite(average(resolution_days), Unit::Days)
}

/// Share of open tickets that are not stale, 0–100. An empty backlog is healthy.
pub fn backlog_health(open: usize, fresh: usize) -> Result<MetricResult> {
    if fresh > open {
        return Err(Error::Aggregate(format!(
            "{fresh} fresh tickets out of {open} open"
        )));
    }
    if open == 0 {
        return Ok(MetricResult::new(100.0, Unit::Score));
    }
    finite(percentage(fresh, open), Unit::Score)
}

/// Failure boundary for one metric: an aggregation error becomes the
/// zero value of that metric's unit and is logged.
pub fn or_zero(name: &str, unit: Unit, result: Result<MetricResult>) -> MetricResult {
    match result {
        Ok(metric) => metric,
        Err(e) => {
            log::error!("Error calculating {name}: {e}");
            MetricResult::zero(unit)
        }
    }
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn finite(value: f64, unit: Unit) -> Result<MetricResult> {
    if value.is_finite() {
        Ok(MetricResult::new(value, unit))
    } else {
        Err(Error::Aggregate(format!("non-finite {unit} value: {value}")))
    }
}
