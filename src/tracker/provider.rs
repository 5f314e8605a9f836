use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::credential::Credential;
use crate::date_util::days_between;
use crate::error::Result;
use crate::fetch::pagination::collect_pages;
use crate::fetch::FetchOutcome;
use crate::metrics::{self, IssueTrackerMetrics, MetricResult, Unit};
use crate::tracker::jira::JiraApi;
use crate::tracker::{IssueTrackerApi, TicketQuery, TicketRecord};
use crate::window::TimeWindow;

/// Derives ticket completion, resolution time and backlog health from an
/// issue tracker. Like the source-control provider it never fails outward.
pub struct IssueTrackerMetricsProvider {
    api: Arc<dyn IssueTrackerApi>,
    page_size: u32,
    max_pages: u32,
    project: Option<String>,
    stale_after: Duration,
}

impl IssueTrackerMetricsProvider {
    pub fn new(api: Arc<dyn IssueTrackerApi>, config: &Config) -> Self {
        Self {
            api,
            page_size: config.page_size,
            max_pages: config.max_pages,
            project: config.jira_project.clone(),
            stale_after: Duration::days(config.stale_after_days),
        }
    }

    pub fn jira(config: &Config) -> Result<Self> {
        Ok(Self::new(Arc::new(JiraApi::new(config)?), config))
    }

    pub async fn metrics(&self, credential: Option<&Credential>) -> IssueTrackerMetrics {
        self.metrics_at(credential, Utc::now()).await
    }

    pub async fn metrics_at(
        &self,
        credential: Option<&Credential>,
        now: DateTime<Utc>,
    ) -> IssueTrackerMetrics {
        let Some(credential) = credential else {
            log::debug!("No issue-tracker credential, returning empty metrics");
            return IssueTrackerMetrics::empty();
        };

        let window = TimeWindow::last_30_days(now);
        let query = TicketQuery {
            window_start: window.start,
            project: self.project.clone(),
        };

        let tickets = match collect_pages("tickets", self.page_size, self.max_pages, |page| {
            self.api.search_tickets(credential, &query, page)
        })
        .await
        {
            FetchOutcome::Failed(e) if e.is_auth_failure() => {
                log::warn!("Issue-tracker credential rejected, returning empty metrics: {e}");
                return IssueTrackerMetrics::empty();
            }
            FetchOutcome::Failed(e) => {
                log::warn!("Could not search tickets, returning empty metrics: {e}");
                return IssueTrackerMetrics::empty();
            }
            outcome => outcome.into_items(),
        };

        let metrics = IssueTrackerMetrics {
            ticket_completion_rate: metrics::or_zero(
                "ticket completion rate",
                Unit::Percent,
                ticket_completion_rate(&tickets, &window),
            ),
            average_resolution_time: metrics::or_zero(
                "average resolution time",
                Unit::Days,
                average_resolution_time(&tickets, &window),
            ),
            backlog_health: metrics::or_zero(
                "backlog health",
                Unit::Score,
                backlog_health(&tickets, &window, self.stale_after),
            ),
        };
        log::info!("Computed issue-tracker metrics over {} tickets: {metrics:?}", tickets.len());
        metrics
    }
}

fn ticket_completion_rate(tickets: &[TicketRecord], window: &TimeWindow) -> Result<MetricResult> {
    let created: Vec<&TicketRecord> = tickets
        .iter()
        .filter(|t| window.contains(t.created_at))
        .collect();
    let resolved = created.iter().filter(|t| t.is_resolved_by(window.end)).count();
    metrics::ticket_completion_rate(created.len(), resolved)
}

fn average_resolution_time(tickets: &[TicketRecord], window: &TimeWindow) -> Result<MetricResult> {
    let mut days = Vec::new();
    for ticket in tickets {
        let Some(resolved) = ticket.resolution_time().filter(|r| window.contains(*r)) else {
            continue;
        };
        if resolved < ticket.created_at {
            log::warn!("Skipping ticket {}: resolved before it was created", ticket.key);
            continue;
        }
        days.push(days_between(ticket.created_at, resolved));
    }
    metrics::average_resolution_time(&days)
}

fn backlog_health(
    tickets: &[TicketRecord],
    window: &TimeWindow,
    stale_after: Duration,
) -> Result<MetricResult> {
    let open: Vec<&TicketRecord> = tickets.iter().filter(|t| t.is_open_at(window.end)).collect();
    let fresh = open
        .iter()
        .filter(|t| window.end - t.updated_at <= stale_after)
        .count();
    metrics::backlog_health(open.len(), fresh)
}
