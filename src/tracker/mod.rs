//! Issue-tracker port: tickets the issue-tracker metrics are derived from.

pub mod jira;
pub mod provider;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::credential::Credential;
use crate::error::Result;
use crate::fetch::{Page, PageRequest};

pub use provider::IssueTrackerMetricsProvider;

/// Jira's coarse workflow bucket for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    ToDo,
    InProgress,
    Done,
}

impl StatusCategory {
    /// Maps a Jira `statusCategory.key`. Unknown keys are treated as to-do.
    pub fn from_key(key: &str) -> Self {
        match key {
            "done" => StatusCategory::Done,
            "indeterminate" => StatusCategory::InProgress,
            _ => StatusCategory::ToDo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRecord {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub status: StatusCategory,
}

impl TicketRecord {
    /// When the ticket was resolved. Done tickets without a resolution date
    /// (workflows that never set one) count as resolved at their last update.
    pub fn resolution_time(&self) -> Option<DateTime<Utc>> {
        match (self.resolved_at, self.status) {
            (Some(resolved), _) => Some(resolved),
            (None, StatusCategory::Done) => Some(self.updated_at),
            (None, _) => None,
        }
    }

    /// Resolved no later than `at`.
    pub fn is_resolved_by(&self, at: DateTime<Utc>) -> bool {
        self.resolution_time().is_some_and(|resolved| resolved <= at)
    }

    /// Still open at `at`: never resolved, or resolved afterwards.
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        self.created_at <= at && !self.is_resolved_by(at)
    }
}

/// JQL dates are compared in the Jira user's timezone, not UTC.
const JQL_SINCE_SLACK_DAYS: i64 = 1;

/// Which tickets to fetch: everything touched since `window_start`, plus
/// every ticket still unresolved. The query reaches a day further back and
/// the provider filters to the exact window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketQuery {
    pub window_start: DateTime<Utc>,
    pub project: Option<String>,
}

impl TicketQuery {
    pub fn jql(&self) -> String {
        let since = self.window_start - Duration::days(JQL_SINCE_SLACK_DAYS);
        let since = since.format("%Y-%m-%d %H:%M");
        let mut jql = format!(
            r#"(created >= "{since}" OR resolutiondate >= "{since}" OR resolution = EMPTY)"#
        );
        if let Some(project) = &self.project {
            jql.push_str(&format!(r#" AND project = "{}""#, project.replace('"', "")));
        }
        jql.push_str(" ORDER BY key ASC");
        jql
    }
}

/// Paginated ticket search against an issue tracker.
#[async_trait]
pub trait IssueTrackerApi: Send + Sync {
    async fn search_tickets(
        &self,
        credential: &Credential,
        query: &TicketQuery,
        page: PageRequest,
    ) -> Result<Page<TicketRecord>>;
}
