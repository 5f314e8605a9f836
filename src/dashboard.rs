use crate::config::Config;
use crate::credential::Credential;
use crate::error::Result;
use crate::metrics::DashboardMetrics;
use crate::source::SourceControlMetricsProvider;
use crate::tracker::IssueTrackerMetricsProvider;

/// Assembles the dashboard payload from both providers.
pub struct Dashboard {
    source: SourceControlMetricsProvider,
    tracker: IssueTrackerMetricsProvider,
}

impl Dashboard {
    /// GitHub and Jira providers built from `config`.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_providers(
            SourceControlMetricsProvider::github(config)?,
            IssueTrackerMetricsProvider::jira(config)?,
        ))
    }

    pub fn with_providers(
        source: SourceControlMetricsProvider,
        tracker: IssueTrackerMetricsProvider,
    ) -> Self {
        Self { source, tracker }
    }

    pub fn source(&self) -> &SourceControlMetricsProvider {
        &self.source
    }

    pub fn tracker(&self) -> &IssueTrackerMetricsProvider {
        &self.tracker
    }

    /// Both metric sets, fetched concurrently. Each side degrades to its
    /// empty set independently.
    pub async fn metrics(
        &self,
        github: Option<&Credential>,
        jira: Option<&Credential>,
    ) -> DashboardMetrics {
        let (github_metrics, jira_metrics) = tokio::join!(
            self.source.four_keys_metrics(github),
            self.tracker.metrics(jira),
        );
        DashboardMetrics {
            github_metrics,
            jira_metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{FourKeysMetrics, IssueTrackerMetrics};

    #[tokio::test]
    async fn test_no_credentials_yields_empty_dashboard() {
        let dashboard = Dashboard::new(&Config::default()).unwrap();
        let metrics = dashboard.metrics(None, None).await;
        assert_eq!(metrics.github_metrics, FourKeysMetrics::empty());
        assert_eq!(metrics.jira_metrics, IssueTrackerMetrics::empty());

        let json = serde_json::to_value(metrics).unwrap();
        assert_eq!(json["github_metrics"]["deployment_frequency"]["unit"], "per day");
        assert_eq!(json["jira_metrics"]["backlog_health"]["unit"], "score");
    }
}
