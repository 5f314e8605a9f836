use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::config::Config;
use crate::credential::Credential;
use crate::date_util::{days_between, hours_between};
use crate::error::Result;
use crate::fetch::pagination::collect_pages;
use crate::fetch::{FetchOutcome, FetchReport, FetchStatus};
use crate::metrics::{self, FourKeysMetrics, MetricResult, Unit};
use crate::source::github::GitHubApi;
use crate::source::{
    DeploymentRecord, IssueRecord, PullRequestRecord, RepositoryRef, SourceControlApi, StateFilter,
};
use crate::window::TimeWindow;

/// A deployment inside the window. `statuses_known` is false when its
/// statuses could not be fetched; such a deployment still counts toward
/// frequency but not toward change failure rate.
#[derive(Debug, Clone)]
struct TrackedDeployment {
    record: DeploymentRecord,
    statuses_known: bool,
}

/// Everything fetched for one repository, already filtered to the window.
#[derive(Debug)]
struct RepoSnapshot {
    deployments: FetchOutcome<TrackedDeployment>,
    pull_requests: FetchOutcome<PullRequestRecord>,
    incidents: FetchOutcome<IssueRecord>,
}

/// Derives the four keys from a source-control host.
///
/// Never fails outward: a missing or rejected credential yields
/// [`FourKeysMetrics::empty`], a repository whose fetch fails is left out
/// of the affected metric, and a metric whose aggregation fails falls back
/// to its own zero value without touching the other three.
pub struct SourceControlMetricsProvider {
    api: Arc<dyn SourceControlApi>,
    page_size: u32,
    max_pages: u32,
    max_concurrency: usize,
    incident_label: String,
}

impl SourceControlMetricsProvider {
    pub fn new(api: Arc<dyn SourceControlApi>, config: &Config) -> Self {
        Self {
            api,
            page_size: config.page_size,
            max_pages: config.max_pages,
            max_concurrency: config.max_concurrency.max(1),
            incident_label: config.incident_label.clone(),
        }
    }

    /// Provider backed by the GitHub REST API.
    pub fn github(config: &Config) -> Result<Self> {
        Ok(Self::new(Arc::new(GitHubApi::new(config)?), config))
    }

    /// Four-keys metrics over the 30 days ending now.
    pub async fn four_keys_metrics(&self, credential: Option<&Credential>) -> FourKeysMetrics {
        self.four_keys_metrics_at(credential, Utc::now()).await
    }

    /// Four-keys metrics over the 30 days ending at `now`.
    pub async fn four_keys_metrics_at(
        &self,
        credential: Option<&Credential>,
        now: DateTime<Utc>,
    ) -> FourKeysMetrics {
        let Some(credential) = credential else {
            log::debug!("No source-control credential, returning empty metrics");
            return FourKeysMetrics::empty();
        };

        let window = TimeWindow::last_30_days(now);

        let repos = match self.repositories(credential).await {
            Some(repos) => repos,
            None => return FourKeysMetrics::empty(),
        };

        let snapshots: Vec<RepoSnapshot> = stream::iter(repos.iter())
            .map(|repo| self.snapshot(credential, repo, &window))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut report = FetchReport::default();
        for snapshot in &snapshots {
            report.record(&snapshot.deployments);
            report.record(&snapshot.pull_requests);
            report.record(&snapshot.incidents);
        }
        if report.status() != FetchStatus::Success {
            log::warn!(
                "Source-control fetch {:?} across {} repositories: \
                 {} fetched, {} truncated, {} skipped",
                report.status(),
                repos.len(),
                report.fetched,
                report.truncated,
                report.skipped
            );
        }

        let metrics = FourKeysMetrics {
            deployment_frequency: metrics::or_zero(
                "deployment frequency",
                Unit::PerDay,
                deployment_frequency(&snapshots, &window),
            ),
            lead_time: metrics::or_zero("lead time", Unit::Days, lead_time(&snapshots)),
            change_failure_rate: metrics::or_zero(
                "change failure rate",
                Unit::Percent,
                change_failure_rate(&snapshots),
            ),
            time_to_restore: metrics::or_zero(
                "time to restore",
                Unit::Hours,
                time_to_restore(&snapshots),
            ),
        };
        log::info!("Computed four-keys metrics over {} repositories: {metrics:?}", repos.len());
        metrics
    }

    /// Repositories owned by the credentialed identity, or `None` when
    /// nothing can be aggregated (credential rejected, listing failed).
    async fn repositories(&self, credential: &Credential) -> Option<Vec<RepositoryRef>> {
        let outcome = collect_pages("repositories", self.page_size, self.max_pages, |page| {
            self.api.list_repositories(credential, page)
        })
        .await;

        match outcome {
            FetchOutcome::Failed(e) if e.is_auth_failure() => {
                log::warn!("Source-control credential rejected, returning empty metrics: {e}");
                None
            }
            FetchOutcome::Failed(e) => {
                log::warn!("Could not list repositories, returning empty metrics: {e}");
                None
            }
            outcome => Some(outcome.into_items()),
        }
    }

    async fn snapshot(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        window: &TimeWindow,
    ) -> RepoSnapshot {
        let (deployments, pull_requests, incidents) = futures::join!(
            self.deployments(credential, repo, window),
            self.merged_pull_requests(credential, repo, window),
            self.incidents(credential, repo, window),
        );
        RepoSnapshot {
            deployments,
            pull_requests,
            incidents,
        }
    }

    async fn deployments(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        window: &TimeWindow,
    ) -> FetchOutcome<TrackedDeployment> {
        let label = format!("deployments for repo {}", repo.full_name);
        let outcome = collect_pages(&label, self.page_size, self.max_pages, |page| {
            self.api.list_deployments(credential, repo, page)
        })
        .await
        .filter(|d| window.contains(d.created_at));

        let (records, error) = match outcome {
            FetchOutcome::Complete(records) => (records, None),
            FetchOutcome::Truncated { items, error } => (items, Some(error)),
            FetchOutcome::Failed(e) => return FetchOutcome::Failed(e),
        };

        let mut tracked = Vec::with_capacity(records.len());
        for mut record in records {
            let label = format!("statuses for deployment {} in {}", record.id, repo.full_name);
            let statuses = collect_pages(&label, self.page_size, self.max_pages, |page| {
                self.api
                    .list_deployment_statuses(credential, repo, record.id, page)
            })
            .await;
            let statuses_known = !statuses.is_failed();
            record.statuses = statuses.into_items();
            tracked.push(TrackedDeployment {
                record,
                statuses_known,
            });
        }

        match error {
            None => FetchOutcome::Complete(tracked),
            Some(error) => FetchOutcome::Truncated {
                items: tracked,
                error,
            },
        }
    }

    async fn merged_pull_requests(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        window: &TimeWindow,
    ) -> FetchOutcome<PullRequestRecord> {
        let label = format!("pull requests for repo {}", repo.full_name);
        collect_pages(&label, self.page_size, self.max_pages, |page| {
            self.api
                .list_pull_requests(credential, repo, StateFilter::Closed, page)
        })
        .await
        .filter(|pr| pr.merged && window.contains_opt(pr.merged_at))
    }

    async fn incidents(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        window: &TimeWindow,
    ) -> FetchOutcome<IssueRecord> {
        let label = format!("incidents for repo {}", repo.full_name);
        collect_pages(&label, self.page_size, self.max_pages, |page| {
            self.api.list_issues(
                credential,
                repo,
                &self.incident_label,
                StateFilter::Closed,
                page,
            )
        })
        .await
        .filter(|issue| window.contains_opt(issue.closed_at))
    }
}

fn deployment_frequency(snapshots: &[RepoSnapshot], window: &TimeWindow) -> Result<MetricResult> {
    let total: usize = snapshots.iter().map(|s| s.deployments.items().len()).sum();
    metrics::deployment_frequency(total, window)
}

fn change_failure_rate(snapshots: &[RepoSnapshot]) -> Result<MetricResult> {
    let known: Vec<&TrackedDeployment> = snapshots
        .iter()
        .flat_map(|s| s.deployments.items())
        .filter(|d| d.statuses_known)
        .collect();
    let failed = known.iter().filter(|d| d.record.has_failed()).count();
    metrics::change_failure_rate(known.len(), failed)
}

fn lead_time(snapshots: &[RepoSnapshot]) -> Result<MetricResult> {
    let days: Vec<f64> = snapshots
        .iter()
        .flat_map(|s| s.pull_requests.items())
        .filter_map(|pr| pr.merged_at.map(|merged| days_between(pr.created_at, merged)))
        .collect();
    metrics::lead_time(&days)
}

fn time_to_restore(snapshots: &[RepoSnapshot]) -> Result<MetricResult> {
    let hours: Vec<f64> = snapshots
        .iter()
        .flat_map(|s| s.incidents.items())
        .filter_map(|i| i.closed_at.map(|closed| hours_between(i.created_at, closed)))
        .collect();
    metrics::time_to_restore(&hours)
}
