//! Source-control port: the data the four-keys metrics are derived from.

pub mod github;
pub mod provider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::credential::Credential;
use crate::error::Result;
use crate::fetch::{Page, PageRequest};

pub use provider::SourceControlMetricsProvider;

/// A repository owned by the credentialed identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryRef {
    pub id: u64,
    pub name: String,
    /// `owner/name`
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentRecord {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub statuses: Vec<DeploymentStatus>,
}

impl DeploymentRecord {
    pub fn has_failed(&self) -> bool {
        self.statuses.iter().any(|s| s.state == DeploymentState::Failure)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentStatus {
    pub state: DeploymentState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    Error,
    Failure,
    Inactive,
    InProgress,
    Queued,
    Pending,
    Success,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRecord {
    pub number: u64,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merged: bool,
}

/// An issue; the provider only asks for closed ones carrying the incident label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRecord {
    pub number: u64,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// GitHub `state` query parameter. Every metric reads finished work only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
    Closed,
}

impl StateFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateFilter::Closed => "closed",
        }
    }
}

/// Paginated read access to a source-control host.
///
/// Every method fetches one page; [`crate::fetch::pagination::collect_pages`]
/// turns a method into a complete collection.
#[async_trait]
pub trait SourceControlApi: Send + Sync {
    async fn list_repositories(
        &self,
        credential: &Credential,
        page: PageRequest,
    ) -> Result<Page<RepositoryRef>>;

    /// Deployments without statuses; see
    /// [`list_deployment_statuses`](Self::list_deployment_statuses).
    async fn list_deployments(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        page: PageRequest,
    ) -> Result<Page<DeploymentRecord>>;

    async fn list_deployment_statuses(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        deployment_id: u64,
        page: PageRequest,
    ) -> Result<Page<DeploymentStatus>>;

    async fn list_pull_requests(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        state: StateFilter,
        page: PageRequest,
    ) -> Result<Page<PullRequestRecord>>;

    async fn list_issues(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        label: &str,
        state: StateFilter,
        page: PageRequest,
    ) -> Result<Page<IssueRecord>>;
}
