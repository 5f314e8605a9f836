//! GitHub REST v3 adapter for [`SourceControlApi`].

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT, LINK};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::fetch::http::{build_client, check_response};
use crate::fetch::rate_limit::{retry_api, RetryPolicy};
use crate::fetch::{Page, PageRequest};
use crate::source::{
    DeploymentRecord, DeploymentStatus, IssueRecord, PullRequestRecord, RepositoryRef,
    SourceControlApi, StateFilter,
};

static RE_NEXT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).unwrap());

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Pull request as returned by the list endpoint, which omits `merged`.
#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
}

impl From<RawPullRequest> for PullRequestRecord {
    fn from(raw: RawPullRequest) -> Self {
        Self {
            number: raw.number,
            created_at: raw.created_at,
            merged: raw.merged_at.is_some(),
            merged_at: raw.merged_at,
        }
    }
}

/// Issue as returned by the issues endpoint, which also lists pull requests.
#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pull_request: Option<IgnoredAny>,
}

#[derive(Debug, Clone)]
pub struct GitHubApi {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl GitHubApi {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: build_client(config)?,
            base_url: config.github_api_url.trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, query: &[(&str, &str)], page: PageRequest) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{path}", self.base_url))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("per_page", &page.size.to_string());
            pairs.append_pair("page", &page.number.to_string());
        }
        Ok(url)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        url: &Url,
    ) -> Result<Page<T>> {
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(credential.expose())
            .header(ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .await?;
        let resp = check_response("github", resp).await?;
        let has_next = has_next_link(resp.headers());
        let items: Vec<T> = resp
            .json()
            .await
            .map_err(|e| Error::Deserialize(e.to_string()))?;
        Ok(Page::new(items, has_next))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        url: Url,
    ) -> Result<Page<T>> {
        log::debug!("GET {url}");
        retry_api!(self.retry, self.get_page(credential, &url))
    }
}

#[async_trait]
impl SourceControlApi for GitHubApi {
    async fn list_repositories(
        &self,
        credential: &Credential,
        page: PageRequest,
    ) -> Result<Page<RepositoryRef>> {
        let url = self.url("/user/repos", &[("affiliation", "owner")], page)?;
        self.fetch(credential, url).await
    }

    async fn list_deployments(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        page: PageRequest,
    ) -> Result<Page<DeploymentRecord>> {
        let path = format!("/repos/{}/deployments", repo.full_name);
        let url = self.url(&path, &[], page)?;
        self.fetch(credential, url).await
    }

    async fn list_deployment_statuses(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        deployment_id: u64,
        page: PageRequest,
    ) -> Result<Page<DeploymentStatus>> {
        let path = format!("/repos/{}/deployments/{deployment_id}/statuses", repo.full_name);
        let url = self.url(&path, &[], page)?;
        self.fetch(credential, url).await
    }

    async fn list_pull_requests(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        state: StateFilter,
        page: PageRequest,
    ) -> Result<Page<PullRequestRecord>> {
        let path = format!("/repos/{}/pulls", repo.full_name);
        let query = [
            ("state", state.as_str()),
            ("sort", "updated"),
            ("direction", "desc"),
        ];
        let url = self.url(&path, &query, page)?;
        let raw: Page<RawPullRequest> = self.fetch(credential, url).await?;
        Ok(Page::filtered(
            raw.items.into_iter().map(PullRequestRecord::from).collect(),
            raw.fetched,
            raw.has_next,
        ))
    }

    async fn list_issues(
        &self,
        credential: &Credential,
        repo: &RepositoryRef,
        label: &str,
        state: StateFilter,
        page: PageRequest,
    ) -> Result<Page<IssueRecord>> {
        let path = format!("/repos/{}/issues", repo.full_name);
        let query = [("state", state.as_str()), ("labels", label)];
        let url = self.url(&path, &query, page)?;
        let raw: Page<RawIssue> = self.fetch(credential, url).await?;
        let issues = raw
            .items
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(|i| IssueRecord {
                number: i.number,
                created_at: i.created_at,
                closed_at: i.closed_at,
            })
            .collect();
        // A page holding only pull requests is empty here but not upstream
        Ok(Page::filtered(issues, raw.fetched, raw.has_next))
    }
}

/// True if the `Link` header advertises a `rel="next"` page.
fn has_next_link(headers: &HeaderMap) -> bool {
    headers
        .get(LINK)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|link| RE_NEXT_LINK.is_match(link))
}
