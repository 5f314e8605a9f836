//! Jira REST v2 adapter for [`IssueTrackerApi`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::fetch::http::{build_client, check_response};
use crate::fetch::rate_limit::{retry_api, RetryPolicy};
use crate::fetch::{Page, PageRequest};
use crate::tracker::{IssueTrackerApi, StatusCategory, TicketQuery, TicketRecord};

const SEARCH_FIELDS: &str = "created,resolutiondate,updated,status";

/// Jira timestamps look like `2025-06-01T10:15:30.000+0000`.
const JIRA_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    start_at: u32,
    total: u32,
    #[serde(default)]
    issues: Vec<RawIssue>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    key: String,
    fields: RawFields,
}

#[derive(Debug, Deserialize)]
struct RawFields {
    created: String,
    resolutiondate: Option<String>,
    updated: Option<String>,
    status: Option<RawStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    status_category: Option<RawStatusCategory>,
}

#[derive(Debug, Deserialize)]
struct RawStatusCategory {
    key: String,
}

impl TryFrom<RawIssue> for TicketRecord {
    type Error = Error;

    fn try_from(raw: RawIssue) -> Result<Self> {
        let created_at = parse_jira_datetime(&raw.fields.created)?;
        let resolved_at = raw
            .fields
            .resolutiondate
            .as_deref()
            .map(parse_jira_datetime)
            .transpose()?;
        let updated_at = match raw.fields.updated.as_deref() {
            Some(s) => parse_jira_datetime(s)?,
            None => resolved_at.unwrap_or(created_at),
        };
        let status = raw
            .fields
            .status
            .and_then(|s| s.status_category)
            .map(|c| StatusCategory::from_key(&c.key))
            .unwrap_or(if resolved_at.is_some() {
                StatusCategory::Done
            } else {
                StatusCategory::ToDo
            });
        Ok(TicketRecord {
            key: raw.key,
            created_at,
            resolved_at,
            updated_at,
            status,
        })
    }
}

/// Parse a Jira timestamp, accepting RFC 3339 as well.
pub fn parse_jira_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(s, JIRA_DATETIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Deserialize(format!("invalid Jira timestamp '{s}': {e}")))
}

#[derive(Debug, Clone)]
pub struct JiraApi {
    http: reqwest::Client,
    server_url: String,
    retry: RetryPolicy,
}

impl JiraApi {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: build_client(config)?,
            server_url: config.jira_server_url.trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn search_url(&self, query: &TicketQuery, page: PageRequest) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/rest/api/2/search", self.server_url))?;
        url.query_pairs_mut()
            .append_pair("jql", &query.jql())
            .append_pair("startAt", &page.offset().to_string())
            .append_pair("maxResults", &page.size.to_string())
            .append_pair("fields", SEARCH_FIELDS);
        Ok(url)
    }

    async fn get_search(&self, credential: &Credential, url: &Url) -> Result<SearchResponse> {
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(credential.expose())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let resp = check_response("jira", resp).await?;
        resp.json()
            .await
            .map_err(|e| Error::Deserialize(e.to_string()))
    }
}

#[async_trait]
impl IssueTrackerApi for JiraApi {
    async fn search_tickets(
        &self,
        credential: &Credential,
        query: &TicketQuery,
        page: PageRequest,
    ) -> Result<Page<TicketRecord>> {
        let url = self.search_url(query, page)?;
        log::debug!("GET {url}");
        let response = retry_api!(self.retry, self.get_search(credential, &url))?;

        // Servers may return fewer than `maxResults`; the next request
        // starts after what actually came back.
        let returned = response.issues.len() as u32;
        let has_next = response.start_at + returned < response.total;
        if returned < page.size && has_next {
            log::debug!(
                "Jira returned {returned} of {} requested tickets at startAt={}",
                page.size,
                response.start_at
            );
        }

        let mut tickets = Vec::with_capacity(response.issues.len());
        for raw in response.issues {
            let key = raw.key.clone();
            match TicketRecord::try_from(raw) {
                Ok(ticket) => tickets.push(ticket),
                Err(e) => log::warn!("Skipping ticket {key}: {e}"),
            }
        }
        Ok(Page::filtered(tickets, returned, has_next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_jira_datetime() {
        let dt = parse_jira_datetime("2025-06-01T10:15:30.000+0000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 6, 1, 10, 15, 30).unwrap());

        let dt = parse_jira_datetime("2025-06-01T12:15:30.000+0200").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 6, 1, 10, 15, 30).unwrap());

        let dt = parse_jira_datetime("2025-06-01T10:15:30Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 6, 1, 10, 15, 30).unwrap());

        assert!(parse_jira_datetime("yesterday").is_err());
    }

    #[test]
    fn test_search_response_to_tickets() {
        let json = r#"{
            "startAt": 0, "maxResults": 50, "total": 2,
            "issues": [
                {"key": "OPS-1", "fields": {
                    "created": "2025-06-01T10:00:00.000+0000",
                    "resolutiondate": "2025-06-03T10:00:00.000+0000",
                    "updated": "2025-06-03T10:00:00.000+0000",
                    "status": {"name": "Done", "statusCategory": {"key": "done"}}}},
                {"key": "OPS-2", "fields": {
                    "created": "2025-06-02T10:00:00.000+0000",
                    "resolutiondate": null,
                    "updated": "2025-06-05T10:00:00.000+0000",
                    "status": {"statusCategory": {"key": "indeterminate"}}}}
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.total, 2);

        let tickets: Vec<TicketRecord> = response
            .issues
            .into_iter()
            .map(|raw| TicketRecord::try_from(raw).unwrap())
            .collect();
        assert_eq!(tickets[0].key, "OPS-1");
        assert_eq!(tickets[0].status, StatusCategory::Done);
        assert!(tickets[0].resolved_at.is_some());
        assert_eq!(tickets[1].status, StatusCategory::InProgress);
        assert_eq!(tickets[1].resolved_at, None);
    }

    #[test]
    fn test_missing_status_falls_back_to_resolution() {
        let raw: RawIssue = serde_json::from_str(
            r#"{"key": "OPS-3", "fields": {"created": "2025-06-01T10:00:00.000+0000",
                "resolutiondate": "2025-06-02T10:00:00.000+0000"}}"#,
        )
        .unwrap();
        let ticket = TicketRecord::try_from(raw).unwrap();
        assert_eq!(ticket.status, StatusCategory::Done);
        assert_eq!(ticket.updated_at, ticket.resolved_at.unwrap());
    }

    #[test]
    fn test_search_url() {
        let config = Config {
            jira_server_url: "https://example.atlassian.net/".into(),
            ..Config::default()
        };
        let api = JiraApi::new(&config).unwrap();
        assert_eq!(api.server_url(), "https://example.atlassian.net");

        let query = TicketQuery {
            window_start: Utc.with_ymd_and_hms(2025, 5, 31, 0, 0, 0).unwrap(),
            project: None,
        };
        let url = api.search_url(&query, PageRequest::first(50).advance(50)).unwrap();
        assert_eq!(url.path(), "/rest/api/2/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("startAt".into(), "50".into())));
        assert!(pairs.contains(&("maxResults".into(), "50".into())));
        assert!(pairs.contains(&("fields".into(), SEARCH_FIELDS.into())));
        assert!(pairs.iter().any(|(k, v)| k == "jql" && v.contains("resolution = EMPTY")));
    }
}
