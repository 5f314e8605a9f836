//! GitHub adapter and four-keys provider against a wiremock server

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use fourkeys::fetch::pagination::collect_pages;
use fourkeys::fetch::rate_limit::RetryPolicy;
use fourkeys::source::github::GitHubApi;
use fourkeys::source::{RepositoryRef, SourceControlApi, StateFilter};
use fourkeys::{
    Config, Credential, Error, FetchOutcome, PageRequest, SourceControlMetricsProvider, Unit,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> Config {
    Config {
        github_api_url: server.uri(),
        retry: RetryPolicy {
            max_retries: 2,
            backoff_secs: vec![0],
            ..RetryPolicy::default()
        },
        ..Config::default()
    }
}

fn credential() -> Credential {
    Credential::new("ghp_test").unwrap()
}

fn repo_json(id: u64, name: &str) -> serde_json::Value {
    json!({"id": id, "name": name, "full_name": format!("octo/{name}"), "private": false})
}

fn octo_api() -> RepositoryRef {
    RepositoryRef {
        id: 1,
        name: "api".into(),
        full_name: "octo/api".into(),
    }
}

#[tokio::test]
async fn test_repositories_follow_link_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("page", "1"))
        .and(query_param("affiliation", "owner"))
        .and(header("authorization", "Bearer ghp_test"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([repo_json(1, "api"), repo_json(2, "web")]))
                .insert_header(
                    "link",
                    format!(r#"<{}/user/repos?page=2>; rel="next""#, server.uri()).as_str(),
                ),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([repo_json(3, "cli")])))
        .mount(&server)
        .await;

    let api = GitHubApi::new(&config(&server)).unwrap();
    let cred = credential();
    let outcome =
        collect_pages("repositories", 2, 50, |page| api.list_repositories(&cred, page)).await;

    let names: Vec<&str> = outcome.items().iter().map(|r| r.full_name.as_str()).collect();
    assert!(matches!(outcome, FetchOutcome::Complete(_)));
    assert_eq!(names, vec!["octo/api", "octo/web", "octo/cli"]);
}

#[tokio::test]
async fn test_unauthorized_is_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
        )
        .mount(&server)
        .await;

    let api = GitHubApi::new(&config(&server)).unwrap();
    let err = api
        .list_repositories(&credential(), PageRequest::first(100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn test_plain_forbidden_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/api/deployments"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "4999")
                .set_body_string("Resource not accessible by integration"),
        )
        .mount(&server)
        .await;

    let api = GitHubApi::new(&config(&server)).unwrap();
    let err = api
        .list_deployments(&credential(), &octo_api(), PageRequest::first(100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api { status: 403, .. }));
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/api/pulls"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/api/pulls"))
        .and(query_param("state", "closed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"number": 5, "created_at": "2025-06-01T00:00:00Z",
             "merged_at": "2025-06-02T00:00:00Z"},
            {"number": 6, "created_at": "2025-06-01T00:00:00Z", "merged_at": null}
        ])))
        .with_priority(2)
        .mount(&server)
        .await;

    let api = GitHubApi::new(&config(&server)).unwrap();
    let page = api
        .list_pull_requests(
            &credential(),
            &octo_api(),
            StateFilter::Closed,
            PageRequest::first(100),
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.items[0].merged);
    assert!(!page.items[1].merged);
    assert!(!page.has_next);
}

#[tokio::test]
async fn test_rate_limit_gives_up_without_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        retry: RetryPolicy::none(),
        ..config(&server)
    };
    let api = GitHubApi::new(&config).unwrap();
    let err = api
        .list_repositories(&credential(), PageRequest::first(100))
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_issues_endpoint_drops_pull_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/api/issues"))
        .and(query_param("labels", "incident"))
        .and(query_param("state", "closed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"number": 1, "created_at": "2025-06-01T00:00:00Z",
             "closed_at": "2025-06-01T06:00:00Z"},
            {"number": 2, "created_at": "2025-06-01T00:00:00Z",
             "closed_at": "2025-06-02T00:00:00Z",
             "pull_request": {"url": "https://api.github.com/repos/octo/api/pulls/2"}}
        ])))
        .mount(&server)
        .await;

    let api = GitHubApi::new(&config(&server)).unwrap();
    let page = api
        .list_issues(
            &credential(),
            &octo_api(),
            "incident",
            StateFilter::Closed,
            PageRequest::first(100),
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].number, 1);
}

#[tokio::test]
async fn test_incidents_page_of_only_pull_requests_keeps_paging() {
    let server = MockServer::start().await;
    let now = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([repo_json(1, "api")])))
        .mount(&server)
        .await;

    for endpoint in ["/repos/octo/api/deployments", "/repos/octo/api/pulls"] {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/repos/octo/api/issues"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    {"number": 7, "created_at": "2025-06-19T00:00:00Z",
                     "closed_at": "2025-06-19T01:00:00Z",
                     "pull_request": {"url": "https://api.github.com/repos/octo/api/pulls/7"}}
                ]))
                .insert_header(
                    "link",
                    format!(
                        r#"<{}/repos/octo/api/issues?page=2>; rel="next""#,
                        server.uri()
                    )
                    .as_str(),
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/api/issues"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"number": 8, "created_at": "2025-06-20T00:00:00Z",
             "closed_at": "2025-06-20T05:00:00Z"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let provider = SourceControlMetricsProvider::github(&config(&server)).unwrap();
    let metrics = provider.four_keys_metrics_at(Some(&credential()), now).await;

    assert_eq!(metrics.time_to_restore.value, 5.0);
    assert_eq!(metrics.time_to_restore.unit, Unit::Hours);
}

#[tokio::test]
async fn test_four_keys_end_to_end() {
    let server = MockServer::start().await;
    let now = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([repo_json(1, "api")])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/api/deployments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "created_at": "2025-06-28T10:00:00Z"},
            {"id": 2, "created_at": "2025-06-20T10:00:00Z"},
            {"id": 3, "created_at": "2025-04-01T10:00:00Z"}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/api/deployments/1/statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"state": "failure"}, {"state": "in_progress"}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/api/deployments/2/statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"state": "success"}])))
        .mount(&server)
        .await;

    // Out-of-window deployment statuses are never requested
    Mock::given(method("GET"))
        .and(path("/repos/octo/api/deployments/3/statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"state": "failure"}])))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/api/pulls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"number": 10, "created_at": "2025-06-10T00:00:00Z",
             "merged_at": "2025-06-12T00:00:00Z"},
            {"number": 11, "created_at": "2025-06-10T00:00:00Z",
             "merged_at": "2025-06-14T00:00:00Z"}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/api/issues"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let provider = SourceControlMetricsProvider::new(
        Arc::new(GitHubApi::new(&config(&server)).unwrap()),
        &config(&server),
    );
    let metrics = provider.four_keys_metrics_at(Some(&credential()), now).await;

    assert_eq!(metrics.deployment_frequency.value, 0.07);
    assert_eq!(metrics.deployment_frequency.unit, Unit::PerDay);
    assert_eq!(metrics.change_failure_rate.value, 50.0);
    assert_eq!(metrics.lead_time.value, 3.0);
    // Incidents failed to fetch: zero, other keys unaffected
    assert_eq!(metrics.time_to_restore.value, 0.0);
    assert_eq!(metrics.time_to_restore.unit, Unit::Hours);
}

#[tokio::test]
async fn test_rejected_token_yields_empty_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = SourceControlMetricsProvider::github(&config(&server)).unwrap();
    let metrics = provider.four_keys_metrics(Some(&credential())).await;
    assert_eq!(metrics, fourkeys::FourKeysMetrics::empty());
}
