pub mod config;
pub mod credential;
pub mod dashboard;
pub mod date_util;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod source;
pub mod tracker;
pub mod window;

pub use config::Config;
pub use credential::Credential;
pub use dashboard::Dashboard;
pub use error::{Error, Result};
pub use fetch::{FetchOutcome, FetchReport, FetchStatus, Page, PageRequest};
pub use metrics::{DashboardMetrics, FourKeysMetrics, IssueTrackerMetrics, MetricResult, Unit};
pub use source::{SourceControlApi, SourceControlMetricsProvider};
pub use tracker::{IssueTrackerApi, IssueTrackerMetricsProvider};
pub use window::TimeWindow;
