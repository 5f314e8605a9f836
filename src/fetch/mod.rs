pub mod http;
pub mod pagination;
pub mod rate_limit;

use serde::Serialize;

use crate::error::Error;

/// One page of a paginated upstream collection. Pages are 1-based.
///
/// `start` is the item offset of this page. It advances by the number of
/// records the upstream actually returned, which can be fewer than `size`
/// when a server caps its page length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
    start: u32,
}

impl PageRequest {
    pub fn first(size: u32) -> Self {
        Self {
            number: 1,
            size,
            start: 0,
        }
    }

    /// The request following a page that returned `fetched` upstream records.
    pub fn advance(self, fetched: u32) -> Self {
        Self {
            number: self.number + 1,
            size: self.size,
            start: self.start + fetched,
        }
    }

    /// Zero-based item offset, for offset-paginated APIs.
    pub fn offset(&self) -> u32 {
        self.start
    }
}

/// Items returned for one [`PageRequest`].
///
/// `fetched` counts the records the upstream sent, before an adapter drops
/// any it cannot use. Pagination decisions are made on it, never on
/// `items.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next: bool,
    pub fetched: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, has_next: bool) -> Self {
        let fetched = items.len() as u32;
        Self {
            items,
            has_next,
            fetched,
        }
    }

    /// A page whose upstream returned `fetched` records, some of which the
    /// adapter filtered out of `items`.
    pub fn filtered(items: Vec<T>, fetched: u32, has_next: bool) -> Self {
        Self {
            items,
            has_next,
            fetched,
        }
    }
}

/// Result of fetching one entity collection. Consumed by the aggregation
/// folds: a `Failed` collection contributes nothing, a `Truncated` one
/// contributes what arrived before the failing page.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Complete(Vec<T>),
    Truncated { items: Vec<T>, error: Error },
    Failed(Error),
}

impl<T> FetchOutcome<T> {
    pub fn items(&self) -> &[T] {
        match self {
            FetchOutcome::Complete(items) | FetchOutcome::Truncated { items, .. } => items,
            FetchOutcome::Failed(_) => &[],
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            FetchOutcome::Complete(items) | FetchOutcome::Truncated { items, .. } => items,
            FetchOutcome::Failed(_) => Vec::new(),
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            FetchOutcome::Complete(_) => None,
            FetchOutcome::Truncated { error, .. } | FetchOutcome::Failed(error) => Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    /// Keep only items matching `keep`, preserving the outcome kind.
    pub fn filter(self, keep: impl Fn(&T) -> bool) -> Self {
        match self {
            FetchOutcome::Complete(items) => {
                FetchOutcome::Complete(items.into_iter().filter(|i| keep(i)).collect())
            }
            FetchOutcome::Truncated { items, error } => FetchOutcome::Truncated {
                items: items.into_iter().filter(|i| keep(i)).collect(),
                error,
            },
            FetchOutcome::Failed(e) => FetchOutcome::Failed(e),
        }
    }
}

/// Per-aggregation tally of how many entity collections were fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchReport {
    pub fetched: u64,
    pub truncated: u64,
    pub skipped: u64,
}

impl FetchReport {
    pub fn record<T>(&mut self, outcome: &FetchOutcome<T>) {
        match outcome {
            FetchOutcome::Complete(_) => self.fetched += 1,
            FetchOutcome::Truncated { .. } => self.truncated += 1,
            FetchOutcome::Failed(_) => self.skipped += 1,
        }
    }

    pub fn status(&self) -> FetchStatus {
        if self.skipped == 0 && self.truncated == 0 {
            FetchStatus::Success
        } else if self.fetched > 0 || self.truncated > 0 {
            FetchStatus::PartialFailure
        } else {
            FetchStatus::Failed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FetchStatus {
    Success,
    PartialFailure,
    Failed,
}
