use std::future::Future;

use crate::error::Result;
use crate::fetch::{FetchOutcome, Page, PageRequest};

/// Follow a paginated collection until it is exhausted or `max_pages` pages
/// have been read.
///
/// The upstream's `has_next` is trusted even when an adapter filtered every
/// item out of a page. Only a page on which the upstream itself returned no
/// records ends the stream early.
///
/// A failure on the first page yields [`FetchOutcome::Failed`]: the
/// collection contributes nothing. A failure on a later page ends the
/// stream and keeps what was already read ([`FetchOutcome::Truncated`]).
pub async fn collect_pages<T, F, Fut>(
    label: &str,
    page_size: u32,
    max_pages: u32,
    mut fetch_page: F,
) -> FetchOutcome<T>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut request = PageRequest::first(page_size);

    loop {
        match fetch_page(request).await {
            Ok(page) => {
                let fetched = page.fetched;
                items.extend(page.items);
                if !page.has_next {
                    return FetchOutcome::Complete(items);
                }
                if fetched == 0 {
                    log::debug!(
                        "Page {} of {label} was empty but advertised more, stopping",
                        request.number
                    );
                    return FetchOutcome::Complete(items);
                }
                request = request.advance(fetched);
            }
            Err(e) if request.number == 1 => {
                log::warn!("Error fetching {label}: {e}");
                return FetchOutcome::Failed(e);
            }
            Err(e) => {
                log::warn!(
                    "Error fetching page {} of {label}, keeping {} items: {e}",
                    request.number,
                    items.len()
                );
                return FetchOutcome::Truncated { items, error: e };
            }
        }

        // `request` already points at the next page here
        if request.number > max_pages {
            log::warn!(
                "Reached page limit ({max_pages}) for {label}, stopping after {} items",
                items.len()
            );
            return FetchOutcome::Complete(items);
        }
    }
}
