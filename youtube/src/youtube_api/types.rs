//! Shared types and streaming infrastructure for the YouTube API client.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

/// One page of results: the page's items and the token of the page after it, if any.
pub type Page<T> = (VecDeque<T>, Option<String>);

type OneFuturePage<'a, F, T, E> = Pin<Box<dyn Future<Output = Result<(F, Page<T>), E>> + 'a + Send>>;

/// A paginated stream that automatically fetches subsequent pages from a YouTube API list endpoint.
///
/// This stream yields items one by one, automatically fetching the next page when the current
/// page is exhausted. Only supports forward pagination (no previous page support).
///
/// Pages are fetched lazily and strictly one at a time: the request for page `n + 1` is only
/// issued once every item of page `n` has been handed out. A failed fetch is yielded once as an
/// `Err`, after which the stream is finished.
pub struct PagedStream<'a, T, F, E> {
    /// Current batch of items from the most recent API response
    current_items: VecDeque<T>,
    /// Future representing the currently pending API request, if any
    pending_request: Option<OneFuturePage<'a, F, T, E>>,
    /// Whether we've reached the end of all available data
    is_done: bool,
}

impl<'a, T, F, E> PagedStream<'a, T, F, E> {
    /// Create a new PagedStream that starts at the first page of results.
    pub fn new<Fut>(fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = Result<Page<T>, E>> + Send + 'a,
    {
        Self::starting_at(None, fetcher)
    }

    /// Create a new PagedStream that resumes at the page identified by `page_token`.
    ///
    /// Passing `None` is the same as [`PagedStream::new`].
    pub fn starting_at<Fut>(page_token: Option<String>, fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = Result<Page<T>, E>> + Send + 'a,
    {
        let first_page = async move {
            let results = fetcher(page_token).await?;
            Ok::<_, E>((fetcher, results))
        };
        Self {
            pending_request: Some(Box::pin(first_page)),
            current_items: VecDeque::new(),
            is_done: false,
        }
    }
}

impl<'a, T: Unpin, F, E> Unpin for PagedStream<'a, T, F, E> {}

impl<'a, T: Unpin, F, E, Fut> Stream for PagedStream<'a, T, F, E>
where
    F: Fn(Option<String>) -> Fut,
    F: Send + 'a,
    Fut: Future<Output = Result<Page<T>, E>> + Send + 'a,
{
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.current_items.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if self.is_done {
                return Poll::Ready(None);
            }

            if let Some(pending) = self.pending_request.as_mut() {
                match pending.as_mut().poll(cx) {
                    Poll::Ready(Ok((fetcher, (items, next_token)))) => {
                        self.current_items.extend(items);

                        if let Some(next_token) = next_token {
                            // Set up the future for the next page, but don't poll it until
                            // the current batch has been drained.
                            self.pending_request = Some(Box::pin(async move {
                                let results = fetcher(Some(next_token)).await?;
                                Ok::<_, E>((fetcher, results))
                            }));
                        } else {
                            self.is_done = true;
                            self.pending_request = None;
                        }

                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        self.pending_request = None;
                        self.is_done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => {
                        return Poll::Pending;
                    }
                }
            } else {
                self.is_done = true;
                return Poll::Ready(None);
            }
        }
    }
}

/// Paging details for lists of resources.
///
/// Includes the total number of items available and the number of resources
/// returned in a single page response.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(rename = "totalResults", default)]
    pub total_results: u32,
    /// The number of results included in the API response.
    #[serde(rename = "resultsPerPage", default)]
    pub results_per_page: u32,
}
