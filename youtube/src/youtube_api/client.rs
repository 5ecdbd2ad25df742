//! Core YouTube API client functionality.

use crate::youtube_api::activities::{
    ActivityListResponse, ActivityQuery, ActivitySource, ListingError,
};
use std::future::Future;
use tracing::instrument;

/// Where the YouTube Data API v3 lives.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Client for interacting with the YouTube Data API v3.
///
/// This client authenticates with a plain API key, which is enough for the public, read-only
/// endpoints it calls. The key is sent as the `key` query parameter on every request.
#[derive(Clone)]
pub struct YouTubeClient {
    /// API key from the Google Cloud console.
    api_key: String,
    /// Root URL that endpoint names are appended to, without a trailing slash.
    base_url: String,
    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YouTubeClient {
    /// Creates a new YouTube API client that talks to [`DEFAULT_BASE_URL`].
    ///
    /// # Arguments
    ///
    /// * `api_key` - A YouTube Data API key
    /// * `client` - HTTP client for making API requests; configure timeouts on it
    pub fn new(api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        }
    }

    /// Points the client at a different API root, such as a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Makes a GET request to a YouTube API endpoint with common error handling.
    ///
    /// Appends the API key to `query_params`, sends the request, and turns any non-success
    /// status into a [`ListingError::Status`] that carries the response body, which is where
    /// YouTube explains what went wrong (`quotaExceeded`, `keyInvalid`, ...).
    ///
    /// # Returns
    ///
    /// The raw [`reqwest::Response`] for endpoint-specific JSON parsing.
    #[instrument(skip(self), ret, level = tracing::Level::TRACE)]
    pub(crate) async fn make_request(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<reqwest::Response, ListingError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(query_params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(ListingError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            tracing::warn!(%status, endpoint, "YouTube API request failed");
            return Err(ListingError::Status { status, body });
        }

        Ok(response)
    }

    /// Calls the `activities.list` API for one page of a channel's activities.
    ///
    /// # Arguments
    ///
    /// * `query` - Channel, parts, page size and page token for this request
    ///
    /// # Returns
    ///
    /// An [`ActivityListResponse`] containing the API response data.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/activities/list>
    #[instrument(skip(self))]
    pub async fn fetch_activities(
        &self,
        query: &ActivityQuery,
    ) -> Result<ActivityListResponse, ListingError> {
        let max_results_string = query.max_results.to_string();
        let mut query_params = vec![
            ("part", query.part),
            ("channelId", query.channel_id.as_str()),
            ("maxResults", max_results_string.as_str()),
        ];

        if let Some(ref token) = query.page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let response = self.make_request("activities", &query_params).await?;

        let activities: ActivityListResponse =
            response.json().await.map_err(ListingError::Decode)?;

        tracing::debug!(
            total_results = activities.page_info.total_results,
            returned_items = activities.items.len(),
            "fetched activities"
        );

        Ok(activities)
    }
}

impl ActivitySource for YouTubeClient {
    fn list_activities(
        &self,
        query: &ActivityQuery,
    ) -> impl Future<Output = Result<ActivityListResponse, ListingError>> + Send {
        self.fetch_activities(query)
    }
}
