//! YouTube Activities API types and the channel video listing built on top of them.

use crate::youtube_api::types::{PageInfo, PagedStream};
use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use tokio_stream::Stream;

/// Errors produced while listing a channel's activities.
///
/// Any of these ends a [`list_videos`] stream: the error is yielded once and no further pages are
/// requested. Nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    /// The request never produced a response (DNS, connection, timeout, ...).
    #[error("send activities request to YouTube API")]
    Request(#[source] reqwest::Error),
    /// The API answered with a non-success status, e.g. a bad key, an exhausted quota, or an
    /// unknown channel.
    #[error("YouTube API request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The response body was not a valid `activities.list` response.
    #[error("parse YouTube activities response as JSON")]
    Decode(#[source] reqwest::Error),
}

/// Response structure for the `activities.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/activities/list>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityListResponse {
    /// Identifies the API resource's type.
    ///
    /// The value will be `youtube#activityListResponse`.
    #[serde(default)]
    pub kind: String,
    /// A list of activities, or events, that match the request criteria.
    #[serde(default)]
    pub items: VecDeque<Activity>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
    /// Token that can be used as the value of the pageToken parameter to retrieve the next page in the result set.
    #[serde(rename = "nextPageToken", default)]
    pub next_page_token: Option<String>,
}

/// An `activity` resource contains information about an action that a particular channel took.
///
/// See: <https://developers.google.com/youtube/v3/docs/activities#resource>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// The ID that YouTube uses to uniquely identify the activity.
    #[serde(default)]
    pub id: Option<String>,
    /// Only present when the `snippet` part was requested.
    #[serde(default)]
    pub snippet: Option<ActivitySnippet>,
    #[serde(rename = "contentDetails", default)]
    pub content_details: ActivityContentDetails,
}

/// The subset of an activity's snippet that is used for reporting.
///
/// See: <https://developers.google.com/youtube/v3/docs/activities#snippet>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySnippet {
    /// The title of the resource primarily associated with the activity.
    #[serde(default)]
    pub title: Option<String>,
    /// The date and time that the activity occurred. Unparseable values are dropped.
    #[serde(
        rename = "publishedAt",
        default,
        deserialize_with = "timestamp_or_none"
    )]
    pub published_at: Option<Timestamp>,
}

fn timestamp_or_none<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    if raw.is_null() {
        return Ok(None);
    }
    let parsed = raw.as_str().map(str::parse::<Timestamp>);
    match parsed {
        Some(Ok(timestamp)) => Ok(Some(timestamp)),
        Some(Err(e)) => {
            tracing::debug!(%raw, error = %e, "ignoring unparseable publishedAt");
            Ok(None)
        }
        None => {
            tracing::debug!(%raw, "ignoring non-string publishedAt");
            Ok(None)
        }
    }
}

/// The payload of an activity.
///
/// YouTube sends an object with exactly one key naming the kind of activity. Only uploads and
/// playlist additions reference a video; every other kind (likes, subscriptions, ...) and a
/// missing `contentDetails` end up in [`ActivityContentDetails::Other`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivityContentDetails {
    Upload {
        upload: UploadDetails,
    },
    PlaylistItem {
        #[serde(rename = "playlistItem")]
        playlist_item: PlaylistItemDetails,
    },
    Other(serde_json::Value),
}

impl Default for ActivityContentDetails {
    fn default() -> Self {
        ActivityContentDetails::Other(serde_json::Value::Null)
    }
}

/// Details about an uploaded video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDetails {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

/// Details about a video that was added to a playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItemDetails {
    #[serde(rename = "resourceId")]
    pub resource_id: ResourceId,
}

/// Identifies the resource that was added to the playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceId {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(rename = "videoId")]
    pub video_id: String,
}

/// How a video showed up in a channel's activity feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoOrigin {
    Upload,
    PlaylistItem,
}

/// A video referenced by a channel activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    pub id: String,
    pub title: Option<String>,
    pub published_at: Option<Timestamp>,
    pub origin: VideoOrigin,
}

impl Activity {
    /// Resolves the video this activity refers to, if any.
    pub fn into_video_ref(self) -> Option<VideoRef> {
        let (id, origin) = match self.content_details {
            ActivityContentDetails::Upload { upload } => (upload.video_id, VideoOrigin::Upload),
            ActivityContentDetails::PlaylistItem { playlist_item } => (
                playlist_item.resource_id.video_id,
                VideoOrigin::PlaylistItem,
            ),
            ActivityContentDetails::Other(_) => return None,
        };
        let (title, published_at) = match self.snippet {
            Some(snippet) => (snippet.title, snippet.published_at),
            None => (None, None),
        };
        Some(VideoRef {
            id,
            title,
            published_at,
            origin,
        })
    }
}

/// Parameters for a single `activities.list` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityQuery {
    pub channel_id: String,
    /// Value of the `part` parameter, e.g. `contentDetails`.
    pub part: &'static str,
    /// Upper bound on the number of items in the page; the API may cap this further.
    pub max_results: u32,
    pub page_token: Option<String>,
}

/// Anything that can answer `activities.list` requests.
///
/// [`YouTubeClient`](crate::youtube_api::YouTubeClient) is the real implementation.
pub trait ActivitySource {
    fn list_activities(
        &self,
        query: &ActivityQuery,
    ) -> impl Future<Output = Result<ActivityListResponse, ListingError>> + Send;
}

/// Which channel to list and how.
#[derive(Debug, Clone)]
pub struct VideoListing {
    pub channel_id: String,
    pub page_size: u32,
    /// Page to start from; `None` starts at the most recent activity.
    pub page_token: Option<String>,
    /// Also request the `snippet` part so that [`VideoRef::title`] is filled in.
    pub include_titles: bool,
}

impl VideoListing {
    pub fn new(channel_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            channel_id: channel_id.into(),
            page_size,
            page_token: None,
            include_titles: false,
        }
    }

    pub fn page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = Some(page_token.into());
        self
    }

    pub fn include_titles(mut self, include_titles: bool) -> Self {
        self.include_titles = include_titles;
        self
    }

    fn part(&self) -> &'static str {
        if self.include_titles {
            "snippet,contentDetails"
        } else {
            "contentDetails"
        }
    }
}

/// Returns a stream of every video uploaded or added to a playlist by a channel.
///
/// Pages are requested one after the other, following `nextPageToken` until the API stops
/// returning one. Activities that don't reference a video are skipped silently. If a request
/// fails, the error is yielded once and the stream ends; videos yielded before that point are
/// still valid.
pub fn list_videos<'a, S>(
    source: &'a S,
    listing: VideoListing,
) -> impl Stream<Item = Result<VideoRef, ListingError>> + 'a
where
    S: ActivitySource + Sync,
{
    let first_page = listing.page_token.clone();
    PagedStream::starting_at(first_page, move |page_token| {
        let query = ActivityQuery {
            channel_id: listing.channel_id.clone(),
            part: listing.part(),
            max_results: listing.page_size,
            page_token,
        };
        async move {
            let page = source.list_activities(&query).await?;
            tracing::debug!(
                channel_id = %query.channel_id,
                page_token = ?query.page_token,
                total_results = page.page_info.total_results,
                results_per_page = page.page_info.results_per_page,
                next_page_token = ?page.next_page_token,
                "fetched activities page"
            );
            let videos: VecDeque<VideoRef> = page
                .items
                .into_iter()
                .filter_map(Activity::into_video_ref)
                .collect();
            Ok((videos, page.next_page_token))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio_stream::StreamExt;

    /// Serves canned pages keyed by page token. A token without a page answers with a 403.
    #[derive(Default)]
    struct FakeSource {
        pages: HashMap<Option<String>, Value>,
        queries: Mutex<Vec<ActivityQuery>>,
    }

    impl FakeSource {
        fn with_page(mut self, token: Option<&str>, page: Value) -> Self {
            self.pages.insert(token.map(str::to_string), page);
            self
        }

        fn queries(&self) -> Vec<ActivityQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl ActivitySource for FakeSource {
        fn list_activities(
            &self,
            query: &ActivityQuery,
        ) -> impl Future<Output = Result<ActivityListResponse, ListingError>> + Send {
            self.queries.lock().unwrap().push(query.clone());
            let result = match self.pages.get(&query.page_token) {
                Some(page) => Ok(serde_json::from_value(page.clone()).unwrap()),
                None => Err(ListingError::Status {
                    status: reqwest::StatusCode::FORBIDDEN,
                    body: "quotaExceeded".to_string(),
                }),
            };
            std::future::ready(result)
        }
    }

    fn page(items: Value, next_page_token: Option<&str>) -> Value {
        let mut page = json!({
            "kind": "youtube#activityListResponse",
            "pageInfo": {"totalResults": 6, "resultsPerPage": 2},
            "items": items,
        });
        if let Some(token) = next_page_token {
            page["nextPageToken"] = json!(token);
        }
        page
    }

    fn upload(video_id: &str) -> Value {
        json!({"id": format!("act-{video_id}"), "contentDetails": {"upload": {"videoId": video_id}}})
    }

    fn playlist_item(video_id: &str) -> Value {
        json!({
            "id": format!("act-{video_id}"),
            "contentDetails": {
                "playlistItem": {
                    "resourceId": {"kind": "youtube#video", "videoId": video_id},
                    "playlistId": "PL123",
                    "playlistItemId": "item"
                }
            }
        })
    }

    async fn collect(
        source: &FakeSource,
        listing: VideoListing,
    ) -> (Vec<VideoRef>, Vec<ListingError>) {
        let mut stream = std::pin::pin!(list_videos(source, listing));
        let mut videos = Vec::new();
        let mut errors = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(video) => videos.push(video),
                Err(e) => errors.push(e),
            }
        }
        (videos, errors)
    }

    fn ids(videos: &[VideoRef]) -> Vec<&str> {
        videos.iter().map(|v| v.id.as_str()).collect()
    }

    #[test]
    fn upload_activity_resolves_to_its_video_id() {
        let activity: Activity = serde_json::from_value(upload("abc")).unwrap();
        let video = activity.into_video_ref().unwrap();
        assert_eq!(video.id, "abc");
        assert_eq!(video.origin, VideoOrigin::Upload);
        assert_eq!(video.title, None);
    }

    #[test]
    fn playlist_item_activity_resolves_to_resource_video_id() {
        let activity: Activity = serde_json::from_value(playlist_item("xyz")).unwrap();
        let video = activity.into_video_ref().unwrap();
        assert_eq!(video.id, "xyz");
        assert_eq!(video.origin, VideoOrigin::PlaylistItem);
    }

    #[test]
    fn other_activities_resolve_to_nothing() {
        for raw in [
            json!({"contentDetails": {"like": {"resourceId": {"kind": "youtube#video", "videoId": "v"}}}}),
            json!({"contentDetails": {"subscription": {"resourceId": {"kind": "youtube#channel", "channelId": "c"}}}}),
            json!({"contentDetails": {}}),
            json!({"id": "no-details"}),
        ] {
            let activity: Activity = serde_json::from_value(raw.clone()).unwrap();
            assert!(activity.into_video_ref().is_none(), "{raw}");
        }
    }

    #[test]
    fn snippet_fills_in_title_and_publish_time() {
        let activity: Activity = serde_json::from_value(json!({
            "snippet": {"title": "Launch day", "publishedAt": "2024-03-01T12:00:00Z"},
            "contentDetails": {"upload": {"videoId": "abc"}}
        }))
        .unwrap();
        let video = activity.into_video_ref().unwrap();
        assert_eq!(video.title.as_deref(), Some("Launch day"));
        assert_eq!(
            video.published_at,
            Some("2024-03-01T12:00:00Z".parse::<Timestamp>().unwrap())
        );
    }

    #[test]
    fn bad_publish_time_does_not_fail_the_activity() {
        let activity: Activity = serde_json::from_value(json!({
            "snippet": {"title": "Odd clock", "publishedAt": "yesterday-ish"},
            "contentDetails": {"upload": {"videoId": "abc"}}
        }))
        .unwrap();
        let video = activity.into_video_ref().unwrap();
        assert_eq!(video.title.as_deref(), Some("Odd clock"));
        assert_eq!(video.published_at, None);

        let activity: Activity = serde_json::from_value(json!({
            "snippet": {"title": "No clock", "publishedAt": null},
            "contentDetails": {"upload": {"videoId": "abc"}}
        }))
        .unwrap();
        assert_eq!(activity.into_video_ref().unwrap().published_at, None);
    }

    #[tokio::test]
    async fn bad_publish_time_does_not_fail_the_page() {
        let source = FakeSource::default().with_page(
            None,
            page(
                json!([
                    {"snippet": {"title": "A", "publishedAt": 17}, "contentDetails": {"upload": {"videoId": "a"}}},
                    upload("b")
                ]),
                None,
            ),
        );

        let (videos, errors) =
            collect(&source, VideoListing::new("UC123", 2).include_titles(true)).await;

        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(ids(&videos), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn three_pages_are_listed_in_order() {
        let source = FakeSource::default()
            .with_page(None, page(json!([upload("a"), playlist_item("b")]), Some("t2")))
            .with_page(Some("t2"), page(json!([upload("c")]), Some("t3")))
            .with_page(Some("t3"), page(json!([playlist_item("d"), upload("e")]), None));

        let (videos, errors) = collect(&source, VideoListing::new("UC123", 2)).await;

        assert!(errors.is_empty());
        assert_eq!(ids(&videos), vec!["a", "b", "c", "d", "e"]);

        let queries = source.queries();
        assert_eq!(
            queries
                .iter()
                .map(|q| q.page_token.as_deref())
                .collect::<Vec<_>>(),
            vec![None, Some("t2"), Some("t3")]
        );
        for query in &queries {
            assert_eq!(query.channel_id, "UC123");
            assert_eq!(query.max_results, 2);
            assert_eq!(query.part, "contentDetails");
        }
    }

    #[tokio::test]
    async fn activities_without_a_video_are_skipped() {
        let source = FakeSource::default().with_page(
            None,
            page(
                json!([
                    upload("a"),
                    {"contentDetails": {"like": {"resourceId": {"kind": "youtube#video", "videoId": "liked"}}}},
                    {"contentDetails": {}},
                    playlist_item("b"),
                ]),
                None,
            ),
        );

        let (videos, errors) = collect(&source, VideoListing::new("UC123", 50)).await;

        assert!(errors.is_empty());
        assert_eq!(ids(&videos), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failure_keeps_earlier_videos_and_is_reported_once() {
        // "t2" has no page, so the second request fails.
        let source =
            FakeSource::default().with_page(None, page(json!([upload("a"), upload("b")]), Some("t2")));

        let (videos, errors) = collect(&source, VideoListing::new("UC123", 50)).await;

        assert_eq!(ids(&videos), vec!["a", "b"]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            ListingError::Status { status, .. } if status == reqwest::StatusCode::FORBIDDEN
        ));
        assert_eq!(source.queries().len(), 2);
    }

    #[tokio::test]
    async fn listing_resumes_from_given_page_token() {
        let source = FakeSource::default().with_page(Some("t9"), page(json!([upload("z")]), None));

        let listing = VideoListing::new("UC123", 10).page_token("t9");
        let (videos, errors) = collect(&source, listing).await;

        assert!(errors.is_empty());
        assert_eq!(ids(&videos), vec!["z"]);
        assert_eq!(source.queries()[0].page_token.as_deref(), Some("t9"));
    }

    #[tokio::test]
    async fn titles_request_the_snippet_part() {
        let source = FakeSource::default().with_page(
            None,
            page(
                json!([{
                    "snippet": {"title": "First"},
                    "contentDetails": {"upload": {"videoId": "a"}}
                }]),
                None,
            ),
        );

        let listing = VideoListing::new("UC123", 5).include_titles(true);
        let (videos, _) = collect(&source, listing).await;

        assert_eq!(source.queries()[0].part, "snippet,contentDetails");
        assert_eq!(videos[0].title.as_deref(), Some("First"));
    }

    #[tokio::test]
    async fn page_without_items_ends_cleanly() {
        let source = FakeSource::default().with_page(
            None,
            json!({"kind": "youtube#activityListResponse", "pageInfo": {"totalResults": 0, "resultsPerPage": 50}}),
        );

        let (videos, errors) = collect(&source, VideoListing::new("UC123", 50)).await;

        assert!(videos.is_empty());
        assert!(errors.is_empty());
    }
}
