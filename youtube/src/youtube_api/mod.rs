//! YouTube Data API v3 client library.
//!
//! Only what is needed to enumerate a channel's videos is covered: the `activities.list`
//! endpoint, authenticated with an API key.
//!
//! # Activities
//!
//! A channel's activity feed records everything the channel did: uploads, additions to
//! playlists, likes, subscriptions, and so on. Each [`activities::Activity`] carries exactly one
//! payload describing what happened. Uploads and playlist additions point at a video, which
//! [`list_videos`] resolves into a [`VideoRef`]; everything else is skipped.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use youtube_transcripts::youtube_api::{VideoListing, YouTubeClient, list_videos};
//! use tokio_stream::StreamExt;
//!
//! # async fn example() -> eyre::Result<()> {
//! let client = YouTubeClient::new("my-api-key", reqwest::Client::new());
//!
//! let videos = list_videos(&client, VideoListing::new("UCNye-wNBqNL5ZzHSJj3l8Bg", 50));
//! let mut videos = std::pin::pin!(videos);
//! while let Some(video) = videos.next().await {
//!     println!("{}", video?.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod activities;
pub mod client;
pub mod types;

pub use client::{DEFAULT_BASE_URL, YouTubeClient};
pub use types::{PageInfo, PagedStream};

pub use activities::{
    Activity, ActivityContentDetails, ActivityListResponse, ActivityQuery, ActivitySnippet,
    ActivitySource, ListingError, VideoListing, VideoOrigin, VideoRef, list_videos,
};
