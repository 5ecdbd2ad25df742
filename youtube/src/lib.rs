//! Tools for pulling video listings and subtitle text out of YouTube.
//!
//! - [`youtube_api`] lists the videos a channel has published, following the API's pagination.
//! - [`ytdlp`] downloads `json3` subtitle tracks with the `yt-dlp` command line tool.
//! - [`transcript`] flattens those subtitle files into plain text.
//! - [`config`] resolves the settings the binaries pass into all of the above.

pub mod config;
pub mod transcript;
pub mod youtube_api;
pub mod ytdlp;

pub use config::{Config, ConfigOverrides, resolve_config};
pub use transcript::{
    Extraction, MalformedDocumentError, TranscriptDocument, TranscriptError, flatten,
    output_file_name, save_transcript_text,
};
pub use youtube_api::{ListingError, VideoListing, VideoRef, YouTubeClient, list_videos};
pub use ytdlp::{SubtitleRequest, YtDlp, YtDlpError};
