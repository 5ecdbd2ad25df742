use clap::Parser;
use eyre::{Context, eyre};
use std::io::IsTerminal;
use std::path::PathBuf;
use tokio_stream::StreamExt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_transcripts::youtube_api::VideoOrigin;
use youtube_transcripts::{
    ConfigOverrides, VideoListing, VideoRef, YouTubeClient, list_videos, resolve_config,
};

/// List every video a YouTube channel has uploaded or added to a playlist.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Channel to list. Falls back to YOUTUBE_CHANNEL_ID.
    #[arg(long)]
    channel_id: Option<String>,

    /// Activities requested per page. YouTube caps this at 50.
    #[arg(long, default_value_t = 50)]
    page_size: u32,

    /// Resume listing from this page token.
    #[arg(long)]
    page_token: Option<String>,

    /// Also print each video's title.
    #[arg(long)]
    titles: bool,

    /// Root of the YouTube Data API. Falls back to YOUTUBE_API_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// File to read GOOGLE_API_KEY and friends from.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let args = Args::parse();
    let config = resolve_config(ConfigOverrides {
        api_base_url: args.base_url,
        channel_id: args.channel_id,
        env_path: args.env_file,
        ..ConfigOverrides::default()
    })?;

    let channel_id = config
        .channel_id
        .clone()
        .ok_or_else(|| eyre!("no channel given; pass --channel-id or set YOUTUBE_CHANNEL_ID"))?;
    let client = YouTubeClient::new(config.api_key()?, config.http_client()?)
        .with_base_url(&config.api_base_url);

    let mut listing = VideoListing::new(&channel_id, args.page_size).include_titles(args.titles);
    if let Some(token) = args.page_token {
        listing = listing.page_token(token);
    }

    tracing::info!(%channel_id, page_size = args.page_size, "listing channel videos");

    let videos = list_videos(&client, listing);
    let mut videos = std::pin::pin!(videos);
    let mut count = 0usize;
    while let Some(video) = videos.next().await {
        // Whatever was printed before a failure stands; the error is reported once below.
        let video = video.with_context(|| {
            format!("list videos of channel {channel_id} (after {count} videos)")
        })?;
        println!("{}", video_line(&video, args.titles));
        count += 1;
    }

    tracing::info!(count, "listed all channel videos");
    Ok(())
}

/// `videoId (u): <id>` for uploads, `videoId (p): <id>` for playlist items, then a tab and the
/// title if asked for and known.
fn video_line(video: &VideoRef, with_title: bool) -> String {
    let tag = match video.origin {
        VideoOrigin::Upload => "u",
        VideoOrigin::PlaylistItem => "p",
    };
    match video.title.as_deref().filter(|_| with_title) {
        Some(title) => format!("videoId ({tag}): {}\t{title}", video.id),
        None => format!("videoId ({tag}): {}", video.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn video(id: &str, title: Option<&str>, origin: VideoOrigin) -> VideoRef {
        VideoRef {
            id: id.to_string(),
            title: title.map(str::to_string),
            published_at: None,
            origin,
        }
    }

    #[test]
    fn lines_are_tagged_by_origin() {
        assert_eq!(
            video_line(&video("abc", None, VideoOrigin::Upload), false),
            "videoId (u): abc"
        );
        assert_eq!(
            video_line(&video("def", None, VideoOrigin::PlaylistItem), false),
            "videoId (p): def"
        );
    }

    #[test]
    fn titles_follow_a_tab_only_when_asked_for() {
        let titled = video("abc", Some("Launch day"), VideoOrigin::Upload);
        assert_eq!(video_line(&titled, true), "videoId (u): abc\tLaunch day");
        assert_eq!(video_line(&titled, false), "videoId (u): abc");
        assert_eq!(
            video_line(&video("def", None, VideoOrigin::PlaylistItem), true),
            "videoId (p): def"
        );
    }
}
