use clap::{Parser, Subcommand};
use eyre::Context;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_transcripts::transcript::extract_all;
use youtube_transcripts::ytdlp::parse_languages;
use youtube_transcripts::{
    Config, ConfigOverrides, Extraction, SubtitleRequest, YtDlp, resolve_config,
};

/// Download YouTube subtitles and turn them into plain text.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Where yt-dlp writes subtitle files. Falls back to SUBTITLES_DIR, then ./subtitles.
    #[arg(long, global = true)]
    subtitles_dir: Option<PathBuf>,

    /// Where extracted text files go. Falls back to OUTPUTS_DIR, then ./outputs.
    #[arg(long, global = true)]
    outputs_dir: Option<PathBuf>,

    /// File to read settings from.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download subtitles for videos with yt-dlp, then extract their text.
    Download {
        /// Comma separated language codes, e.g. en,fr,es.
        #[arg(short, long, default_value = "en")]
        languages: String,

        /// Only show which subtitle languages each video has.
        #[arg(short, long)]
        check: bool,

        /// yt-dlp executable to run.
        #[arg(long, default_value = "yt-dlp")]
        yt_dlp: PathBuf,

        /// YouTube video ids.
        #[arg(required = true)]
        video_ids: Vec<String>,
    },
    /// Extract the text of subtitle files that are already on disk.
    Extract {
        /// json3 subtitle files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
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
        subtitles_dir: args.subtitles_dir,
        outputs_dir: args.outputs_dir,
        env_path: args.env_file,
        ..ConfigOverrides::default()
    })?;

    match args.command {
        Command::Download {
            languages,
            check,
            yt_dlp,
            video_ids,
        } => {
            let ytdlp = YtDlp::locate(yt_dlp).await.context("find yt-dlp")?;
            if check {
                check_languages(&ytdlp, &video_ids).await
            } else {
                download(&ytdlp, &config, video_ids, parse_languages(&languages)).await
            }
        }
        Command::Extract { files } => {
            extract(&config, files).await;
            Ok(())
        }
    }
}

async fn check_languages(ytdlp: &YtDlp, video_ids: &[String]) -> eyre::Result<()> {
    for video_id in video_ids {
        tracing::info!(%video_id, "checking available subtitle languages");
        match ytdlp.list_subtitle_languages(video_id).await {
            Ok(report) => println!("{report}"),
            Err(e) => tracing::error!(%video_id, error = %e, "could not list subtitles"),
        }
    }
    Ok(())
}

async fn download(
    ytdlp: &YtDlp,
    config: &Config,
    video_ids: Vec<String>,
    languages: Vec<String>,
) -> eyre::Result<()> {
    let request = SubtitleRequest::new(video_ids, languages, config.subtitles_dir.clone());
    tracing::info!(
        videos = request.video_ids.len(),
        languages = %request.languages().join(", "),
        "downloading subtitles"
    );

    let files = ytdlp
        .download_subtitles(&request)
        .await
        .context("download subtitles")?;
    if files.is_empty() {
        tracing::warn!("no subtitle files were downloaded");
        return Ok(());
    }
    tracing::info!(files = files.len(), "downloaded subtitle files");

    extract(config, files).await;
    Ok(())
}

async fn extract(config: &Config, files: Vec<PathBuf>) {
    for (path, outcome) in extract_all(&files, &config.outputs_dir).await {
        match outcome {
            Ok(Extraction::Saved(output)) => {
                println!("{}", output.display());
            }
            Ok(Extraction::Empty) => {
                tracing::warn!(path = %path.display(), "no subtitle text in file");
            }
            // Already logged by extract_all.
            Err(_) => {}
        }
    }
}
