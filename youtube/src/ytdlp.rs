//! Subtitle downloads through the `yt-dlp` command line tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Language used when none is requested.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Subtitle format the flattener understands.
pub const SUBTITLE_FORMAT: &str = "json3";

#[derive(Debug, thiserror::Error)]
pub enum YtDlpError {
    #[error("{} is not installed or not in PATH", .program.display())]
    NotInstalled {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("run {}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} {action} exited with {status}: {stderr}", .program.display())]
    Failed {
        program: PathBuf,
        action: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("scan subtitles directory {}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which subtitles to fetch and where to put them.
#[derive(Debug, Clone)]
pub struct SubtitleRequest {
    pub video_ids: Vec<String>,
    /// Language codes such as `en` or `pt-BR`. Empty means [`DEFAULT_LANGUAGE`].
    pub languages: Vec<String>,
    pub subtitles_dir: PathBuf,
    /// Seconds yt-dlp waits between subtitle requests.
    pub sleep_interval: u32,
}

impl SubtitleRequest {
    pub fn new(video_ids: Vec<String>, languages: Vec<String>, subtitles_dir: PathBuf) -> Self {
        Self {
            video_ids,
            languages,
            subtitles_dir,
            sleep_interval: 1,
        }
    }

    /// The requested languages, or [`DEFAULT_LANGUAGE`] if none were given.
    pub fn languages(&self) -> Vec<String> {
        if self.languages.is_empty() {
            vec![DEFAULT_LANGUAGE.to_string()]
        } else {
            self.languages.clone()
        }
    }

    /// Arguments for a yt-dlp run that writes manual and automatic subtitles, and nothing else.
    pub fn args(&self) -> Vec<OsString> {
        let mut home = OsString::from("home:");
        home.push(&self.subtitles_dir);

        let mut args: Vec<OsString> = [
            "--skip-download",
            "--write-subs",
            "--write-auto-subs",
            "--sub-langs",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(self.languages().join(",").into());
        args.push("--sub-format".into());
        args.push(SUBTITLE_FORMAT.into());
        args.push("--sleep-subtitles".into());
        args.push(self.sleep_interval.to_string().into());
        args.push("--paths".into());
        args.push(home);
        // Video ids may start with '-'.
        args.push("--".into());
        args.extend(self.video_ids.iter().map(OsString::from));
        args
    }
}

/// Handle on a `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    /// Uses `program` without checking that it exists.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs `<program> --version` to fail loudly when yt-dlp is missing.
    pub async fn locate(program: impl Into<PathBuf>) -> Result<Self, YtDlpError> {
        let program = program.into();
        let status = tokio::process::Command::new(&program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(Self { program }),
            Ok(status) => Err(YtDlpError::Failed {
                program,
                action: "--version",
                status,
                stderr: String::new(),
            }),
            Err(source) => Err(YtDlpError::NotInstalled { program, source }),
        }
    }

    /// Downloads the requested subtitles and returns the `json3` files that ended up on disk.
    ///
    /// yt-dlp's own progress output is passed through to the terminal. Videos that have no
    /// subtitles in a requested language simply contribute no files.
    #[tracing::instrument(skip(self), fields(program = %self.program.display()))]
    pub async fn download_subtitles(
        &self,
        request: &SubtitleRequest,
    ) -> Result<Vec<PathBuf>, YtDlpError> {
        let status = tokio::process::Command::new(&self.program)
            .args(request.args())
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| YtDlpError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            // yt-dlp exits non-zero when only some videos fail; whatever it did write is
            // still worth extracting.
            tracing::warn!(%status, "yt-dlp reported errors while downloading subtitles");
        }

        let files = find_subtitle_files(
            &request.subtitles_dir,
            &request.video_ids,
            &request.languages(),
        )
        .await?;
        tracing::debug!(files = files.len(), "found downloaded subtitle files");
        Ok(files)
    }

    /// Asks yt-dlp which subtitle and automatic caption languages a video has.
    ///
    /// Returns the table yt-dlp prints.
    #[tracing::instrument(skip(self), fields(program = %self.program.display()))]
    pub async fn list_subtitle_languages(&self, video_id: &str) -> Result<String, YtDlpError> {
        let output = tokio::process::Command::new(&self.program)
            .args(["--skip-download", "--list-subs", "--no-warnings"])
            .arg(video_url(video_id))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| YtDlpError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(YtDlpError::Failed {
                program: self.program.clone(),
                action: "--list-subs",
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Splits a comma separated list of language codes, dropping blanks.
pub fn parse_languages(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

/// Finds subtitle files in `dir` for the given videos and languages.
///
/// A file matches when its name contains the video id and ends in `.<language>.json3`. Results
/// are ordered by video, then language, then file name. A missing directory yields no files.
pub async fn find_subtitle_files(
    dir: &Path,
    video_ids: &[String],
    languages: &[String],
) -> Result<Vec<PathBuf>, YtDlpError> {
    let scan_error = |source| YtDlpError::Scan {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(scan_error(e)),
    };
    while let Some(entry) = entries.next_entry().await.map_err(scan_error)? {
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();

    let mut files = Vec::new();
    for video_id in video_ids {
        for language in languages {
            let suffix = format!(".{language}.{SUBTITLE_FORMAT}");
            files.extend(
                names
                    .iter()
                    .filter(|name| name.contains(video_id.as_str()) && name.ends_with(&suffix))
                    .map(|name| dir.join(name)),
            );
        }
    }
    Ok(files)
}
