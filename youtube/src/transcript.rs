//! Plain-text extraction from `json3` subtitle files.
//!
//! A `json3` document is what YouTube (and yt-dlp with `--sub-format json3`) produces for timed
//! text: a list of events, each holding the text segments shown during that event. Flattening
//! concatenates every segment's text in document order, without adding any separators; the
//! newlines YouTube puts in the segments themselves are all the formatting there is.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A `json3` document is missing its top-level `events` list, or is not JSON at all.
#[derive(Debug, thiserror::Error)]
#[error("malformed transcript document")]
pub struct MalformedDocumentError(#[from] serde_json::Error);

/// Failure to turn one subtitle file into a text file.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("read transcript {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse transcript {}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: MalformedDocumentError,
    },
    #[error("write transcript text to {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Timed text as stored in a `json3` subtitle file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptDocument {
    pub events: Vec<TranscriptEvent>,
}

/// One timed event. Window and style events carry no `segs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptEvent {
    #[serde(default)]
    pub segs: Option<Vec<TranscriptSegment>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(default)]
    pub utf8: Option<String>,
}

impl TranscriptDocument {
    pub fn from_json_str(json: &str) -> Result<Self, MalformedDocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a `json3` file.
    pub async fn from_path(path: &Path) -> Result<Self, TranscriptError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| TranscriptError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&json).map_err(|source| TranscriptError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Concatenates the text of every segment of every event, in order.
pub fn flatten(document: &TranscriptDocument) -> String {
    document
        .events
        .iter()
        .filter_map(|event| event.segs.as_deref())
        .flatten()
        .map(|segment| segment.utf8.as_deref().unwrap_or(""))
        .collect()
}

/// Name of the text file for a subtitle file: the source's file name with its last extension
/// replaced by `txt`, so `talk.en.json3` becomes `talk.en.txt`.
///
/// A name that is nothing but an extension, like `.json3`, becomes `.txt`. A name without any
/// extension gets `.txt` appended.
pub fn output_file_name(source: &Path) -> PathBuf {
    let name = source.file_name().map(Path::new).unwrap_or(source);
    // `Path` sees `.json3` as a stem without an extension.
    let bare_extension = name.extension().is_none()
        && name
            .to_str()
            .is_some_and(|name| name.len() > 1 && name.starts_with('.'));
    if bare_extension {
        return PathBuf::from(".txt");
    }
    name.with_extension("txt")
}

/// Writes `text` to `output_dir`, named after `source_file` (see [`output_file_name`]).
///
/// `output_dir` is created if it does not exist yet. Returns the path that was written.
pub async fn save_transcript_text(
    text: &str,
    source_file: &Path,
    output_dir: &Path,
) -> Result<PathBuf, TranscriptError> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| TranscriptError::Write {
            path: output_dir.to_path_buf(),
            source,
        })?;

    let output = output_dir.join(output_file_name(source_file));
    tokio::fs::write(&output, text)
        .await
        .map_err(|source| TranscriptError::Write {
            path: output.clone(),
            source,
        })?;

    tracing::debug!(path = %output.display(), bytes = text.len(), "saved transcript text");
    Ok(output)
}

/// What happened to a single subtitle file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The text was written to this path.
    Saved(PathBuf),
    /// The document parsed but held no text, so nothing was written.
    Empty,
}

/// Flattens one subtitle file and saves its text into `output_dir`.
pub async fn extract_file(path: &Path, output_dir: &Path) -> Result<Extraction, TranscriptError> {
    let document = TranscriptDocument::from_path(path).await?;
    let text = flatten(&document);
    if text.is_empty() {
        return Ok(Extraction::Empty);
    }
    let saved = save_transcript_text(&text, path, output_dir).await?;
    Ok(Extraction::Saved(saved))
}

/// Runs [`extract_file`] over every path, independently.
///
/// One bad file does not stop the others; each path is paired with its own outcome.
pub async fn extract_all<P>(
    paths: impl IntoIterator<Item = P>,
    output_dir: &Path,
) -> Vec<(PathBuf, Result<Extraction, TranscriptError>)>
where
    P: AsRef<Path>,
{
    let mut outcomes = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let outcome = extract_file(path, output_dir).await;
        if let Err(e) = &outcome {
            tracing::warn!(path = %path.display(), error = %e, "could not extract transcript");
        }
        outcomes.push((path.to_path_buf(), outcome));
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> TranscriptDocument {
        TranscriptDocument::from_json_str(json).unwrap()
    }

    #[test]
    fn segments_are_concatenated_without_separators() {
        let doc = parse(r#"{"events": [{"segs": [{"utf8": "Hello "}]}, {"segs": [{"utf8": "world"}]}]}"#);
        assert_eq!(flatten(&doc), "Hello world");
    }

    #[test]
    fn order_is_event_then_segment() {
        let doc = parse(
            r#"{"events": [
                {"segs": [{"utf8": "a"}, {"utf8": "b"}]},
                {"segs": [{"utf8": "c"}]},
                {"segs": [{"utf8": "d"}, {"utf8": "e"}, {"utf8": "\n"}]}
            ]}"#,
        );
        assert_eq!(flatten(&doc), "abcde\n");
    }

    #[test]
    fn events_without_segs_contribute_nothing() {
        let doc = parse(
            r#"{"wireMagic": "pb3", "events": [
                {"tStartMs": 0, "dDurationMs": 5000, "id": 1, "wpWinPosId": 1},
                {"tStartMs": 0, "segs": [{"utf8": "only"}]},
                {"tStartMs": 10, "segs": null}
            ]}"#,
        );
        assert_eq!(flatten(&doc), "only");
    }

    #[test]
    fn segments_without_text_contribute_nothing() {
        let doc = parse(r#"{"events": [{"segs": [{"utf8": "x"}, {"tOffsetMs": 40}, {"utf8": "y"}]}]}"#);
        assert_eq!(flatten(&doc), "xy");
    }

    #[test]
    fn empty_event_list_flattens_to_empty_string() {
        assert_eq!(flatten(&parse(r#"{"events": []}"#)), "");
    }

    #[test]
    fn missing_events_is_malformed() {
        let err = TranscriptDocument::from_json_str(r#"{"wireMagic": "pb3"}"#).unwrap_err();
        assert!(err.0.to_string().contains("events"), "{err:?}");
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(TranscriptDocument::from_json_str("WEBVTT\n\n00:00.000 --> 00:01.000").is_err());
    }

    #[test]
    fn output_name_strips_only_the_last_extension() {
        assert_eq!(
            output_file_name(Path::new("talk.en.json3")),
            PathBuf::from("talk.en.txt")
        );
        assert_eq!(
            output_file_name(Path::new("subtitles/Some Title [f-tJ0_RFNvc].en.json3")),
            PathBuf::from("Some Title [f-tJ0_RFNvc].en.txt")
        );
        assert_eq!(output_file_name(Path::new("notes")), PathBuf::from("notes.txt"));
        assert_eq!(output_file_name(Path::new(".json3")), PathBuf::from(".txt"));
        assert_eq!(output_file_name(Path::new("subs/.json3")), PathBuf::from(".txt"));
        assert_eq!(output_file_name(Path::new(".hidden.en.json3")), PathBuf::from(".hidden.en.txt"));
    }

    #[tokio::test]
    async fn save_creates_the_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("outputs").join("nested");

        let written = save_transcript_text("hi there", Path::new("subs/talk.en.json3"), &output_dir)
            .await
            .unwrap();

        assert_eq!(written, output_dir.join("talk.en.txt"));
        assert_eq!(std::fs::read_to_string(&written).unwrap(), "hi there");
    }

    #[tokio::test]
    async fn batch_extraction_isolates_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.en.json3");
        let bad = dir.path().join("bad.en.json3");
        let empty = dir.path().join("empty.en.json3");
        let missing = dir.path().join("missing.en.json3");
        std::fs::write(&good, r#"{"events": [{"segs": [{"utf8": "kept"}]}]}"#).unwrap();
        std::fs::write(&bad, r#"{"segs": []}"#).unwrap();
        std::fs::write(&empty, r#"{"events": [{"tStartMs": 0}]}"#).unwrap();
        let output_dir = dir.path().join("outputs");

        let outcomes = extract_all([&bad, &good, &empty, &missing], &output_dir).await;

        assert_eq!(outcomes.len(), 4);
        assert!(matches!(outcomes[0].1, Err(TranscriptError::Malformed { .. })));
        assert_eq!(
            outcomes[1].1.as_ref().unwrap(),
            &Extraction::Saved(output_dir.join("good.en.txt"))
        );
        assert_eq!(outcomes[2].1.as_ref().unwrap(), &Extraction::Empty);
        assert!(matches!(outcomes[3].1, Err(TranscriptError::Read { .. })));

        assert_eq!(
            std::fs::read_to_string(output_dir.join("good.en.txt")).unwrap(),
            "kept"
        );
        assert!(!output_dir.join("empty.en.txt").exists());
    }
}
