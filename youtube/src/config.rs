//! Runtime configuration shared by the binaries.
//!
//! Every setting is looked up in this order: explicit overrides (command line flags), the
//! process environment, a `.env` file, and finally a built-in default.

use crate::youtube_api::DEFAULT_BASE_URL;
use eyre::{Context, eyre};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_SUBTITLES_DIR: &str = "subtitles";
pub const DEFAULT_OUTPUTS_DIR: &str = "outputs";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub channel_id: Option<String>,
    pub subtitles_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub channel_id: Option<String>,
    pub subtitles_dir: Option<PathBuf>,
    pub outputs_dir: Option<PathBuf>,
    pub env_path: Option<PathBuf>,
}

impl Config {
    /// The API key, which only the listing needs.
    pub fn api_key(&self) -> eyre::Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| eyre!("GOOGLE_API_KEY not set"))
    }

    /// HTTP client for the YouTube API, with the configured request timeout applied.
    pub fn http_client(&self) -> eyre::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().context("build HTTP client")
    }
}

pub fn resolve_config(overrides: ConfigOverrides) -> eyre::Result<Config> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    build_config(&file_vars, env_var_string, overrides)
}

fn build_config(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: ConfigOverrides,
) -> eyre::Result<Config> {
    let lookup = |key: &str| lookup_value(key, file_vars, &env_lookup);

    let request_timeout = match lookup("YOUTUBE_REQUEST_TIMEOUT_SECS") {
        Some(value) => {
            let secs = value
                .parse::<u64>()
                .with_context(|| format!("YOUTUBE_REQUEST_TIMEOUT_SECS is not a number: {value}"))?;
            Some(Duration::from_secs(secs)).filter(|timeout| !timeout.is_zero())
        }
        None => None,
    };

    Ok(Config {
        api_key: lookup("GOOGLE_API_KEY"),
        api_base_url: non_blank(overrides.api_base_url)
            .or_else(|| lookup("YOUTUBE_API_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        channel_id: non_blank(overrides.channel_id).or_else(|| lookup("YOUTUBE_CHANNEL_ID")),
        subtitles_dir: overrides
            .subtitles_dir
            .or_else(|| lookup("SUBTITLES_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SUBTITLES_DIR)),
        outputs_dir: overrides
            .outputs_dir
            .or_else(|| lookup("OUTPUTS_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUTS_DIR)),
        request_timeout,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_var_string(key: &str) -> Option<String> {
    non_blank(std::env::var(key).ok())
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| non_blank(file_vars.get(key).cloned()))
}

/// Reads settings from a dotenv-style file. A missing file holds no settings.
pub fn read_env_file(path: &Path) -> eyre::Result<HashMap<String, String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse_env(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e).with_context(|| format!("read settings from {}", path.display())),
    }
}

/// Collects every `KEY=value` line. Later lines win over earlier ones.
fn parse_env(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(parse_env_line)
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Splits one line into key and value.
///
/// Comments, blank lines, and lines without `=` or without a key yield nothing. A leading
/// `export ` is ignored.
fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then(|| (key, unquote(value.trim())))
}

/// Strips one pair of matching single or double quotes.
fn unquote(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(value)
}
