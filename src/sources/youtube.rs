use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::{sync::LazyLock, time::Duration};
use tokio::sync::Semaphore;
use tracing::{debug, info};
use url::Url;

use super::TrackResolver;
use crate::audio::queue::Track;

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.|m\.)?(youtube\.com/(watch\?v=|embed/|v/|shorts/)|youtu\.be/|music\.youtube\.com/)")
        .expect("valid YouTube URL pattern")
});

/// Resolver backed by `yt-dlp --dump-json`.
pub struct YouTubeResolver {
    // Limits concurrent yt-dlp processes.
    permits: Semaphore,
}

/// Fields read from one yt-dlp JSON line.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: String,
    duration: Option<f64>,
    uploader: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
}

/// How a query is handed to yt-dlp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Direct(String),
    Search(String),
}

impl Lookup {
    pub fn from_query(query: &str) -> Self {
        let query = query.trim();
        if is_youtube_url(query) || is_http_url(query) {
            Self::Direct(query.to_string())
        } else {
            Self::Search(query.to_string())
        }
    }

    fn argument(&self) -> String {
        match self {
            Self::Direct(url) => url.clone(),
            Self::Search(text) => format!("ytsearch1:{text}"),
        }
    }
}

pub fn is_youtube_url(url: &str) -> bool {
    YOUTUBE_URL.is_match(url)
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

impl YouTubeResolver {
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(3),
        }
    }

    async fn dump_json(&self, argument: &str) -> Result<String> {
        let _permit = self.permits.acquire().await?;

        let output = Command::new("yt-dlp")
            .args([
                "--no-playlist",
                "--dump-json",
                "--skip-download",
                "--no-warnings",
                "-f",
                "bestaudio/best",
                argument,
            ])
            .output()
            .await
            .context("running yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for YouTubeResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a track from the first JSON line of yt-dlp output.
fn parse_first_result(stdout: &str, lookup: &Lookup, requested_by: &str) -> Result<Option<Track>> {
    let Some(line) = stdout.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return Ok(None);
    };

    let info: YtDlpInfo = serde_json::from_str(line).context("parsing yt-dlp output")?;

    let source_ref = match (info.webpage_url, lookup) {
        (Some(page), _) => page,
        (None, Lookup::Direct(url)) => url.clone(),
        (None, Lookup::Search(_)) => match info.url {
            Some(url) => url,
            None => return Ok(None),
        },
    };

    let mut track = Track::new(info.title, source_ref, requested_by);
    if let Some(artist) = info.uploader {
        track = track.with_artist(artist);
    }
    if let Some(duration) = info.duration.filter(|d| d.is_finite() && *d >= 0.0) {
        track = track.with_duration(Duration::from_secs_f64(duration));
    }
    if let Some(thumbnail) = info.thumbnail {
        track = track.with_thumbnail(thumbnail);
    }

    Ok(Some(track))
}

#[async_trait]
impl TrackResolver for YouTubeResolver {
    async fn resolve(&self, query: &str, requested_by: &str) -> Result<Option<Track>> {
        let lookup = Lookup::from_query(query);
        match &lookup {
            Lookup::Direct(url) => debug!("📊 Fetching info for {}", url),
            Lookup::Search(text) => info!("🔍 Searching YouTube: {}", text),
        }

        let stdout = self.dump_json(&lookup.argument()).await?;
        parse_first_result(&stdout, &lookup, requested_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_youtube_url_detection() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://music.youtube.com/watch?v=test"));
        assert!(is_youtube_url("youtube.com/shorts/abc"));
        assert!(!is_youtube_url("https://example.com/video"));
    }

    #[test]
    fn test_lookup_from_query() {
        assert_eq!(
            Lookup::from_query(" https://youtu.be/x "),
            Lookup::Direct("https://youtu.be/x".into())
        );
        assert_eq!(
            Lookup::from_query("https://cdn.example.com/song.mp3"),
            Lookup::Direct("https://cdn.example.com/song.mp3".into())
        );
        assert_eq!(
            Lookup::from_query("never gonna give you up"),
            Lookup::Search("never gonna give you up".into())
        );
        assert_eq!(Lookup::from_query("ftp://host/file").argument(), "ytsearch1:ftp://host/file");
    }

    #[test]
    fn test_parse_first_result() {
        let stdout = concat!(
            r#"{"title":"Song","duration":212.0,"uploader":"Band","thumbnail":"https://i.ytimg.com/t.jpg","webpage_url":"https://www.youtube.com/watch?v=abc"}"#,
            "\n",
            r#"{"title":"Other","webpage_url":"https://www.youtube.com/watch?v=def"}"#,
        );
        let lookup = Lookup::Search("song".into());

        let track = parse_first_result(stdout, &lookup, "<@5>").unwrap().unwrap();

        assert_eq!(track.title, "Song");
        assert_eq!(track.source_ref, "https://www.youtube.com/watch?v=abc");
        assert_eq!(track.requested_by, "<@5>");
        assert_eq!(track.artist.as_deref(), Some("Band"));
        assert_eq!(track.duration, Some(Duration::from_secs(212)));
    }

    #[test]
    fn test_empty_output_is_no_result() {
        let lookup = Lookup::Search("zzzz".into());
        assert!(parse_first_result("\n", &lookup, "<@5>").unwrap().is_none());
    }

    #[test]
    fn test_direct_lookup_falls_back_to_query_url() {
        let lookup = Lookup::Direct("https://cdn.example.com/a.mp3".into());
        let track = parse_first_result(r#"{"title":"a"}"#, &lookup, "<@5>")
            .unwrap()
            .unwrap();
        assert_eq!(track.source_ref, "https://cdn.example.com/a.mp3");
    }
}
