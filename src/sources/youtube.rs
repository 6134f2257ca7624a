use async_process::Command;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::{sync::LazyLock, time::Duration};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{SearchHit, SongResolver};
use crate::error::{MusicError, MusicResult};

const YTDLP: &str = "yt-dlp";

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(https?://)?(www\.|m\.)?(youtube\.com/(watch\?v=|embed/|v/|shorts/)|youtu\.be/|music\.youtube\.com/)",
    )
    .expect("static regex")
});

/// Resolves queries by running `yt-dlp` as a subprocess.
pub struct YtDlpResolver {
    timeout: Duration,
    // keeps concurrent yt-dlp processes low to avoid rate limiting
    permits: Semaphore,
}

/// The fields we read from one `--dump-json` line.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: Option<String>,
    title: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
}

impl YtDlpEntry {
    fn into_hit(self) -> Option<SearchHit> {
        let title = self.title?;
        let url = self
            .webpage_url
            .or_else(|| self.url.filter(|u| u.starts_with("http")))
            .or_else(|| self.id.map(|id| format!("https://www.youtube.com/watch?v={id}")))?;
        Some(SearchHit { title, url })
    }
}

impl YtDlpResolver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            permits: Semaphore::new(3),
        }
    }

    pub fn is_youtube_url(query: &str) -> bool {
        YOUTUBE_URL.is_match(query)
    }

    /// Builds the yt-dlp arguments: direct URLs are looked up as-is,
    /// everything else goes through `ytsearch`.
    fn args(query: &str, limit: usize) -> Vec<String> {
        let mut args: Vec<String> = ["--no-playlist", "--dump-json", "--skip-download", "--no-warnings"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if Self::is_youtube_url(query) {
            args.push(query.to_string());
        } else {
            args.push("--flat-playlist".to_string());
            args.push(format!("ytsearch{}:{}", limit.max(1), query));
        }
        args
    }

    /// One JSON object per line; lines that do not parse are skipped.
    fn parse_output(stdout: &str, limit: usize) -> Vec<SearchHit> {
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<YtDlpEntry>(line) {
                Ok(entry) => entry.into_hit(),
                Err(e) => {
                    debug!("Skipping unparsable yt-dlp line: {}", e);
                    None
                }
            })
            .take(limit.max(1))
            .collect()
    }

    async fn run(&self, query: &str, limit: usize) -> MusicResult<String> {
        let _permit = self.permits.acquire().await.map_err(|e| MusicError::Resolve {
            reason: e.to_string(),
        })?;

        let mut command = Command::new(YTDLP);
        command.args(Self::args(query, limit)).kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| MusicError::Resolve {
                reason: format!("search timed out after {}", humantime::format_duration(self.timeout)),
            })?
            .map_err(|e| MusicError::Resolve {
                reason: format!("could not run {YTDLP}: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("❌ yt-dlp failed for '{}': {}", query, stderr.trim());
            return Err(MusicError::Resolve {
                reason: stderr.lines().last().unwrap_or("yt-dlp failed").trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl SongResolver for YtDlpResolver {
    async fn search(&self, query: &str, limit: usize) -> MusicResult<Vec<SearchHit>> {
        info!("🔍 Searching YouTube: {}", query);
        let stdout = self.run(query, limit).await?;
        let hits = Self::parse_output(&stdout, limit);
        debug!("yt-dlp returned {} hits for '{}'", hits.len(), query);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_youtube_url_detection() {
        assert!(YtDlpResolver::is_youtube_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(YtDlpResolver::is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(YtDlpResolver::is_youtube_url(
            "https://music.youtube.com/watch?v=test"
        ));
        assert!(!YtDlpResolver::is_youtube_url("https://example.com/video"));
        assert!(!YtDlpResolver::is_youtube_url("never gonna give you up"));
    }

    #[test]
    fn test_search_args() {
        let args = YtDlpResolver::args("lofi beats", 1);
        assert_eq!(args.last().unwrap(), "ytsearch1:lofi beats");
        assert!(args.contains(&"--flat-playlist".to_string()));

        let url = "https://youtu.be/dQw4w9WgXcQ";
        let args = YtDlpResolver::args(url, 1);
        assert_eq!(args.last().unwrap(), url);
        assert!(!args.contains(&"--flat-playlist".to_string()));
    }

    #[test]
    fn test_parse_flat_search_output() {
        let stdout = concat!(
            r#"{"id":"abc123","title":"First","url":"https://www.youtube.com/watch?v=abc123","duration":212.0}"#,
            "\n",
            "not json\n",
            r#"{"id":"def456","title":"Second"}"#,
            "\n",
        );

        let hits = YtDlpResolver::parse_output(stdout, 5);
        assert_eq!(
            hits,
            vec![
                SearchHit {
                    title: "First".into(),
                    url: "https://www.youtube.com/watch?v=abc123".into(),
                },
                SearchHit {
                    title: "Second".into(),
                    url: "https://www.youtube.com/watch?v=def456".into(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_prefers_webpage_url_and_respects_limit() {
        let stdout = concat!(
            r#"{"id":"a","title":"A","webpage_url":"https://www.youtube.com/watch?v=a","url":"https://rr1.googlevideo.com/stream"}"#,
            "\n",
            r#"{"id":"b","title":"B"}"#,
        );

        let hits = YtDlpResolver::parse_output(stdout, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://www.youtube.com/watch?v=a");
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(YtDlpResolver::parse_output("", 1).is_empty());
        // entries without a title are useless for the queue
        assert!(YtDlpResolver::parse_output(r#"{"id":"x"}"#, 1).is_empty());
    }
}
