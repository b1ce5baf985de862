// src/video.rs
//
// Duration lookup for externally hosted course videos (YouTube Data API v3).

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Error)]
pub enum VideoLookupError {
    #[error("YOUTUBE_API_KEY is not configured")]
    NotConfigured,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("youtube api error status={status} body={body}")]
    Api { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("video {0} not found")]
    NotFound(String),
    #[error("invalid duration {0:?}")]
    InvalidDuration(String),
}

/// YouTube ids are exactly 11 characters of `[A-Za-z0-9_-]`.
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Extracts the video id from the usual YouTube link shapes. Anything that
/// does not yield a well-formed id is rejected, so the id can be placed in
/// a request URL as is.
pub fn extract_youtube_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let candidate = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" | "music.youtube.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("embed") | Some("shorts") | Some("live") | Some("v") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    }?;

    is_valid_video_id(&candidate).then_some(candidate)
}

/// Parses ISO-8601 durations as returned by the API (`PT1H2M3S`, `P1DT2H`).
pub fn parse_iso8601_duration(raw: &str) -> Option<u32> {
    let rest = raw.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };
    if date_part.is_empty() && time_part.map_or(true, str::is_empty) {
        return None;
    }

    let mut total: u64 = 0;
    total += sum_units(date_part, &[('W', 604_800), ('D', 86_400)])?;
    if let Some(time) = time_part {
        if time.is_empty() {
            return None;
        }
        total += sum_units(time, &[('H', 3_600), ('M', 60), ('S', 1)])?;
    }
    u32::try_from(total).ok()
}

/// Units must appear in the order given and at most once.
fn sum_units(part: &str, units: &[(char, u64)]) -> Option<u64> {
    let mut total = 0u64;
    let mut number = String::new();
    let mut next_unit = 0usize;

    for c in part.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let idx = units[next_unit..].iter().position(|(u, _)| *u == c)? + next_unit;
        if number.is_empty() {
            return None;
        }
        let value: u64 = number.parse().ok()?;
        total = total.checked_add(value.checked_mul(units[idx].1)?)?;
        number.clear();
        next_unit = idx + 1;
    }

    number.is_empty().then_some(total)
}

/// `m:ss` or `h:mm:ss`.
pub fn format_duration(seconds: u32) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

#[derive(Clone)]
pub struct VideoLookup {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl VideoLookup {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: YOUTUBE_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `video_id` must already satisfy [`is_valid_video_id`].
    pub async fn duration_seconds(&self, video_id: &str) -> Result<u32, VideoLookupError> {
        let api_key = self.api_key.as_deref().ok_or(VideoLookupError::NotConfigured)?;

        let resp = self
            .http
            .get(format!("{}/videos", self.base_url))
            .query(&[("part", "contentDetails"), ("id", video_id), ("key", api_key)])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(VideoLookupError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: VideoListResponse = serde_json::from_str(&body)
            .map_err(|e| VideoLookupError::InvalidResponse(format!("{e}; body={body}")))?;
        let item = parsed
            .items
            .into_iter()
            .next()
            .ok_or_else(|| VideoLookupError::NotFound(video_id.to_string()))?;

        parse_iso8601_duration(&item.content_details.duration)
            .ok_or(VideoLookupError::InvalidDuration(item.content_details.duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ids_from_common_links() {
        let id = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(extract_youtube_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(extract_youtube_id("https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ"), id);
        assert_eq!(extract_youtube_id("https://youtu.be/dQw4w9WgXcQ?t=42"), id);
        assert_eq!(extract_youtube_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), id);
        assert_eq!(extract_youtube_id("https://m.youtube.com/shorts/dQw4w9WgXcQ"), id);
    }

    #[test]
    fn rejects_malformed_ids_and_foreign_hosts() {
        assert_eq!(extract_youtube_id("https://youtu.be/short"), None);
        assert_eq!(extract_youtube_id("https://youtu.be/dQw4w9WgXcQ%2F..%2F"), None);
        assert_eq!(extract_youtube_id("https://www.youtube.com/watch?v=abc/../../x"), None);
        assert_eq!(extract_youtube_id("https://vimeo.com/123456789"), None);
        assert_eq!(extract_youtube_id("ftp://youtu.be/dQw4w9WgXcQ"), None);
        assert_eq!(extract_youtube_id("not a url"), None);
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_iso8601_duration("PT4M13S"), Some(253));
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT2H"), Some(7200));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86_401));
        assert_eq!(parse_iso8601_duration("P0D"), Some(0));
    }

    #[test]
    fn rejects_bad_durations() {
        assert_eq!(parse_iso8601_duration(""), None);
        assert_eq!(parse_iso8601_duration("P"), None);
        assert_eq!(parse_iso8601_duration("PT"), None);
        assert_eq!(parse_iso8601_duration("PT5"), None);
        assert_eq!(parse_iso8601_duration("PTM5S"), None);
        assert_eq!(parse_iso8601_duration("PT5S3M"), None);
        assert_eq!(parse_iso8601_duration("4M13S"), None);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(253), "4:13");
        assert_eq!(format_duration(3723), "1:02:03");
    }

    #[tokio::test]
    async fn lookup_without_key_is_not_configured() {
        let lookup = VideoLookup::new(reqwest::Client::new(), None);
        let err = lookup.duration_seconds("dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(err, VideoLookupError::NotConfigured));
        assert_eq!(err.to_string(), "YOUTUBE_API_KEY is not configured");
    }
}
