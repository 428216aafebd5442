//! YouTube Data API client used to check that a video exists and may be transcribed.

use crate::error::Error;
use log::*;
use serde::Deserialize;
use speech_ai::{Error as SpeechAiError, Unavailability, VideoDetails, VideoLookup};

#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
pub struct VideoResource {
    pub id: String,
    pub snippet: Snippet,
    #[serde(rename = "contentDetails", default)]
    pub content_details: ContentDetails,
    #[serde(default)]
    pub status: VideoStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub title: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    #[serde(default)]
    pub live_broadcast_content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetails {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub region_restriction: Option<RegionRestriction>,
    #[serde(default)]
    pub content_rating: Option<ContentRating>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegionRestriction {
    pub allowed: Option<Vec<String>>,
    pub blocked: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRating {
    pub yt_rating: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub privacy_status: Option<String>,
}

impl VideoResource {
    /// Classifies the video as seen from `region_code`.
    pub fn into_lookup(self, region_code: Option<&str>) -> VideoLookup {
        if self.status.privacy_status.as_deref() == Some("private") {
            return VideoLookup::Unavailable(Unavailability::Private);
        }
        if matches!(
            self.snippet.live_broadcast_content.as_deref(),
            Some("live") | Some("upcoming")
        ) {
            return VideoLookup::Unavailable(Unavailability::Live);
        }
        if self
            .content_details
            .content_rating
            .as_ref()
            .and_then(|rating| rating.yt_rating.as_deref())
            == Some("ytAgeRestricted")
        {
            return VideoLookup::Unavailable(Unavailability::AgeRestricted);
        }
        if let (Some(region), Some(restriction)) =
            (region_code, &self.content_details.region_restriction)
        {
            if is_region_blocked(restriction, region) {
                return VideoLookup::Unavailable(Unavailability::RegionBlocked);
            }
        }

        let thumbnails = self.snippet.thumbnails;
        VideoLookup::Available(VideoDetails {
            id: self.id,
            title: self.snippet.title,
            channel_name: self.snippet.channel_title,
            thumbnail_url: thumbnails.medium.or(thumbnails.default).map(|t| t.url),
            duration_seconds: self
                .content_details
                .duration
                .as_deref()
                .and_then(parse_duration)
                .unwrap_or_default(),
        })
    }
}

fn is_region_blocked(restriction: &RegionRestriction, region: &str) -> bool {
    if let Some(allowed) = &restriction.allowed {
        if !allowed.iter().any(|r| r.eq_ignore_ascii_case(region)) {
            return true;
        }
    }
    restriction
        .blocked
        .as_ref()
        .is_some_and(|blocked| blocked.iter().any(|r| r.eq_ignore_ascii_case(region)))
}

/// Parses ISO 8601 durations as used by the Data API (`PT1H2M3S`, `P1DT4M`) into seconds.
pub fn parse_duration(value: &str) -> Option<u64> {
    let rest = value.strip_prefix('P')?;
    let mut seconds = 0u64;
    let mut number = String::new();
    let mut in_time = false;

    for c in rest.chars() {
        match c {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' => number.push(c),
            unit => {
                let amount: u64 = number.parse().ok()?;
                number.clear();
                let factor = match (in_time, unit) {
                    (false, 'W') => 7 * 86_400,
                    (false, 'D') => 86_400,
                    (true, 'H') => 3_600,
                    (true, 'M') => 60,
                    (true, 'S') => 1,
                    _ => return None,
                };
                seconds = seconds.checked_add(amount.checked_mul(factor)?)?;
            }
        }
    }

    number.is_empty().then_some(seconds)
}

pub struct YouTubeDataApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    region_code: Option<String>,
}

impl YouTubeDataApiClient {
    pub fn new(api_key: &str, base_url: &str, region_code: Option<&str>) -> Result<Self, Error> {
        let client = reqwest::Client::builder().use_rustls_tls().build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            region_code: region_code.map(str::to_string),
        })
    }

    pub async fn lookup_video(&self, video_id: &str) -> Result<VideoLookup, SpeechAiError> {
        let url = format!("{}/videos", self.base_url);

        debug!("Looking up video {video_id} on the YouTube Data API");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "snippet,contentDetails,status"),
                ("id", video_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach the YouTube Data API: {:?}", e);
                SpeechAiError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("YouTube Data API: {}", error_text);
            return Err(match status {
                reqwest::StatusCode::BAD_REQUEST
                | reqwest::StatusCode::UNAUTHORIZED
                | reqwest::StatusCode::FORBIDDEN => SpeechAiError::Authentication(error_text),
                _ => SpeechAiError::Provider(error_text),
            });
        }

        let videos: VideoListResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse YouTube Data API response: {:?}", e);
            SpeechAiError::Deserialization(e.to_string())
        })?;

        let lookup = match videos.items.into_iter().next() {
            Some(video) => video.into_lookup(self.region_code.as_deref()),
            None => VideoLookup::Unavailable(Unavailability::NotFound),
        };
        debug!("Video {video_id}: {lookup:?}");
        Ok(lookup)
    }
}
