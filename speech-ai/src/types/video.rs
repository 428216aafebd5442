//! Types describing remote videos and their audio streams.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a video cannot be transcribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailability {
    NotFound,
    Private,
    AgeRestricted,
    RegionBlocked,
    MembersOnly,
    Live,
}

impl fmt::Display for Unavailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Unavailability::NotFound => "the video does not exist",
            Unavailability::Private => "the video is private",
            Unavailability::AgeRestricted => "the video is age restricted",
            Unavailability::RegionBlocked => "the video is not available in this region",
            Unavailability::MembersOnly => "the video is available to channel members only",
            Unavailability::Live => "the video is a live stream",
        };
        f.write_str(reason)
    }
}

/// Metadata shown to the editor before a transcription is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub id: String,
    pub title: String,
    pub channel_name: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoLookup {
    Available(VideoDetails),
    Unavailable(Unavailability),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioLookup {
    /// Direct URL of an audio-only stream
    Stream(String),
    /// The host refused to hand out a stream
    Restricted(Unavailability),
    NoStream,
}
