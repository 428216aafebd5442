//! Video host trait.

use crate::types::video::{AudioLookup, VideoLookup};
use crate::Error;
use async_trait::async_trait;

/// Abstraction for the site hosting the videos transcripts are made from.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait VideoHost: Send + Sync {
    /// Looks up metadata and availability of a video.
    ///
    /// A missing or unavailable video is a successful lookup returning
    /// [`VideoLookup::Unavailable`]; errors are reserved for failed calls.
    async fn lookup_video(&self, video_id: &str) -> std::result::Result<VideoLookup, Error>;

    /// Resolves a direct URL of the best audio-only stream of a video.
    async fn audio_stream(&self, video_id: &str) -> std::result::Result<AudioLookup, Error>;
}
