//! Clients of the remote services the transcription workflow depends on.

pub mod assembly_ai;
pub mod youtube;
pub mod yt_dlp;

use async_trait::async_trait;
use speech_ai::traits::video::VideoHost;
use speech_ai::{AudioLookup, Error as SpeechAiError, VideoLookup};

/// YouTube as a [`VideoHost`]: metadata from the Data API, audio through `yt-dlp`.
pub struct YouTubeVideoHost {
    metadata: youtube::YouTubeDataApiClient,
    extractor: yt_dlp::YtDlpExtractor,
}

impl YouTubeVideoHost {
    pub fn new(metadata: youtube::YouTubeDataApiClient, extractor: yt_dlp::YtDlpExtractor) -> Self {
        Self {
            metadata,
            extractor,
        }
    }
}

#[async_trait]
impl VideoHost for YouTubeVideoHost {
    async fn lookup_video(&self, video_id: &str) -> Result<VideoLookup, SpeechAiError> {
        self.metadata.lookup_video(video_id).await
    }

    async fn audio_stream(&self, video_id: &str) -> Result<AudioLookup, SpeechAiError> {
        self.extractor.audio_stream(video_id).await
    }
}
