//! Resolves direct audio stream URLs with the `yt-dlp` command line tool.

use crate::video_id::watch_url;
use log::*;
use speech_ai::{AudioLookup, Error as SpeechAiError, Unavailability};
use tokio::process::Command;

pub struct YtDlpExtractor {
    program: String,
}

impl YtDlpExtractor {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    pub async fn audio_stream(&self, video_id: &str) -> Result<AudioLookup, SpeechAiError> {
        debug!("Resolving audio stream of {video_id} with {}", self.program);

        let output = Command::new(&self.program)
            .args(["-f", "bestaudio", "--get-url", "--no-playlist"])
            .arg(watch_url(video_id))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                error!("Failed to run {}: {:?}", self.program, e);
                SpeechAiError::Configuration(format!("Failed to run {}: {e}", self.program))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            if let Some(reason) = classify_stderr(&stderr) {
                info!("No audio for {video_id}: {reason}");
                return Ok(AudioLookup::Restricted(reason));
            }
            warn!("{} failed for {video_id}: {}", self.program, stderr.trim());
            if stderr.contains("Requested format is not available") {
                return Ok(AudioLookup::NoStream);
            }
            return Err(SpeechAiError::Provider(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(match stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
            Some(url) => AudioLookup::Stream(url.to_string()),
            None => AudioLookup::NoStream,
        })
    }
}

/// Maps the error messages of `yt-dlp` onto the reason a video cannot be used.
pub fn classify_stderr(stderr: &str) -> Option<Unavailability> {
    let stderr = stderr.to_lowercase();
    if stderr.contains("members-only") || stderr.contains("join this channel") {
        Some(Unavailability::MembersOnly)
    } else if stderr.contains("private video") {
        Some(Unavailability::Private)
    } else if stderr.contains("sign in to confirm your age") || stderr.contains("age-restricted") {
        Some(Unavailability::AgeRestricted)
    } else if stderr.contains("available in your country")
        || stderr.contains("geo restriction")
        || stderr.contains("blocked it in your country")
    {
        Some(Unavailability::RegionBlocked)
    } else if stderr.contains("live event will begin") || stderr.contains("is live") {
        Some(Unavailability::Live)
    } else if stderr.contains("video unavailable") || stderr.contains("has been removed") {
        Some(Unavailability::NotFound)
    } else {
        None
    }
}
