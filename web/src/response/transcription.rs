use domain::error::ExistingTranscription;
use domain::validation::ValidatedVideo;
use domain::workflow::TranscriptionData;
use domain::Id;
use serde::Serialize;
use utoipa::ToSchema;

const SUCCESS: &str = "success";
const ERROR: &str = "error";

/// Body the transcription widget renders as an inline message.
#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct WidgetResponse {
    pub(crate) class: String,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    /// Capability token to post to `/request_transcription/{token}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) video: Option<VideoSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub(crate) existing_transcription: Option<ExistingTranscription>,
}

impl WidgetResponse {
    pub(crate) fn success(message: Option<String>) -> Self {
        Self {
            class: SUCCESS.to_owned(),
            kind: SUCCESS.to_owned(),
            message,
            token: None,
            video: None,
            existing_transcription: None,
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            class: ERROR.to_owned(),
            kind: ERROR.to_owned(),
            message: Some(message.into()),
            token: None,
            video: None,
            existing_transcription: None,
        }
    }

    pub(crate) fn validated(video: ValidatedVideo) -> Self {
        let message = format!(
            "\"{}\" by {} can be transcribed. Transcription process will take about {}",
            video.details.title,
            video.details.channel_name,
            format_estimate(processing_seconds(video.details.duration_seconds))
        );
        Self {
            token: Some(video.token.clone()),
            video: Some(VideoSummary::from(video)),
            ..Self::success(Some(message))
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct VideoSummary {
    pub(crate) title: String,
    pub(crate) thumbnail_url: Option<String>,
    pub(crate) channel_name: String,
    /// `HH:MM:SS`
    pub(crate) duration: String,
    pub(crate) audio_url: String,
}

impl From<ValidatedVideo> for VideoSummary {
    fn from(video: ValidatedVideo) -> Self {
        Self {
            duration: format_duration(video.details.duration_seconds),
            title: video.details.title,
            thumbnail_url: video.details.thumbnail_url,
            channel_name: video.details.channel_name,
            audio_url: video.audio_url,
        }
    }
}

fn format_duration(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Expected processing time, the speech service works at about 1.25x real time.
fn processing_seconds(audio_seconds: u64) -> u64 {
    audio_seconds * 4 / 5
}

/// `1 hour 2 minutes 5 seconds`, leaving out zero hours and minutes.
fn format_estimate(seconds: u64) -> String {
    let unit = |count: u64, name: &str| {
        format!("{count} {name}{}", if count == 1 { "" } else { "s" })
    };
    let mut parts = Vec::new();
    if seconds >= 3600 {
        parts.push(unit(seconds / 3600, "hour"));
    }
    if seconds % 3600 >= 60 {
        parts.push(unit((seconds % 3600) / 60, "minute"));
    }
    parts.push(unit(seconds % 60, "second"));
    parts.join(" ")
}

/// Transcript record of a video, all `null` for malformed video ids.
#[derive(Debug, Default, Serialize, ToSchema)]
pub(crate) struct TranscriptionDataResponse {
    #[schema(value_type = Option<Uuid>)]
    pub(crate) new_transcription_id: Option<Id>,
    pub(crate) new_transcription_title: Option<String>,
    pub(crate) new_transcription_edit_url: Option<String>,
}

impl From<Option<TranscriptionData>> for TranscriptionDataResponse {
    fn from(data: Option<TranscriptionData>) -> Self {
        match data {
            Some(data) => Self {
                new_transcription_id: Some(data.id),
                new_transcription_title: Some(data.title),
                new_transcription_edit_url: Some(data.edit_url),
            },
            None => Self::default(),
        }
    }
}

/// Acknowledgement returned to the speech service.
#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CallbackResponse {
    #[serde(rename = "type")]
    pub(crate) kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use speech_ai::VideoDetails;
    use serde_json::json;

    #[test]
    fn durations_are_zero_padded() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(3725), "01:02:05");
    }

    #[test]
    fn estimates_scale_the_audio_duration() {
        assert_eq!(processing_seconds(0), 0);
        assert_eq!(processing_seconds(100), 80);
        assert_eq!(processing_seconds(7), 5);
        assert_eq!(format_estimate(80), "1 minute 20 seconds");
        assert_eq!(format_estimate(3661), "1 hour 1 minute 1 second");
        assert_eq!(format_estimate(7200), "2 hours 0 seconds");
    }

    #[test]
    fn validated_videos_announce_the_processing_time() {
        let video = ValidatedVideo {
            details: VideoDetails {
                id: "aaaaaaaaaaa".to_string(),
                title: "Talk".to_string(),
                thumbnail_url: None,
                channel_name: "Channel".to_string(),
                duration_seconds: 300,
            },
            audio_url: "https://audio.example.com/a.m4a".to_string(),
            token: "token".to_string(),
        };

        let body = serde_json::to_value(WidgetResponse::validated(video)).unwrap();

        assert_eq!(body["type"], "success");
        assert_eq!(
            body["message"],
            "\"Talk\" by Channel can be transcribed. Transcription process will take about 4 minutes 0 seconds"
        );
        assert_eq!(body["video"]["duration"], "00:05:00");
        assert_eq!(body["token"], "token");
    }

    #[test]
    fn error_bodies_skip_empty_fields() {
        let body = serde_json::to_value(WidgetResponse::error("nope")).unwrap();
        assert_eq!(
            body,
            json!({"class": "error", "type": "error", "message": "nope"})
        );
    }

    #[test]
    fn malformed_ids_report_all_nulls() {
        let body = serde_json::to_value(TranscriptionDataResponse::from(None)).unwrap();
        assert_eq!(
            body,
            json!({
                "new_transcription_id": null,
                "new_transcription_title": null,
                "new_transcription_edit_url": null
            })
        );
    }
}
