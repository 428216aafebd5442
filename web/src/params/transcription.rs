use domain::request::TranscriptionRequest;
use domain::validation::ValidationRequest;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Form posted by the transcription widget to validate a video.
#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = params::transcription::ValidateParams)]
pub(crate) struct ValidateParams {
    pub(crate) video_id: String,
    /// `namespace:type:id` of the record being edited
    pub(crate) parent_instance_str: String,
    pub(crate) transcription_field: String,
    pub(crate) field_name: String,
}

impl From<ValidateParams> for ValidationRequest {
    fn from(params: ValidateParams) -> Self {
        ValidationRequest {
            video_id: params.video_id,
            parent_instance_str: params.parent_instance_str,
            transcription_field: params.transcription_field,
            field_name: params.field_name,
        }
    }
}

/// Form posted once the editor confirmed a validated video.
#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = params::transcription::RequestParams)]
pub(crate) struct RequestParams {
    pub(crate) video_id: String,
    pub(crate) audio_url: String,
    pub(crate) parent_instance_str: String,
    pub(crate) transcription_field: String,
    pub(crate) field_name: String,
}

impl From<RequestParams> for TranscriptionRequest {
    fn from(params: RequestParams) -> Self {
        TranscriptionRequest {
            video_id: params.video_id,
            audio_url: params.audio_url,
            parent_instance_str: params.parent_instance_str,
            transcription_field: params.transcription_field,
            field_name: params.field_name,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct TranscriptionDataParams {
    #[serde(default)]
    pub(crate) video_id: String,
}
