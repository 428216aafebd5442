pub mod transcription;
pub mod video;
