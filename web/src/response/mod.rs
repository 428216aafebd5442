//! Response bodies of the transcription widget endpoints.

pub(crate) mod transcription;
