//! This module holds typed parameters for various endpoint inputs.
//!
//! Every form and query the editing UI sends is deserialized into one of these
//! structs before a controller hands it to the workflow.

pub(crate) mod notification;
pub(crate) mod transcription;
