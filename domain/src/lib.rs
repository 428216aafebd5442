//! Transcript attachment workflow.
//!
//! Consumers of the `domain` crate do not need to depend on `entity_api` directly:
//! the entity models and id type are re-exported here, and every operation the
//! web layer performs goes through [`TranscriptWorkflow`].

// Re-exports from `entity` crate via `entity_api`
pub use entity_api::{notifications, pages, transcriptions, users, Id};

pub mod capability_token;
pub mod document;
pub mod error;
pub mod gateway;
pub mod notification;
pub mod page;
pub mod phrase;
pub mod receipt;
pub mod reference;
pub mod request;
pub mod transcription;
pub mod user;
pub mod validation;
pub mod video_id;
pub mod webhook;
pub mod workflow;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use workflow::TranscriptWorkflow;
