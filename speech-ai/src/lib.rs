//! Speech AI abstraction layer for transcript attachment workflows.
//!
//! This crate provides trait-based abstractions for the two remote services the
//! workflow depends on:
//! - Speech-to-text providers that accept an audio URL and call back when done
//! - Video hosts that report metadata, availability and an extractable audio stream
//!
//! Enable the `mock` feature to get `mockall` generated mocks of both traits.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::Error;
pub use types::transcription::{Status, Transcription, Word};
pub use types::video::{AudioLookup, Unavailability, VideoDetails, VideoLookup};
