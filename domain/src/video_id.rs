//! The 11 character token identifying a video on the video host.

use crate::error::{Error, TranscriptionErrorKind};
use std::fmt;

pub const VIDEO_ID_LENGTH: usize = 11;

/// A syntactically valid video token: exactly 11 ASCII letters, digits, `_` or `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn parse(value: &str) -> Result<Self, Error> {
        if is_valid(value) {
            Ok(VideoId(value.to_owned()))
        } else {
            Err(Error::transcription(TranscriptionErrorKind::InvalidFormat))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        watch_url(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn is_valid(value: &str) -> bool {
    value.len() == VIDEO_ID_LENGTH
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainErrorKind;

    #[test]
    fn accepts_letters_digits_dash_and_underscore() {
        for token in ["dQw4w9WgXcQ", "aaaaaaaaaaa", "A-_0123456z", "___________"] {
            assert!(VideoId::parse(token).is_ok(), "{token} should be valid");
        }
    }

    #[test]
    fn rejects_everything_else_with_invalid_format() {
        let too_long = "a".repeat(12);
        let candidates = [
            "",
            "short",
            "dQw4w9WgXc",
            too_long.as_str(),
            "dQw4w9WgXc!",
            "dQw4w9 gXcQ",
            "dQw4w9WgXc\n",
            "ääääääääääá",
            "https://you",
            "<script>aaa",
        ];
        for token in candidates {
            let err = VideoId::parse(token).unwrap_err();
            assert_eq!(
                err.error_kind,
                DomainErrorKind::Transcription(TranscriptionErrorKind::InvalidFormat),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn multibyte_strings_of_eleven_chars_are_rejected() {
        // 11 characters but more than 11 bytes
        assert!(!is_valid("éééééééééé1"));
    }

    #[test]
    fn watch_url_points_at_the_video() {
        let video_id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(
            video_id.watch_url(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}
