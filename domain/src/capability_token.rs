//! Short lived tokens proving that a video passed validation for a given user.
//!
//! A token is `<issued-at in base 36>-<hex of a truncated HMAC-SHA256>` where the
//! MAC covers the user id, the user's email, the video token and the issue time.
//! Nothing is stored server side; verification recomputes the MAC.

use crate::users;
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of the MAC kept in the token.
const MAC_BYTES: usize = 16;

#[derive(Clone)]
pub struct CapabilityTokenIssuer {
    secret: Vec<u8>,
    ttl: Duration,
}

impl CapabilityTokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    pub fn issue(&self, user: &users::Model, video_id: &str) -> String {
        self.issue_at(user, video_id, Utc::now().timestamp())
    }

    /// Checks a token against the user and video it claims to be for.
    /// Any malformed, expired or mismatching token yields `false`.
    pub fn verify(&self, user: &users::Model, video_id: &str, token: &str) -> bool {
        self.verify_at(user, video_id, token, Utc::now().timestamp())
    }

    fn issue_at(&self, user: &users::Model, video_id: &str, issued_at: i64) -> String {
        let mac = self.mac(user, video_id, issued_at).finalize().into_bytes();
        format!(
            "{}-{}",
            to_base36(issued_at as u64),
            hex::encode(&mac[..MAC_BYTES])
        )
    }

    fn verify_at(&self, user: &users::Model, video_id: &str, token: &str, now: i64) -> bool {
        if video_id.is_empty() || token.is_empty() {
            return false;
        }

        let Some((ts_b36, mac_hex)) = token.split_once('-') else {
            return false;
        };
        let Some(issued_at) = from_base36(ts_b36).and_then(|ts| i64::try_from(ts).ok()) else {
            return false;
        };
        let Ok(provided) = hex::decode(mac_hex) else {
            return false;
        };
        if provided.len() != MAC_BYTES {
            return false;
        }

        if self
            .mac(user, video_id, issued_at)
            .verify_truncated_left(&provided)
            .is_err()
        {
            return false;
        }

        let age = now.saturating_sub(issued_at);
        if age < 0 || age as u64 > self.ttl.as_secs() {
            debug!("Capability token for video {video_id} expired {age}s after issue");
            return false;
        }

        true
    }

    fn mac(&self, user: &users::Model, video_id: &str, issued_at: i64) -> HmacSha256 {
        // HMAC accepts keys of any length, so this cannot fail
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
        mac.update(user.id.as_bytes());
        mac.update(b":");
        mac.update(user.email.as_bytes());
        mac.update(b":");
        mac.update(video_id.as_bytes());
        mac.update(b":");
        mac.update(issued_at.to_string().as_bytes());
        mac
    }
}

impl std::fmt::Debug for CapabilityTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityTokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_owned();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

fn from_base36(value: &str) -> Option<u64> {
    // 13 base 36 digits already overflow u64
    if value.is_empty() || value.len() > 12 {
        return None;
    }
    u64::from_str_radix(value, 36).ok()
}
