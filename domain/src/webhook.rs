//! Shared secret authentication of transcription callbacks.
//!
//! The secret is handed to the speech service as a webhook auth header when a
//! job is submitted; the service echoes the header on every callback.

use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Clone)]
pub struct SharedSecretValidator {
    secret: String,
}

impl SharedSecretValidator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Header name and value to register with the speech service.
    pub fn auth_header(&self) -> (String, String) {
        (WEBHOOK_SECRET_HEADER.to_owned(), self.secret.clone())
    }

    /// Compares the presented header value with the secret in constant time.
    pub fn validate(&self, presented: Option<&str>) -> bool {
        let Some(presented) = presented else {
            warn!("Callback without {WEBHOOK_SECRET_HEADER} header");
            return false;
        };

        let (Ok(mut expected), Ok(mut actual)) = (
            HmacSha256::new_from_slice(self.secret.as_bytes()),
            HmacSha256::new_from_slice(self.secret.as_bytes()),
        ) else {
            return false;
        };
        expected.update(self.secret.as_bytes());
        actual.update(presented.as_bytes());

        let valid = actual
            .verify_slice(&expected.finalize().into_bytes())
            .is_ok();
        if !valid {
            warn!("Callback presented a wrong {WEBHOOK_SECRET_HEADER}");
        }
        valid
    }
}

impl std::fmt::Debug for SharedSecretValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretValidator").finish_non_exhaustive()
    }
}
