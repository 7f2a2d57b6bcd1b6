//! Token Authentication
//!
//! Set and get questions carry a shared secret in their token label. The
//! comparison is plain string equality; the secret travels unencrypted in
//! every query name.

use std::fmt;

/// Gatekeeper for set/get questions
#[derive(Clone)]
pub struct TokenAuthenticator {
    secret: String,
}

impl TokenAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Accept only an exact match of the configured secret
    pub fn verify(&self, presented: &str) -> bool {
        presented == self.secret
    }
}

impl fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("secret", &"<redacted>")
            .finish()
    }
}
