//! CSRF token port

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Name of the hidden field carrying the token
pub const CSRF_FIELD: &str = "_token";

/// CSRF token manager port
pub trait CsrfTokenManager: Send + Sync {
    /// Token for a form
    fn token(&self, token_id: &str) -> String;

    /// Check a submitted token
    fn is_valid(&self, token_id: &str, value: &str) -> bool;
}

/// Stateless tokens: `hex(HMAC-SHA256(secret, token_id))`
pub struct HmacCsrfTokenManager {
    secret: Vec<u8>,
}

impl HmacCsrfTokenManager {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, token_id: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(token_id.as_bytes());
        mac
    }
}

impl CsrfTokenManager for HmacCsrfTokenManager {
    fn token(&self, token_id: &str) -> String {
        hex::encode(self.mac(token_id).finalize().into_bytes())
    }

    fn is_valid(&self, token_id: &str, value: &str) -> bool {
        match hex::decode(value) {
            Ok(bytes) => self.mac(token_id).verify_slice(&bytes).is_ok(),
            Err(_) => false,
        }
    }
}
