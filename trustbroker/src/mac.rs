// trustbroker/src/mac.rs
//
// Keyed HMAC-SHA256 over the canonical (MAC-less) token serialization.
// Only this fixed algorithm is supported; the tag is hex-lowercase per
// §6.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct MacEngine {
    key: Vec<u8>,
}

impl MacEngine {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    pub fn compute(&self, bytes: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(bytes);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time tag comparison via `hmac::Mac::verify_slice`.
    pub fn verify(&self, bytes: &[u8], tag_hex: &str) -> bool {
        let Ok(tag) = hex::decode(tag_hex) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(bytes);
        mac.verify_slice(&tag).is_ok()
    }
}

impl std::fmt::Debug for MacEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacEngine").field("key", &"<redacted>").finish()
    }
}
