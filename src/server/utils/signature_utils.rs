use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

pub struct SignatureUtil {
    secret: String,
}

impl SignatureUtil {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// sig is based on: resource path + expiry + secret
    pub fn generate_signature(&self, path: &str, expiry: i64) -> String {
        let message = format!("{}{}", path, expiry);

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");

        mac.update(message.as_bytes());

        hex::encode(mac.finalize().into_bytes())
    }

    /// only checks the signature, expiry is checked on its own so it can get its own error
    pub fn verify_signature(&self, path: &str, expiry: i64, signature: &str) -> bool {
        let expected_signature = self.generate_signature(path, expiry);

        // constant time compare
        signature.len() == expected_signature.len()
            && signature
                .as_bytes()
                .iter()
                .zip(expected_signature.as_bytes().iter())
                .fold(0, |acc, (a, b)| acc | (a ^ b))
                == 0
    }

    /// `?token=..&expires=..` for a relay path, valid for `ttl_secs`
    pub fn sign_query(&self, path: &str, ttl_secs: i64) -> String {
        let expiry = Self::generate_expiry(ttl_secs);
        format!(
            "token={}&expires={}",
            self.generate_signature(path, expiry),
            expiry
        )
    }

    pub fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }

    pub fn generate_expiry(ttl_secs: i64) -> i64 {
        Self::now() + ttl_secs
    }

    pub fn is_expired(expiry: i64) -> bool {
        Self::now() > expiry
    }
}
