//! Anti-replay tokens bound to an action, a user and a 12-hour tick.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of one validity tick. A token is accepted during its own tick and
/// the following one.
pub const NONCE_TICK_SECS: i64 = 43_200;

/// Truncated MAC length in bytes (hex encodes to 20 characters).
const NONCE_BYTES: usize = 10;

#[derive(Clone)]
pub struct NonceIssuer {
    secret: Vec<u8>,
}

impl NonceIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    pub fn create(&self, action: &str, user_id: i64) -> String {
        self.create_at(action, user_id, Utc::now().timestamp())
    }

    pub fn verify(&self, nonce: &str, action: &str, user_id: i64) -> bool {
        self.verify_at(nonce, action, user_id, Utc::now().timestamp())
    }

    fn create_at(&self, action: &str, user_id: i64, now: i64) -> String {
        let digest = self.mac(tick(now), action, user_id).finalize().into_bytes();
        hex::encode(&digest[..NONCE_BYTES])
    }

    fn verify_at(&self, nonce: &str, action: &str, user_id: i64, now: i64) -> bool {
        let Ok(bytes) = hex::decode(nonce.trim()) else {
            return false;
        };
        if bytes.len() != NONCE_BYTES {
            return false;
        }

        let current = tick(now);
        [current, current - 1].into_iter().any(|t| {
            self.mac(t, action, user_id)
                .verify_truncated_left(&bytes)
                .is_ok()
        })
    }

    fn mac(&self, tick: i64, action: &str, user_id: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(format!("{}|{}|{}", tick, action, user_id).as_bytes());
        mac
    }
}

fn tick(now: i64) -> i64 {
    now.div_euclid(NONCE_TICK_SECS)
}
