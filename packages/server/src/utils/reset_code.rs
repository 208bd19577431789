use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Reset codes expire one hour after issuance.
const RESET_CODE_TTL_MS: i64 = 60 * 60 * 1000;

/// Generate a random 6-digit reset code.
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..1_000_000).to_string()
}

/// Hash a reset code for storage as `{user_id}.{timestamp_ms}.{hmac_hex}`.
///
/// The user id and issuance timestamp are embedded so verification can
/// recompute the MAC and enforce expiry without a second column lookup.
pub fn hash_code(user_id: i32, code: &str, issued_at: DateTime<Utc>, secret: &str) -> String {
    let ts = issued_at.timestamp_millis();
    let digest = mac_hex(secret, &format!("{user_id}-{code}-{ts}"));
    format!("{user_id}.{ts}.{digest}")
}

/// Verify a submitted code against the stored hash.
///
/// Rejects codes older than one hour and compares the recomputed MAC in
/// constant time. Returns `false` for any malformed stored value.
pub fn verify_code(code: &str, stored: &str, secret: &str, now: DateTime<Utc>) -> bool {
    let mut parts = stored.splitn(3, '.');
    let (Some(user_id), Some(ts), Some(signature)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Ok(ts_ms) = ts.parse::<i64>() else {
        return false;
    };
    if now.timestamp_millis().saturating_sub(ts_ms) > RESET_CODE_TTL_MS {
        return false;
    }

    let Ok(signature_bytes) = hex::decode(signature) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC takes any key length");
    mac.update(format!("{user_id}-{code}-{ts_ms}").as_bytes());
    mac.verify_slice(&signature_bytes).is_ok()
}

fn mac_hex(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC takes any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
