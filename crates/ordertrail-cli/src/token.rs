//! Access-token expiry check.
//!
//! Tokens are JWTs; only the `exp` claim of the payload is read. Signatures
//! are not verified — the upstream does that.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;

/// Tokens closer than this to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The `exp` claim of `token`, in seconds since the Unix epoch.
pub fn expires_at(token: &str) -> Option<i64> {
  let payload = token.split('.').nth(1)?;
  let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
  let claims: Value = serde_json::from_slice(&bytes).ok()?;
  let exp = claims.get("exp")?;
  exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))
}

/// Whether `token` decodes and stays valid for at least another minute.
pub fn is_token_valid(token: &str, now_secs: i64) -> bool {
  expires_at(token).is_some_and(|exp| exp > now_secs + EXPIRY_MARGIN_SECS)
}
