use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::Error;

/// Decode the payload segment of an ID token (JWT) into its claims.
///
/// The signature is NOT verified; the claims are only shown to the user
/// after a login and never used for an authorization decision.
pub fn decode_id_token(id_token: &str) -> Result<serde_json::Value, Error> {
    let payload = id_token.split('.').nth(1).ok_or(Error::MalformedIdToken)?;

    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| Error::MalformedIdToken)?;

    match serde_json::from_slice(&decoded) {
        Ok(claims @ serde_json::Value::Object(_)) => Ok(claims),
        _ => Err(Error::MalformedIdToken),
    }
}
