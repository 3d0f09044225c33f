use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Number of random bytes behind every state nonce and code verifier.
const RANDOM_BYTES: usize = 32;

fn random_urlsafe() -> String {
    let bytes: [u8; RANDOM_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically random state parameter.
/// 32 random bytes, base64url-encoded without padding (43 chars).
pub fn generate_state() -> String {
    random_urlsafe()
}

/// Generate a cryptographically random PKCE code verifier (RFC 7636).
/// 32 random bytes, base64url-encoded without padding (43 chars).
pub fn generate_code_verifier() -> String {
    random_urlsafe()
}

/// Derive the S256 code challenge from a verifier:
/// SHA-256 of the verifier, base64url-encoded without padding.
pub fn create_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Compare two opaque strings byte for byte without short-circuiting on the
/// first differing byte. No normalization is applied.
pub fn secure_eq(expected: &str, candidate: &str) -> bool {
    let expected = expected.as_bytes();
    let candidate = candidate.as_bytes();

    if expected.len() != candidate.len() {
        return false;
    }

    expected.ct_eq(candidate).into()
}
