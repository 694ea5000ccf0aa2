// Cryptographic utilities for CSRF state tokens and HMAC-signed session tokens

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::{RngCore, TryRngCore};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of entropy in every CSRF state token (256 bits)
pub const STATE_TOKEN_BYTES: usize = 32;

/// Raised when the operating system cannot provide secure randomness
#[derive(Debug, Error)]
#[error("no cryptographically secure random source available: {0}")]
pub struct RandomnessUnavailable(String);

/// Generator for unguessable, URL-safe CSRF state tokens.
///
/// Construction probes the OS random source once; the service refuses to
/// start when it is missing instead of degrading to weaker randomness.
#[derive(Debug, Clone, Copy)]
pub struct StateTokenGenerator {
    _private: (),
}

impl StateTokenGenerator {
    /// Create a generator after confirming the OS CSPRNG works
    ///
    /// # Errors
    ///
    /// Returns an error if the operating system random source fails
    pub fn new() -> Result<Self, RandomnessUnavailable> {
        let mut probe = [0u8; STATE_TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut probe)
            .map_err(|e| RandomnessUnavailable(e.to_string()))?;
        Ok(Self { _private: () })
    }

    /// Generate a fresh state token: 32 random bytes, base64url without padding (43 chars)
    #[must_use]
    pub fn generate(&self) -> String {
        let mut bytes = [0u8; STATE_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// Compare two byte strings without short-circuiting on the first difference
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Sign a message using HMAC-SHA256
///
/// # Errors
///
/// Returns an error if the key is rejected by the HMAC implementation
pub fn hmac_sha256_sign(
    message: &[u8],
    secret: &[u8],
) -> Result<Vec<u8>, hmac::digest::InvalidLength> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify an HMAC-SHA256 signature in constant time
#[must_use]
pub fn hmac_sha256_verify(message: &[u8], signature: &[u8], secret: &[u8]) -> bool {
    match <HmacSha256 as Mac>::new_from_slice(secret) {
        Ok(mut mac) => {
            mac.update(message);
            mac.verify_slice(signature).is_ok()
        }
        Err(_) => false,
    }
}

/// Base64url encode without padding
#[must_use]
pub fn encode_segment(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Base64url decode without padding
///
/// # Errors
///
/// Returns an error if the input is not valid unpadded base64url
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::URL_SAFE_NO_PAD.decode(segment)
}
