//! Content digests for version tokens.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha384, Sha512};

/// Hash algorithm used for content addressing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlg {
    /// SHA-256, 43 base64url characters.
    #[default]
    Sha256,
    /// SHA-384, 64 base64url characters.
    Sha384,
    /// SHA-512, 86 base64url characters.
    Sha512,
}

/// Digest `bytes` and render the result as unpadded base64url.
///
/// The alphabet (`A-Z a-z 0-9 - _`) is exactly the token alphabet, so any
/// prefix of the result is a valid version token.
pub fn digest(alg: HashAlg, bytes: &[u8]) -> String {
    return match alg {
        HashAlg::Sha256 => URL_SAFE_NO_PAD.encode(Sha256::digest(bytes)),
        HashAlg::Sha384 => URL_SAFE_NO_PAD.encode(Sha384::digest(bytes)),
        HashAlg::Sha512 => URL_SAFE_NO_PAD.encode(Sha512::digest(bytes)),
    };
}
