//! Opaque public comment identifiers.
//!
//! Internal rowids are monotonic and leak volume, so every comment also
//! carries a random public id for use in URLs and API payloads.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// Entropy per id; 12 bytes renders as 16 base64url characters.
const PUBLIC_ID_BYTES: usize = 12;

/// Generate a fresh public id.
pub fn new_public_id() -> String {
    let mut bytes = [0u8; PUBLIC_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
