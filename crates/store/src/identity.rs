use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use md5::{Digest, Md5};

/// Length of every identity string (128 bits of base64, without padding).
pub const IDENTITY_LEN: usize = 22;

/// Deterministic identity of a resource origin.
///
/// The MD5 digest of the UTF-8 origin, encoded as url-safe base64 with the
/// trailing `==` dropped. Used as the font registry key and as the filename
/// of the cached copy, so it only contains `[A-Za-z0-9_-]`.
pub fn identity_of(origin: &str) -> String {
    URL_SAFE_NO_PAD.encode(Md5::digest(origin.as_bytes()))
}
