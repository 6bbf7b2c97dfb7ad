use sha2::{Digest, Sha256};
use std::path::Path;
use xxhash_rust::xxh3::xxh3_128;

/// Compute a hash of a file's contents for the per-file component of folder digests
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let content = std::fs::read(path)?;
    Ok(hash_bytes(&content))
}

/// XXH3-128 of raw bytes as 32 lowercase hex chars
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:032x}", xxh3_128(data))
}

/// SHA-256 of a string
///
/// Returns a 64-character lowercase hex string.
pub fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
