//! Stable content hashing for incremental indexing

use sha2::{Digest, Sha256};

/// Hex SHA-256 of a file's decoded text, used to detect unchanged files.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        assert_eq!(content_hash("class A {}"), content_hash("class A {}"));
        assert_ne!(content_hash("class A {}"), content_hash("class B {}"));
        assert_eq!(content_hash("").len(), 64);
    }
}
