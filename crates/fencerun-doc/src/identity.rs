use sha2::{Digest, Sha256};

/// Derive the content-addressed identifier for a block.
///
/// SHA-256 over the language and the normalized content, rendered as
/// lowercase hex. The language is length-prefixed before hashing so two
/// different (language, content) pairs cannot collide by shifting bytes
/// across the field boundary. Two blocks with identical language and
/// normalized content collide by design; that shared identifier is the join
/// key between a run request and its output location.
pub fn identify(language: &str, normalized_content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((language.len() as u64).to_le_bytes());
    hasher.update(language.as_bytes());
    hasher.update(normalized_content.as_bytes());
    let digest = hasher.finalize();
    format!("{digest:x}")
}
