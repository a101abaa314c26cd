//! Content hashing using blake3.

use std::path::Path;

/// Incremental hash over a set of compile inputs.
///
/// Each input contributes its path and its text, length-prefixed so
/// `("ab", "c")` and `("a", "bc")` hash differently.
#[derive(Default)]
pub struct InputHasher {
    hasher: blake3::Hasher,
}

impl InputHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: &Path, text: &str) -> &mut Self {
        let path = path.to_string_lossy();
        self.update_prefixed(path.as_bytes());
        self.update_prefixed(text.as_bytes());
        self
    }

    fn update_prefixed(&mut self, bytes: &[u8]) {
        self.hasher.update(&(bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }

    /// Finish and render as lowercase hex.
    pub fn finish_hex(&self) -> String {
        hex::encode(self.hasher.finalize().as_bytes())
    }
}
