//! Byte-pair tokenizer wrapper.

use tiktoken_rs::CoreBPE;

use crate::error::{Result, RetrievalError};

/// Deterministic, stateless token counter and encoder over the `cl100k_base`
/// vocabulary. Safe to share across threads.
pub struct Tokenizer {
    bpe: CoreBPE,
}

impl Tokenizer {
    /// Build a tokenizer over the `cl100k_base` encoding.
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| RetrievalError::Config(format!("tokenizer init failed: {e}")))?;
        Ok(Self { bpe })
    }

    /// Number of tokens `text` encodes to.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Encode `text` to its token id sequence.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_is_deterministic() {
        let tokenizer = Tokenizer::cl100k().unwrap();
        let a = tokenizer.count("The quick brown fox jumps over the lazy dog.");
        let b = tokenizer.count("The quick brown fox jumps over the lazy dog.");
        assert_eq!(a, b);
        assert!(a > 0);
    }

    #[test]
    fn test_empty_text_has_no_tokens() {
        let tokenizer = Tokenizer::cl100k().unwrap();
        assert_eq!(tokenizer.count(""), 0);
        assert!(tokenizer.encode("").is_empty());
    }

    #[test]
    fn test_encode_matches_count() {
        let tokenizer = Tokenizer::cl100k().unwrap();
        let text = "Sectioning splits pages into token-bounded pieces.";
        assert_eq!(tokenizer.encode(text).len(), tokenizer.count(text));
    }
}
