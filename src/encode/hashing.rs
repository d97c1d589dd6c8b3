//! Offline feature-hashing encoder.
//!
//! Identifier sub-tokens (camelCase and snake_case split, lowercased) are
//! hashed with FNV-1a into a fixed number of buckets. Text without any
//! identifier of two or more characters falls back to its raw whitespace
//! tokens, so every input maps to a non-zero vector. Deterministic and
//! dependency-free at runtime; the default backend.

use crate::chunk::{Tokenizer, WhitespaceTokenizer};
use crate::encode::Encoder;
use crate::error::Result;
use crate::preprocess::split_camel_case;

pub struct HashingEncoder {
    dimensions: usize,
}

impl HashingEncoder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0_f32; self.dimensions];
        for feature in features(text) {
            let hash = fnv1a_64(feature.as_bytes());
            let idx = (hash % self.dimensions as u64) as usize;
            vec[idx] += 1.0;
        }
        vec
    }
}

impl Tokenizer for HashingEncoder {
    fn tokenize(&self, text: &str) -> Vec<String> {
        WhitespaceTokenizer.tokenize(text)
    }

    fn detokenize(&self, tokens: &[String]) -> String {
        WhitespaceTokenizer.detokenize(tokens)
    }
}

impl Encoder for HashingEncoder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn fingerprint(&self) -> String {
        format!("hashing:{}", self.dimensions)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

const EMPTY_FEATURE: &str = "<empty>";

fn features(text: &str) -> Vec<String> {
    let identifiers: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .flat_map(split_camel_case)
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() >= 2)
        .collect();
    if !identifiers.is_empty() {
        return identifiers;
    }

    let raw: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    if raw.is_empty() {
        vec![EMPTY_FEATURE.to_string()]
    } else {
        raw
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_split_identifiers() {
        assert_eq!(features("addExpense(expense_item)"), vec!["add", "expense", "expense", "item"]);
    }

    #[test]
    fn shared_vocabulary_lands_in_same_buckets() {
        let enc = HashingEncoder::new(64);
        let a = enc.embed_one("saveExpense");
        let b = enc.embed_one("expense save");
        assert_eq!(a, b);
    }

    #[test]
    fn text_without_identifiers_falls_back_to_raw_tokens() {
        assert_eq!(features("T f();"), vec!["t", "f();"]);
        assert_eq!(features("{ 1, 2, 3 }"), vec!["{", "1,", "2,", "3", "}"]);
        assert_eq!(features("  "), vec![EMPTY_FEATURE]);

        let enc = HashingEncoder::new(16);
        for text in ["{ } ;", "", "T f();"] {
            assert!(enc.embed_one(text).iter().any(|v| *v > 0.0), "{text:?}");
        }
    }

    #[test]
    fn single_letter_interface_is_encoded() {
        use crate::chunk::MethodChunker;
        use crate::domain::SourceFile;
        use crate::encode::TextEncoder;

        let encoder = TextEncoder::new(Box::new(HashingEncoder::new(64)), MethodChunker::new(16));
        let file = SourceFile {
            path: "Fn.java".into(),
            route: "Fn.java".to_string(),
            name: "Fn.java".to_string(),
            content: "interface Fn<T> { T f(); }".to_string(),
        };
        let record = encoder.encode_file(&file).unwrap();
        assert_eq!(record.embeddings.len(), 1);
        assert!((record.embeddings[0].norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn batch_preserves_order_and_width() {
        let enc = HashingEncoder::new(32);
        let out = enc.embed_batch(&["alpha".to_string(), "beta gamma".to_string()]).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.len() == 32));
        assert_eq!(out[0].iter().sum::<f32>(), 1.0);
        assert_eq!(out[1].iter().sum::<f32>(), 2.0);
    }
}
