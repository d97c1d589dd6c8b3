//! Method-level chunking of source files

use crate::domain::Chunk;

pub mod method_chunker;

pub use method_chunker::{extract_method_texts, MethodChunker};

/// Splits text into the units an encoder counts against its budget.
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<String>;
    fn detokenize(&self, tokens: &[String]) -> String;

    fn count_tokens(&self, text: &str) -> usize {
        self.tokenize(text).len()
    }
}

/// Whitespace tokenizer used when a backend does not expose its own vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn detokenize(&self, tokens: &[String]) -> String {
        tokens.join(" ")
    }
}

/// Cut a token sequence into windows of `max_tokens` with a stride of `max_tokens / 2`.
///
/// A sequence within budget comes back as a single window. Otherwise windows are
/// emitted until one reaches the end of the sequence; that last window may be shorter.
pub fn split_tokens(tokens: &[String], max_tokens: usize) -> Vec<&[String]> {
    let max_tokens = max_tokens.max(1);
    if tokens.len() <= max_tokens {
        return vec![tokens];
    }

    let stride = (max_tokens / 2).max(1);
    let mut windows = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + max_tokens).min(tokens.len());
        windows.push(&tokens[start..end]);
        if end == tokens.len() {
            break;
        }
        start += stride;
    }
    windows
}

/// Turn windows back into chunks using the tokenizer's joiner.
pub fn windows_to_chunks<T: Tokenizer + ?Sized>(windows: &[&[String]], tokenizer: &T) -> Vec<Chunk> {
    windows
        .iter()
        .map(|window| Chunk { text: tokenizer.detokenize(window), token_count: window.len() })
        .collect()
}
