//! Text encoders producing unit-length embeddings for code and bug reports.
//!
//! A backend implements [`Encoder`] (tokenizer + raw vector generation); the
//! [`TextEncoder`] wraps one backend with the method chunker and owns the
//! normalization and failure policy. A failing chunk fails the whole file:
//! callers never see a partial embedding set.

use crate::chunk::{MethodChunker, Tokenizer};
use crate::domain::{Chunk, Config, EncoderBackend, EncoderConfig, Embedding, FileRecord, SourceFile};
use crate::error::{LocalizeError, Result};

pub mod hashing;
pub mod remote;

pub use hashing::HashingEncoder;
pub use remote::{RemoteEncoder, RemoteProvider};

/// A backend able to turn text into fixed-width vectors.
pub trait Encoder: Tokenizer + Send + Sync {
    fn name(&self) -> &str;

    /// Identifies the vector space; stored vectors are reused only under the same fingerprint.
    fn fingerprint(&self) -> String {
        self.name().to_string()
    }

    /// Raw (unnormalized) vectors, one per input text, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub fn build_encoder(config: &EncoderConfig) -> Result<Box<dyn Encoder>> {
    let encoder: Box<dyn Encoder> = match config.backend {
        EncoderBackend::Hashing => Box::new(HashingEncoder::new(config.dimensions)),
        EncoderBackend::Ollama => Box::new(RemoteEncoder::new(RemoteProvider::Ollama, config)?),
        EncoderBackend::Openai => Box::new(RemoteEncoder::new(RemoteProvider::OpenAi, config)?),
    };
    tracing::debug!(backend = encoder.name(), "encoder ready");
    Ok(encoder)
}

/// Caller-owned encoder: constructed once, passed by reference into the pipeline.
pub struct TextEncoder {
    backend: Box<dyn Encoder>,
    chunker: MethodChunker,
}

impl TextEncoder {
    pub fn new(backend: Box<dyn Encoder>, chunker: MethodChunker) -> Self {
        Self { backend, chunker }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = build_encoder(&config.encoder)?;
        Ok(Self::new(backend, MethodChunker::from_config(&config.chunk)))
    }

    pub fn fingerprint(&self) -> String {
        format!("{}/max{}", self.backend.fingerprint(), self.chunker.max_tokens())
    }

    pub fn chunk_code(&self, source: &str) -> Result<Vec<Chunk>> {
        self.chunker.chunk(source, self.backend.as_ref())
    }

    /// One embedding per method chunk of `source`.
    pub fn encode_code(&self, source: &str) -> Result<Vec<Embedding>> {
        let chunks = self.chunk_code(source)?;
        if chunks.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = chunks.into_iter().map(|c| c.text).collect();
        self.embed_normalized(&texts)
    }

    /// Encode a whole source file into its [`FileRecord`].
    pub fn encode_file(&self, file: &SourceFile) -> Result<FileRecord> {
        let embeddings = self
            .encode_code(&file.content)
            .map_err(|e| e.with_route(&file.route))?
            .into_iter()
            .map(|e| e.owned_by(&file.route))
            .collect();
        Ok(FileRecord::new(file.route.clone(), embeddings))
    }

    /// Exactly one embedding for a bug report, truncated to the token budget.
    pub fn encode_bug_report(&self, text: &str) -> Result<Vec<Embedding>> {
        let tokens = self.backend.tokenize(text);
        let budget = self.chunker.max_tokens();
        let input = if tokens.len() > budget {
            tracing::debug!(tokens = tokens.len(), budget, "truncating bug report");
            self.backend.detokenize(&tokens[..budget])
        } else {
            text.to_string()
        };

        let mut embeddings = self.embed_normalized(&[input])?;
        embeddings.truncate(1);
        Ok(embeddings)
    }

    fn embed_normalized(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let raw = self.backend.embed_batch(texts)?;
        if raw.len() != texts.len() {
            return Err(LocalizeError::encoding(
                None,
                format!("{} returned {} vectors for {} inputs", self.backend.name(), raw.len(), texts.len()),
            ));
        }

        let width = raw.first().map(Vec::len).unwrap_or(0);
        raw.into_iter()
            .map(|mut vector| {
                if vector.len() != width {
                    return Err(LocalizeError::DimensionMismatch {
                        expected: width,
                        actual: vector.len(),
                    });
                }
                l2_normalize(&mut vector)?;
                Ok(Embedding::new(vector))
            })
            .collect()
    }
}

/// Scale `vector` to unit length in place.
///
/// Empty, zero and non-finite vectors are rejected rather than passed on.
pub fn l2_normalize(vector: &mut [f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(LocalizeError::encoding(None, "empty vector"));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(LocalizeError::encoding(None, "non-finite component"));
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return Err(LocalizeError::encoding(None, "zero-norm vector"));
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::WhitespaceTokenizer;

    const SOURCE: &str = r#"
class ExpenseActivity {
    void addExpense(Expense expense) { repository.insert(expense); }
    void deleteExpense(long id) { repository.delete(id); }
}
"#;

    fn encoder() -> TextEncoder {
        TextEncoder::new(Box::new(HashingEncoder::new(256)), MethodChunker::new(512))
    }

    struct FailingEncoder;

    impl Tokenizer for FailingEncoder {
        fn tokenize(&self, text: &str) -> Vec<String> {
            WhitespaceTokenizer.tokenize(text)
        }
        fn detokenize(&self, tokens: &[String]) -> String {
            WhitespaceTokenizer.detokenize(tokens)
        }
    }

    impl Encoder for FailingEncoder {
        fn name(&self) -> &str {
            "failing"
        }
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            // Second input comes back as a zero vector.
            Ok(texts.iter().enumerate().map(|(i, _)| vec![if i == 0 { 1.0 } else { 0.0 }; 4]).collect())
        }
    }

    #[test]
    fn code_embeddings_are_unit_length() {
        let embeddings = encoder().encode_code(SOURCE).unwrap();
        assert_eq!(embeddings.len(), 2);
        for e in &embeddings {
            assert!((e.norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn bug_report_yields_single_embedding() {
        let embeddings = encoder().encode_bug_report("app crashes when adding expense").unwrap();
        assert_eq!(embeddings.len(), 1);
        assert!((embeddings[0].norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = encoder().encode_code(SOURCE).unwrap();
        let b = encoder().encode_code(SOURCE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn one_bad_chunk_fails_the_file() {
        let encoder = TextEncoder::new(Box::new(FailingEncoder), MethodChunker::new(512));
        let file = SourceFile {
            path: "ExpenseActivity.java".into(),
            route: "app/ExpenseActivity.java".to_string(),
            name: "ExpenseActivity.java".to_string(),
            content: SOURCE.to_string(),
        };
        let err = encoder.encode_file(&file).unwrap_err();
        assert!(matches!(
            err,
            LocalizeError::EncodingFailure { route: Some(ref r), .. } if r == "app/ExpenseActivity.java"
        ));
    }

    #[test]
    fn file_without_methods_has_empty_record() {
        let file = SourceFile {
            path: "Keys.java".into(),
            route: "Keys.java".to_string(),
            name: "Keys.java".to_string(),
            content: "interface Keys { String ID = \"id\"; }".to_string(),
        };
        let record = encoder().encode_file(&file).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn normalize_rejects_degenerate_vectors() {
        assert!(l2_normalize(&mut []).is_err());
        assert!(l2_normalize(&mut [0.0, 0.0]).is_err());
        assert!(l2_normalize(&mut [f32::NAN, 1.0]).is_err());

        let mut v = [3.0, 4.0];
        l2_normalize(&mut v).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }
}
