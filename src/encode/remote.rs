//! HTTP embedding backends (Ollama and OpenAI-compatible servers).

use crate::chunk::{Tokenizer, WhitespaceTokenizer};
use crate::domain::EncoderConfig;
use crate::encode::Encoder;
use crate::error::{LocalizeError, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteProvider {
    Ollama,
    OpenAi,
}

impl RemoteProvider {
    fn endpoint(self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            RemoteProvider::Ollama => format!("{base}/api/embed"),
            RemoteProvider::OpenAi => format!("{base}/v1/embeddings"),
        }
    }

    fn label(self) -> &'static str {
        match self {
            RemoteProvider::Ollama => "ollama",
            RemoteProvider::OpenAi => "openai",
        }
    }
}

pub struct RemoteEncoder {
    provider: RemoteProvider,
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    batch_size: usize,
}

impl RemoteEncoder {
    pub fn new(provider: RemoteProvider, config: &EncoderConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            provider,
            client,
            url: provider.endpoint(&config.base_url),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            batch_size: config.batch_size.max(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = self.client.post(&self.url);
        let request = match self.provider {
            RemoteProvider::Ollama => request.json(&OllamaEmbedRequest {
                model: &self.model,
                input: texts,
                truncate: true,
            }),
            RemoteProvider::OpenAi => {
                let request = request.json(&OpenAiEmbedRequest { model: &self.model, input: texts });
                match self.api_key.as_deref() {
                    Some(key) => request.bearer_auth(key),
                    None => request,
                }
            }
        };

        let response = request.send()?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(LocalizeError::encoding(
                None,
                format!("{} embed API returned {status}: {body}", self.provider.label()),
            ));
        }

        let vectors = match self.provider {
            RemoteProvider::Ollama => response.json::<OllamaEmbedResponse>()?.embeddings,
            RemoteProvider::OpenAi => {
                response.json::<OpenAiEmbedResponse>()?.data.into_iter().map(|d| d.embedding).collect()
            }
        };
        Ok(vectors)
    }
}

impl Tokenizer for RemoteEncoder {
    fn tokenize(&self, text: &str) -> Vec<String> {
        WhitespaceTokenizer.tokenize(text)
    }

    fn detokenize(&self, tokens: &[String]) -> String {
        WhitespaceTokenizer.detokenize(tokens)
    }
}

impl Encoder for RemoteEncoder {
    fn name(&self) -> &str {
        self.provider.label()
    }

    fn fingerprint(&self) -> String {
        format!("{}:{}", self.provider.label(), self.model)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let mut embedded = self.post_batch(batch).map_err(|e| match e {
                LocalizeError::Http(err) => LocalizeError::encoding(None, err.to_string()),
                other => other,
            })?;
            if embedded.len() != batch.len() {
                return Err(LocalizeError::encoding(
                    None,
                    format!("expected {} embeddings, server returned {}", batch.len(), embedded.len()),
                ));
            }
            vectors.append(&mut embedded);
        }
        tracing::trace!(provider = self.provider.label(), texts = texts.len(), "remote embed done");
        Ok(vectors)
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}
