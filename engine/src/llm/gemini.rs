//! Gemini LLM Provider
//!
//! Implements `LLMProvider` against the Google Generative Language REST API:
//! `models/{model}:generateContent` for unary calls and
//! `models/{model}:streamGenerateContent?alt=sse` for streaming, where each
//! server-sent `data:` line carries one partial `GenerateContentResponse`.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use super::{Content, GenerationConfig, LLMError, LLMProvider, Result, TextStream};
use crate::config::LLMConfig;

type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Vec<u8>, String>> + Send>>;

pub struct GeminiProvider {
    base_url: String,
    model: String,
    api_key: String,
    system_instruction: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: &LLMConfig, api_key: impl Into<String>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            system_instruction: None,
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Attach a system instruction sent with every request
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn payload(&self, contents: &[Content], config: GenerationConfig) -> serde_json::Value {
        let mut payload = serde_json::Map::new();
        payload.insert("contents".to_string(), json!(contents));
        payload.insert("generationConfig".to_string(), json!(config));

        if let Some(sys) = &self.system_instruction {
            payload.insert(
                "systemInstruction".to_string(),
                json!({ "parts": [{ "text": sys }] }),
            );
        }

        serde_json::Value::Object(payload)
    }

    async fn post(&self, url: &str, payload: &serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), text));
        }

        Ok(response)
    }
}

fn map_status(status: u16, text: String) -> LLMError {
    match status {
        400 | 404 => LLMError::InvalidRequest(text),
        429 => LLMError::RateLimitExceeded,
        401 | 403 => LLMError::AuthenticationFailed(text),
        _ => LLMError::ProviderUnavailable(format!("Gemini API error ({}): {}", status, text)),
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, contents: &[Content], config: GenerationConfig) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        tracing::debug!(
            "Gemini request: model={}, contents={}, max_output_tokens={}",
            self.model,
            contents.len(),
            config.max_output_tokens
        );

        let response = self.post(&url, &self.payload(contents, config)).await?;

        let data: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        if let Some(err) = data.error {
            return Err(LLMError::ProviderUnavailable(err.message));
        }

        if data.candidates.is_empty() {
            return Err(LLMError::ParseError(
                "No candidates in response".to_string(),
            ));
        }

        Ok(data.text())
    }

    async fn generate_stream(
        &self,
        contents: &[Content],
        config: GenerationConfig,
    ) -> Result<TextStream> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );

        tracing::debug!(
            "Gemini stream request: model={}, contents={}, max_output_tokens={}",
            self.model,
            contents.len(),
            config.max_output_tokens
        );

        let response = self.post(&url, &self.payload(contents, config)).await?;

        let bytes: ByteStream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()).map_err(|e| e.to_string())),
        );

        Ok(sse_text_stream(bytes))
    }
}

/// Response body of both endpoints (one per SSE event when streaming)
#[derive(Debug, Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Incremental decoder for `text/event-stream` bodies
///
/// Bytes are buffered until a full line is available so multi-byte
/// characters split across network chunks decode correctly.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed raw bytes, returning the deltas of every completed line
    fn feed(&mut self, bytes: &[u8]) -> Vec<Result<String>> {
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(item) = parse_sse_line(&String::from_utf8_lossy(&line)) {
                out.push(item);
            }
        }
        out
    }

    /// Flush a trailing line that was not newline-terminated
    fn finish(&mut self) -> Vec<Result<String>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_sse_line(&String::from_utf8_lossy(&rest))
            .into_iter()
            .collect()
    }
}

fn parse_sse_line(line: &str) -> Option<Result<String>> {
    let data = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    let event: GenerateContentResponse = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => return Some(Err(LLMError::ParseError(e.to_string()))),
    };

    if let Some(err) = event.error {
        return Some(Err(LLMError::ProviderUnavailable(err.message)));
    }

    let text = event.text();
    if text.is_empty() {
        None
    } else {
        Some(Ok(text))
    }
}

struct SseState {
    bytes: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<Result<String>>,
    done: bool,
}

fn sse_text_stream(bytes: ByteStream) -> TextStream {
    let state = SseState {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => st.pending.extend(st.decoder.feed(&chunk)),
                Some(Err(e)) => {
                    st.done = true;
                    st.pending.push_back(Err(LLMError::NetworkError(e)));
                }
                None => {
                    st.done = true;
                    st.pending.extend(st.decoder.finish());
                }
            }
        }
    }))
}
