//! Plain-language summarization through a chat-completion service.
//!
//! The pipeline only depends on the [`Summarizer`] trait. [`summarize`]
//! applies the caller-side contract before the service is invoked:
//!
//! - an unconfigured summarizer fails with [`SummaryError::Unconfigured`];
//! - blank input short-circuits to [`NOTHING_TO_SUMMARIZE`] without a call;
//! - input longer than `max_input_chars` is cut there and
//!   [`TRUNCATION_MARKER`] is appended;
//! - blank service output is [`SummaryError::EmptyResult`].
//!
//! [`summarize_best_effort`] turns all of that into a [`SummaryOutcome`]
//! that is consumed unconditionally: failures become [`PLACEHOLDER_SUMMARY`].
//!
//! # Providers
//!
//! [`create_summarizer`] picks an implementation from [`SummaryConfig`]:
//! `"disabled"`, or a missing API key, yields a [`DisabledSummarizer`];
//! `"groq"` and `"openai"` yield a [`ChatSummarizer`] against the
//! provider's OpenAI-compatible `chat/completions` endpoint.
//!
//! # Retry Strategy
//!
//! With `max_retries = 0` (the default) a failed call is reported at once.
//! Otherwise HTTP 429, 5xx and network errors are retried with exponential
//! backoff (1s, 2s, 4s, ... capped at 32s); other 4xx fail immediately.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SummaryConfig;
use crate::error::SummaryError;

/// Stored in place of a summary when summarization fails.
pub const PLACEHOLDER_SUMMARY: &str = "Summary generation unavailable";

/// Returned for blank input without calling the service.
pub const NOTHING_TO_SUMMARIZE: &str = "No content to summarize";

/// Appended to input cut at the length threshold.
pub const TRUNCATION_MARKER: &str = "...";

/// Default input length threshold, in characters.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 10_000;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert at creating clear, simple summaries \
for people with dyslexia. Use plain English and short sentences.";

/// Instruction placed before the text in the user message.
const USER_PROMPT: &str = "Please create a clear, simple summary of the following text.
Make it dyslexia-friendly by using:
- Short, simple sentences
- Common, everyday words
- Clear structure with main points
- No jargon or complex terms
- Maximum 3-4 paragraphs

Text to summarize:
";

/// A short plain-language summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary(String);

impl Summary {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Result of a best-effort summarization attempt.
#[derive(Debug)]
pub enum SummaryOutcome {
    Generated(Summary),
    Unavailable(SummaryError),
}

impl SummaryOutcome {
    /// The text to persist: the summary, or the placeholder.
    pub fn text(&self) -> &str {
        match self {
            SummaryOutcome::Generated(summary) => summary.as_str(),
            SummaryOutcome::Unavailable(_) => PLACEHOLDER_SUMMARY,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, SummaryOutcome::Generated(_))
    }
}

/// A black-box summarization service.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Identifier for logs (e.g. `"groq:llama-3.3-70b-versatile"`).
    fn name(&self) -> &str;

    /// Input length threshold in characters.
    fn max_input_chars(&self) -> usize {
        DEFAULT_MAX_INPUT_CHARS
    }

    /// `Err(Unconfigured)` when the service cannot be used at all.
    fn ensure_configured(&self) -> Result<(), SummaryError> {
        Ok(())
    }

    /// Send already-prepared text to the service and return its raw answer.
    async fn complete(&self, text: &str) -> Result<String, SummaryError>;
}

/// Truncate `text` to `max_chars` characters, appending [`TRUNCATION_MARKER`].
pub fn prepare_input(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Summarize `text`, applying the input policy described in the module docs.
pub async fn summarize(summarizer: &dyn Summarizer, text: &str) -> Result<Summary, SummaryError> {
    summarizer.ensure_configured()?;

    if text.trim().is_empty() {
        return Ok(Summary::new(NOTHING_TO_SUMMARIZE));
    }

    let input = prepare_input(text, summarizer.max_input_chars());
    let answer = summarizer.complete(&input).await?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(SummaryError::EmptyResult);
    }
    Ok(Summary::new(answer))
}

/// Like [`summarize`], but never fails: errors are logged and wrapped.
pub async fn summarize_best_effort(summarizer: &dyn Summarizer, text: &str) -> SummaryOutcome {
    match summarize(summarizer, text).await {
        Ok(summary) => SummaryOutcome::Generated(summary),
        Err(err) => {
            warn!(summarizer = summarizer.name(), error = %err, "summary generation failed");
            SummaryOutcome::Unavailable(err)
        }
    }
}

/// Build the summarizer selected by `config`.
///
/// The API key is read from the environment here, once.
pub fn create_summarizer(config: &SummaryConfig) -> Box<dyn Summarizer> {
    if !config.is_enabled() {
        return Box::new(DisabledSummarizer::new("summary provider is disabled"));
    }

    let var = config.api_key_var();
    let api_key = match std::env::var(&var) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            warn!(provider = %config.provider, env = %var, "summary API key not found");
            return Box::new(DisabledSummarizer::new(format!(
                "{} environment variable not set",
                var
            )));
        }
    };

    match ChatSummarizer::new(config, api_key) {
        Ok(summarizer) => Box::new(summarizer),
        Err(e) => Box::new(DisabledSummarizer::new(format!(
            "failed to build HTTP client: {}",
            e
        ))),
    }
}

// ============ Disabled ============

/// Always reports [`SummaryError::Unconfigured`] with a fixed reason.
pub struct DisabledSummarizer {
    reason: String,
}

impl DisabledSummarizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Summarizer for DisabledSummarizer {
    fn name(&self) -> &str {
        "disabled"
    }

    fn ensure_configured(&self) -> Result<(), SummaryError> {
        Err(SummaryError::Unconfigured(self.reason.clone()))
    }

    async fn complete(&self, _text: &str) -> Result<String, SummaryError> {
        Err(SummaryError::Unconfigured(self.reason.clone()))
    }
}

// ============ Chat completions ============

/// Summarizer backed by an OpenAI-compatible `chat/completions` endpoint.
pub struct ChatSummarizer {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
    max_input_chars: usize,
    max_retries: u32,
}

impl ChatSummarizer {
    pub fn new(config: &SummaryConfig, api_key: String) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            name: format!("{}:{}", config.provider, config.model),
            client,
            endpoint: format!("{}/chat/completions", config.endpoint_base()),
            api_key,
            model: config.model.clone(),
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_input_chars: config.max_input_chars,
            max_retries: config.max_retries,
        })
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": format!("{}{}", USER_PROMPT, text) },
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        })
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    async fn complete(&self, text: &str) -> Result<String, SummaryError> {
        let body = self.request_body(text);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!(attempt, delay_secs = delay.as_secs(), "retrying summary request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| SummaryError::UpstreamFailure(e.to_string()))?;
                        return parse_chat_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = SummaryError::UpstreamFailure(format!(
                        "API error {}: {}",
                        status, body_text
                    ));
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(SummaryError::UpstreamFailure(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| SummaryError::UpstreamFailure("summary failed after retries".into())))
    }
}

/// Pull `choices[0].message.content` out of a chat-completion response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String, SummaryError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or(SummaryError::EmptyResult)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        answer: Result<&'static str, &'static str>,
        calls: AtomicUsize,
        seen: std::sync::Mutex<Option<String>>,
        max_chars: usize,
    }

    impl Scripted {
        fn new(answer: Result<&'static str, &'static str>) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
                seen: std::sync::Mutex::new(None),
                max_chars: DEFAULT_MAX_INPUT_CHARS,
            }
        }
    }

    #[async_trait]
    impl Summarizer for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn max_input_chars(&self) -> usize {
            self.max_chars
        }

        async fn complete(&self, text: &str) -> Result<String, SummaryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = Some(text.to_string());
            self.answer
                .map(str::to_string)
                .map_err(|e| SummaryError::UpstreamFailure(e.to_string()))
        }
    }

    #[test]
    fn prepare_input_keeps_short_text() {
        assert_eq!(prepare_input("short", 10), "short");
        assert_eq!(prepare_input("exactly10!", 10), "exactly10!");
    }

    #[test]
    fn prepare_input_truncates_on_char_boundary() {
        assert_eq!(prepare_input("ééééé", 3), "ééé...");
        let long = "a".repeat(DEFAULT_MAX_INPUT_CHARS + 50);
        let prepared = prepare_input(&long, DEFAULT_MAX_INPUT_CHARS);
        assert_eq!(prepared.len(), DEFAULT_MAX_INPUT_CHARS + TRUNCATION_MARKER.len());
        assert!(prepared.ends_with(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn blank_input_short_circuits_without_calling_service() {
        let service = Scripted::new(Ok("unused"));
        let summary = summarize(&service, "  \n ").await.unwrap();
        assert_eq!(summary.as_str(), NOTHING_TO_SUMMARIZE);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn long_input_is_truncated_before_sending() {
        let mut service = Scripted::new(Ok("A short summary."));
        service.max_chars = 5;
        let summary = summarize(&service, "abcdefghij").await.unwrap();
        assert_eq!(summary.as_str(), "A short summary.");
        assert_eq!(service.seen.lock().unwrap().as_deref(), Some("abcde..."));
    }

    #[tokio::test]
    async fn blank_answer_is_empty_result() {
        let service = Scripted::new(Ok("   "));
        let err = summarize(&service, "text").await.unwrap_err();
        assert!(matches!(err, SummaryError::EmptyResult));
    }

    #[tokio::test]
    async fn disabled_summarizer_is_unconfigured_even_for_blank_input() {
        let service = DisabledSummarizer::new("no key");
        let err = summarize(&service, "").await.unwrap_err();
        assert!(matches!(err, SummaryError::Unconfigured(ref r) if r == "no key"));
    }

    #[tokio::test]
    async fn best_effort_substitutes_placeholder() {
        let service = Scripted::new(Err("boom"));
        let outcome = summarize_best_effort(&service, "text").await;
        assert!(!outcome.is_generated());
        assert_eq!(outcome.text(), PLACEHOLDER_SUMMARY);

        let ok = Scripted::new(Ok("  Fine.  "));
        let outcome = summarize_best_effort(&ok, "text").await;
        assert!(outcome.is_generated());
        assert_eq!(outcome.text(), "Fine.");
    }

    #[test]
    fn disabled_provider_builds_disabled_summarizer() {
        let config = SummaryConfig {
            provider: "disabled".to_string(),
            ..SummaryConfig::default()
        };
        let summarizer = create_summarizer(&config);
        assert_eq!(summarizer.name(), "disabled");
        assert!(matches!(
            summarizer.ensure_configured(),
            Err(SummaryError::Unconfigured(_))
        ));
    }

    #[test]
    fn missing_api_key_builds_disabled_summarizer() {
        let config = SummaryConfig {
            api_key_env: Some("DYSLEXIFY_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            ..SummaryConfig::default()
        };
        let summarizer = create_summarizer(&config);
        match summarizer.ensure_configured() {
            Err(SummaryError::Unconfigured(reason)) => {
                assert!(reason.contains("DYSLEXIFY_TEST_KEY_THAT_IS_NEVER_SET"))
            }
            other => panic!("expected unconfigured, got {other:?}"),
        }
    }

    #[test]
    fn request_body_carries_prompt_and_limits() {
        let summarizer =
            ChatSummarizer::new(&SummaryConfig::default(), "key".to_string()).unwrap();
        let body = summarizer.request_body("Some text");
        assert_eq!(body["model"], "llama-3.3-70b-versatile");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.starts_with("Please create a clear, simple summary"));
        assert!(user.ends_with("Text to summarize:\nSome text"));
        assert_eq!(summarizer.endpoint, "https://api.groq.com/openai/v1/chat/completions");
    }

    #[tokio::test]
    async fn silent_endpoint_hits_request_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let config = SummaryConfig {
            base_url: Some(format!("http://{}/v1", addr)),
            timeout_secs: 1,
            ..SummaryConfig::default()
        };
        let summarizer = ChatSummarizer::new(&config, "key".to_string()).unwrap();
        let started = std::time::Instant::now();
        let err = summarize(&summarizer, "Some text").await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(err, SummaryError::UpstreamFailure(_)), "{err:?}");
        server.abort();
    }

    #[test]
    fn parses_chat_completion_content() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "Simple words." } }]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "Simple words.");

        let empty = serde_json::json!({ "choices": [] });
        assert!(matches!(
            parse_chat_response(&empty),
            Err(SummaryError::EmptyResult)
        ));
    }
}
