//! OpenAI-compatible HTTP client
//!
//! Implements the remote collaborators: batched embeddings, per-review aspect
//! extraction and the narrative summarizer. All requests share one client-side
//! rate limiter; concurrency across batches is bounded by the caller.

use super::collaborators::{AspectExtractor, Embedder, SummarizeOutcome, Summarizer};
use crate::models::{ReviewAspects, StatsSummary};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4.1-2025-04-14";
const DEFAULT_REQUESTS_PER_SECOND: u32 = 50;

const ASPECT_SYSTEM_PROMPT: &str = "You analyze customer product reviews. For every review, list each \
product aspect or theme it mentions (for example durability, size, price, shipping, pet_interest) \
with the sentiment expressed toward it: positive, negative or neutral. Use short, consistent \
snake_case aspect names and only report aspects the review actually mentions. Reply with a JSON \
list holding exactly one object per review, in review order, each shaped like \
{\"aspects\": [{\"aspect\": \"price\", \"sentiment\": \"negative\"}]}.";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a customer experience analyst. From the review \
analytics provided, write a narrative summary for product teams with these sections: \
'### AI Overview' (3-4 sentences), '### Product Theme Analysis' (3-5 themes, each with \
**Positive:** and **Negative:** paragraphs quoting short customer phrases in italics), \
'### Other Considerations' and '### Conclusion'. Ground every claim in the keywords, bigrams \
and sample reviews. Focus on what customers experience, not on sentiment percentages. \
If the data is insufficient, reply with a single line starting with [ERROR].";

/// OpenAI client errors
#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Empty input: nothing to embed")]
    EmptyInput,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Connection settings
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub requests_per_second: u32,
    pub timeout: Duration,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: Vec<serde_json::Value>,
}

/// Client for an OpenAI-compatible API
pub struct OpenAiClient {
    client: Client,
    settings: OpenAiSettings,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl OpenAiClient {
    pub fn new(settings: OpenAiSettings) -> Result<Self, OpenAiError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| OpenAiError::Network(e.to_string()))?;

        let per_second = NonZeroU32::new(settings.requests_per_second)
            .unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        if settings.api_key.is_none() {
            tracing::warn!("OpenAI API key not configured, remote stages will fail");
        }

        Ok(Self {
            client,
            settings,
            rate_limiter,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, OpenAiError> {
        self.settings
            .api_key
            .as_deref()
            .ok_or(OpenAiError::MissingApiKey)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, OpenAiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let api_key = self.api_key()?;
        self.rate_limiter.until_ready().await;

        let url = format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path);
        tracing::debug!(url = %url, "POST to model API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| OpenAiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| OpenAiError::Parse(e.to_string()))
    }

    /// Embed one batch of texts
    pub async fn create_embeddings(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, OpenAiError> {
        if texts.is_empty() {
            return Err(OpenAiError::EmptyInput);
        }
        let expected = texts.len();

        let body = json!({
            "model": self.settings.embedding_model,
            "input": texts,
        });
        let mut response: EmbeddingResponse = self.post_json("embeddings", &body).await?;

        if response.data.len() != expected {
            return Err(OpenAiError::Parse(format!(
                "expected {} embeddings, received {}",
                expected,
                response.data.len()
            )));
        }
        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Single chat completion, returning the assistant message text
    pub async fn chat(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String, OpenAiError> {
        let request = ChatRequest {
            model: &self.settings.chat_model,
            temperature,
            max_tokens,
            messages: vec![
                json!({"role": "system", "content": system}),
                json!({"role": "user", "content": user}),
            ],
        };
        let response: ChatResponse = self.post_json("chat/completions", &request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAiError::Parse("completion had no content".to_string()))
    }
}

/// Parse an aspect-extraction reply
///
/// Accepts a bare JSON list or a `{"reviews": [...]}` wrapper, optionally
/// inside a Markdown code fence. Entries that are not aspect objects become
/// empty extractions.
pub fn parse_aspect_reply(reply: &str) -> Result<Vec<ReviewAspects>, OpenAiError> {
    let body = strip_code_fence(reply);
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| OpenAiError::Parse(e.to_string()))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("reviews") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Err(OpenAiError::Parse("expected a list of reviews".to_string())),
        },
        _ => return Err(OpenAiError::Parse("expected a JSON list".to_string())),
    };

    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect())
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn aspect_user_prompt(texts: &[String]) -> String {
    let mut prompt = format!(
        "Analyze the following {} product reviews for aspects and sentiment.\nREVIEWS:\n",
        texts.len()
    );
    for (i, text) in texts.iter().enumerate() {
        prompt.push_str(&format!("Review {}: {}\n", i + 1, text));
    }
    prompt
}

#[async_trait::async_trait]
impl Embedder for OpenAiClient {
    fn ensure_configured(&self) -> anyhow::Result<()> {
        self.api_key()?;
        Ok(())
    }

    async fn embed(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(self.create_embeddings(texts).await?)
    }
}

#[async_trait::async_trait]
impl AspectExtractor for OpenAiClient {
    fn ensure_configured(&self) -> anyhow::Result<()> {
        self.api_key()?;
        Ok(())
    }

    async fn extract_aspects(&self, texts: Vec<String>) -> anyhow::Result<Vec<ReviewAspects>> {
        let reply = self
            .chat(ASPECT_SYSTEM_PROMPT, &aspect_user_prompt(&texts), 0.1, Some(3000))
            .await?;
        Ok(parse_aspect_reply(&reply)?)
    }
}

#[async_trait::async_trait]
impl Summarizer for OpenAiClient {
    async fn summarize(&self, stats: &StatsSummary) -> anyhow::Result<SummarizeOutcome> {
        let data = serde_json::to_string(stats)?;
        let user = format!(
            "Analyze this customer review data and write the product-focused summary.\n\nData:\n{}",
            data
        );
        let reply = self.chat(SUMMARY_SYSTEM_PROMPT, &user, 0.0, None).await?;
        Ok(SummarizeOutcome::from_reply(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_list() {
        let parsed = parse_aspect_reply(
            r#"[{"aspects":[{"aspect":"price","sentiment":"negative"}]},{"aspects":[]}]"#,
        )
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].aspects[0].aspect, "price");
        assert!(parsed[1].aspects.is_empty());
    }

    #[test]
    fn test_parse_wrapper_and_code_fence() {
        let reply = "```json\n{\"reviews\": [{\"aspects\": [{\"aspect\": \"size\", \"sentiment\": \"positive\"}]}, 42]}\n```";
        let parsed = parse_aspect_reply(reply).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].aspects[0].sentiment, "positive");
        assert_eq!(parsed[1], ReviewAspects::default());
    }

    #[test]
    fn test_parse_rejects_non_list() {
        assert!(parse_aspect_reply("\"nope\"").is_err());
        assert!(parse_aspect_reply("{\"other\": []}").is_err());
        assert!(parse_aspect_reply("not json").is_err());
    }

    #[test]
    fn test_user_prompt_numbers_reviews() {
        let prompt = aspect_user_prompt(&["a".to_string(), "b".to_string()]);
        assert!(prompt.contains("Review 1: a"));
        assert!(prompt.contains("Review 2: b"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let client = OpenAiClient::new(OpenAiSettings::default()).unwrap();
        assert!(!client.is_configured());
        assert!(Embedder::ensure_configured(&client).is_err());

        let err = client.create_embeddings(vec!["hi".to_string()]).await.unwrap_err();
        assert!(matches!(err, OpenAiError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_empty_embedding_input_is_error() {
        let client = OpenAiClient::new(OpenAiSettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        })
        .unwrap();
        let err = client.create_embeddings(Vec::new()).await.unwrap_err();
        assert!(matches!(err, OpenAiError::EmptyInput));
    }
}
