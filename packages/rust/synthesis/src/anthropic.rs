//! Anthropic Messages API synthesizer.
//!
//! Each stream carries a persona system prompt; the model is instructed to
//! respond with a JSON object `{"narrative": ..., "source_links": [...]}`.
//! Batches above the configured chunk size are synthesized in chunks and
//! the narratives joined.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use daybrief_shared::{
    DaybriefError, Item, Result, SourceLink, StreamConfig, SynthesisConfig,
};

use crate::{Synthesis, Synthesizer};

/// Default API base URL; overridable via config for tests.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Messages API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Item body text is truncated to this many chars in the prompt.
const MAX_BODY_CHARS: usize = 1500;

/// Persona for the frontier-AI research stream.
const PURE_SIGNAL_PERSONA: &str = "\
You are an expert AI researcher writing a daily narrative digest about \
frontier AI progress for professionals building expertise in the field. \
Group the provided items by theme, weave perspectives together, and explain \
why things matter, not just what happened. Skip funding news, hiring news, \
and product launches without new capabilities. Write short, punchy sentences.";

/// Persona for the Ferrari F1 stream.
const MARANELLO_PERSONA: &str = "\
You are the voice of a daily briefing focused exclusively on Scuderia \
Ferrari. Discard any item that is not directly about Ferrari, its drivers, \
its car, or its management. Combine the remaining items into a single \
conversational briefing, like a well-connected paddock insider talking to a \
fellow tifoso. Translate any Italian content into English seamlessly.";

/// Fallback persona for custom streams without one configured.
const GENERIC_PERSONA: &str = "\
You are a careful editor writing a daily narrative digest from the provided \
news items. Group related items, summarize what matters, and keep the tone \
knowledgeable and direct.";

/// Output-format contract appended to every persona.
const FORMAT_RULES: &str = "\
Respond with a JSON object (not an array):\n\
{\n  \"narrative\": \"The full digest as one string. Use \\n\\n between paragraphs.\",\n  \
\"source_links\": [{\"title\": \"Short descriptive title\", \"url\": \"original link\"}]\n}\n\
source_links must list every item you drew from, in the order it appears in \
the narrative. If none of the items are worth publishing, return \
{\"narrative\": \"\", \"source_links\": []}. No markdown fences. Only valid JSON.";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// The JSON object the model is asked to produce.
#[derive(Debug, Default, Deserialize)]
struct ModelReply {
    #[serde(default)]
    narrative: String,
    #[serde(default)]
    source_links: Vec<SourceLink>,
}

/// One item as presented to the model.
#[derive(Debug, Serialize)]
struct PromptItem<'a> {
    source: &'a str,
    title: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    published: Option<String>,
    text: String,
}

// ---------------------------------------------------------------------------
// AnthropicSynthesizer
// ---------------------------------------------------------------------------

/// [`Synthesizer`] over the Anthropic Messages API.
pub struct AnthropicSynthesizer {
    client: reqwest::Client,
    config: SynthesisConfig,
    api_key: String,
    base_url: String,
}

impl AnthropicSynthesizer {
    /// Build a synthesizer from the `[synthesis]` config section.
    /// Reads the API key from the configured environment variable.
    pub fn new(config: SynthesisConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                DaybriefError::config(format!(
                    "Anthropic API key not found. Set the {} environment variable.",
                    config.api_key_env
                ))
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DaybriefError::Synthesis(format!("failed to build HTTP client: {e}")))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            config,
            api_key,
            base_url,
        })
    }

    /// Persona system prompt for a stream: configured override, built-in
    /// default for the shipped streams, generic fallback otherwise.
    fn system_prompt(stream: &StreamConfig) -> String {
        let persona = match (&stream.persona, stream.id.as_str()) {
            (Some(p), _) => p.as_str(),
            (None, "pure-signal") => PURE_SIGNAL_PERSONA,
            (None, "maranello") => MARANELLO_PERSONA,
            (None, _) => GENERIC_PERSONA,
        };
        format!("{persona}\n\n{FORMAT_RULES}")
    }

    /// Synthesize one chunk of items.
    async fn synthesize_chunk(&self, system: &str, items: &[Item]) -> Result<ModelReply> {
        let prompt = format_items(items);
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system,
            messages: vec![Message {
                role: "user",
                content: &prompt,
            }],
        };

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| DaybriefError::Synthesis(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DaybriefError::Synthesis(format!(
                "HTTP {status}: {}",
                truncate(&body, 300)
            )));
        }

        let response: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| DaybriefError::Synthesis(format!("invalid response body: {e}")))?;

        if let Some(usage) = &response.usage {
            info!(
                tokens_in = usage.input_tokens,
                tokens_out = usage.output_tokens,
                "synthesis call complete"
            );
        }

        let text = response
            .content
            .first()
            .map(|b| b.text.as_str())
            .unwrap_or_default();

        parse_reply(text)
    }
}

#[async_trait]
impl Synthesizer for AnthropicSynthesizer {
    #[instrument(skip_all, fields(stream = %stream.id, items = items.len()))]
    async fn synthesize(&self, stream: &StreamConfig, items: &[Item]) -> Result<Synthesis> {
        if items.is_empty() {
            return Ok(Synthesis::default());
        }

        let system = Self::system_prompt(stream);
        let chunk_size = self.config.chunk_size.max(1);

        let mut narratives = Vec::new();
        let mut source_links = Vec::new();

        for chunk in items.chunks(chunk_size) {
            let reply = self.synthesize_chunk(&system, chunk).await?;
            if !reply.narrative.trim().is_empty() {
                narratives.push(reply.narrative.trim().to_string());
                source_links.extend(reply.source_links);
            }
        }

        Ok(Synthesis {
            narrative: narratives.join("\n\n"),
            source_links,
        })
    }
}

// ---------------------------------------------------------------------------
// Prompt / reply helpers
// ---------------------------------------------------------------------------

/// Render items as the JSON payload the persona prompts expect.
fn format_items(items: &[Item]) -> String {
    let payload: Vec<PromptItem<'_>> = items
        .iter()
        .map(|item| PromptItem {
            source: &item.payload.source_name,
            title: &item.payload.title,
            url: &item.payload.url,
            published: item.payload.published.map(|dt| dt.to_rfc3339()),
            text: truncate(&item.payload.body, MAX_BODY_CHARS),
        })
        .collect();

    // Serializing borrowed strings cannot fail
    let json = serde_json::to_string_pretty(&payload).unwrap_or_default();
    format!("Synthesize today's digest from these items:\n\n{json}")
}

/// Parse the model's reply, stripping Markdown code fences first.
fn parse_reply(text: &str) -> Result<ModelReply> {
    let raw = strip_fences(text.trim());

    serde_json::from_str(raw).map_err(|e| {
        warn!(error = %e, "model reply was not valid JSON");
        DaybriefError::Synthesis(format!(
            "malformed model reply: {e} (got: {})",
            truncate(raw, 200)
        ))
    })
}

/// Remove a leading/trailing ``` fence pair, if present.
fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag line
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Truncate to at most `max_chars` on a char boundary.
fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybrief_shared::ItemPayload;

    fn item(title: &str) -> Item {
        Item {
            stream_id: "pure-signal".into(),
            identity: "abcdef0123456789".into(),
            payload: ItemPayload {
                title: title.into(),
                source_name: "Test Feed".into(),
                url: "https://example.com/a".into(),
                published: None,
                body: "body text".into(),
            },
        }
    }

    fn stream(id: &str) -> StreamConfig {
        StreamConfig {
            id: id.into(),
            title: id.into(),
            backend: daybrief_shared::StoreBackend::Json,
            persona: None,
            sources: vec![],
        }
    }

    #[test]
    fn parse_plain_json_reply() {
        let reply = parse_reply(
            r#"{"narrative": "Today in AI...", "source_links": [{"title": "A", "url": "https://a"}]}"#,
        )
        .expect("parse");
        assert_eq!(reply.narrative, "Today in AI...");
        assert_eq!(reply.source_links.len(), 1);
    }

    #[test]
    fn parse_fenced_reply() {
        let fenced = "```json\n{\"narrative\": \"x\", \"source_links\": []}\n```";
        let reply = parse_reply(fenced).expect("parse fenced");
        assert_eq!(reply.narrative, "x");
    }

    #[test]
    fn parse_reply_missing_links_defaults() {
        let reply = parse_reply(r#"{"narrative": "just text"}"#).expect("parse");
        assert!(reply.source_links.is_empty());
    }

    #[test]
    fn malformed_reply_is_synthesis_error() {
        let result = parse_reply("I couldn't produce JSON today, sorry.");
        assert!(matches!(result, Err(DaybriefError::Synthesis(_))));
    }

    #[test]
    fn prompt_includes_item_fields() {
        let prompt = format_items(&[item("Big News")]);
        assert!(prompt.contains("Big News"));
        assert!(prompt.contains("Test Feed"));
        assert!(prompt.contains("https://example.com/a"));
    }

    #[test]
    fn persona_selection() {
        let ps = AnthropicSynthesizer::system_prompt(&stream("pure-signal"));
        assert!(ps.contains("frontier AI"));

        let mar = AnthropicSynthesizer::system_prompt(&stream("maranello"));
        assert!(mar.contains("Ferrari"));

        let other = AnthropicSynthesizer::system_prompt(&stream("endurance"));
        assert!(other.contains("careful editor"));

        let mut custom = stream("pure-signal");
        custom.persona = Some("Custom persona.".into());
        let c = AnthropicSynthesizer::system_prompt(&custom);
        assert!(c.starts_with("Custom persona."));
        // Format contract is always appended
        assert!(c.contains("source_links"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 100), "short");
    }

    #[test]
    fn request_serializes() {
        let req = MessagesRequest {
            model: "claude-sonnet-4-5",
            max_tokens: 8000,
            temperature: 0.7,
            system: "persona",
            messages: vec![Message {
                role: "user",
                content: "items",
            }],
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""model":"claude-sonnet-4-5""#));
        assert!(json.contains(r#""role":"user""#));
    }
}
