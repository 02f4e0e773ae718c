//! Generative model client.
//!
//! Defines the wire-level conversation types (tagged-union content blocks,
//! so the orchestrator's state machine is exhaustively checkable), the
//! [`ChatModel`] trait the orchestrator drives, and [`ClaudeModel`] — the
//! production implementation speaking the Anthropic Messages API.
//!
//! # Retry Strategy
//!
//! Same policy as the embedding clients: HTTP 429/5xx and network errors
//! retry with exponential backoff (1s, 2s, 4s, ... capped at 2^5); other
//! 4xx responses (bad auth, malformed request) fail immediately.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::GeneratorConfig;

/// A message role. The Messages API only carries user/assistant turns;
/// system instructions travel in a top-level field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn: a role plus an ordered list of content blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// A content block within a message. The tagging matches the Messages API
/// wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

/// A tool definition as presented to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model finished its answer.
    EndTurn,
    /// The model is requesting one or more tool invocations.
    ToolUse,
}

/// A model response: content blocks plus the stop reason.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

impl ChatResponse {
    /// Concatenated text of all text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The tool-use requests in this response, in order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &Value)> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }
}

/// A generative chat model the orchestrator can drive. Object-safe so
/// tests can script responses without any network access.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One model call: system instructions, accumulated messages, and the
    /// tool definitions on offer (empty slice = tools withheld).
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ChatResponse>;
}

// ============ Anthropic Messages API client ============

/// Production [`ChatModel`] calling the Anthropic Messages API.
///
/// Requires the `ANTHROPIC_API_KEY` environment variable.
pub struct ClaudeModel {
    config: GeneratorConfig,
    api_key: String,
    client: reqwest::Client,
}

impl ClaudeModel {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: config.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl ChatModel for ClaudeModel {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ChatResponse> {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": system,
            "messages": messages,
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(tools)?;
            body["tool_choice"] = serde_json::json!({ "type": "auto" });
        }

        let url = format!("{}/v1/messages", self.config.url.trim_end_matches('/'));
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        return parse_messages_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Messages API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Auth / malformed-request errors are not retryable.
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Messages API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Model call failed after retries")))
    }
}

fn parse_messages_response(json: &Value) -> Result<ChatResponse> {
    let content_json = json
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid response: missing content array"))?;

    let mut content = Vec::with_capacity(content_json.len());
    for block in content_json {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("text") => content.push(ContentBlock::Text {
                text: block
                    .get("text")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default()
                    .to_string(),
            }),
            Some("tool_use") => content.push(ContentBlock::ToolUse {
                id: block
                    .get("id")
                    .and_then(|i| i.as_str())
                    .unwrap_or_default()
                    .to_string(),
                name: block
                    .get("name")
                    .and_then(|n| n.as_str())
                    .unwrap_or_default()
                    .to_string(),
                input: block.get("input").cloned().unwrap_or(Value::Null),
            }),
            // Thinking or other block types are ignored for answer purposes.
            _ => {}
        }
    }

    let stop_reason = match json.get("stop_reason").and_then(|s| s.as_str()) {
        Some("tool_use") => StopReason::ToolUse,
        _ => StopReason::EndTurn,
    };

    Ok(ChatResponse {
        content,
        stop_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_block_wire_format() {
        let msg = Message {
            role: Role::Assistant,
            content: vec![
                ContentBlock::Text {
                    text: "hi".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "tu_1".to_string(),
                    name: "search_course_content".to_string(),
                    input: serde_json::json!({"query": "rag"}),
                },
            ],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "tool_use");
        assert_eq!(json["content"][1]["id"], "tu_1");
    }

    #[test]
    fn test_tool_result_tagged_with_invocation_id() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "tu_9".to_string(),
            content: "results".to_string(),
            is_error: false,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool_use_id"], "tu_9");
        // is_error omitted when false
        assert!(json.get("is_error").is_none());
    }

    #[test]
    fn test_parse_messages_response_tool_use() {
        let json = serde_json::json!({
            "content": [
                { "type": "tool_use", "id": "t1", "name": "get_course_outline",
                  "input": { "course_name": "Intro" } }
            ],
            "stop_reason": "tool_use"
        });
        let resp = parse_messages_response(&json).unwrap();
        assert_eq!(resp.stop_reason, StopReason::ToolUse);
        let uses = resp.tool_uses();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].1, "get_course_outline");
    }

    #[test]
    fn test_parse_messages_response_end_turn() {
        let json = serde_json::json!({
            "content": [ { "type": "text", "text": "An answer." } ],
            "stop_reason": "end_turn"
        });
        let resp = parse_messages_response(&json).unwrap();
        assert_eq!(resp.stop_reason, StopReason::EndTurn);
        assert_eq!(resp.text(), "An answer.");
    }
}
