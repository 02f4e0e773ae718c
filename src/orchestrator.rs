//! Bounded multi-round tool-calling loop.
//!
//! Drives the conversation with the generative model: offer the retrieval
//! tools, execute any requested invocations sequentially, feed the results
//! back, and repeat up to `retrieval.max_tool_rounds` rounds. When the
//! round limit is reached the final model call withholds the tool
//! definitions, forcing a terminal answer — the model is never offered more
//! than `max_rounds` opportunities to request a tool, and at most
//! `max_rounds + 1` model calls are made per query.
//!
//! A tool dispatch failure is not escalated: it is inserted into the
//! conversation as an error-flagged tool result so the model can retry or
//! answer from what it has. Model-call failures (after the client's own
//! retries) propagate to the caller as terminal query failures.

use anyhow::Result;

use crate::generator::{ChatModel, ContentBlock, Message, Role};
use crate::tools::{ToolContext, ToolRegistry};

/// Static system prompt for the course-materials assistant.
pub const SYSTEM_PROMPT: &str = "\
You are an AI assistant specialized in course materials and educational \
content, with tools for retrieving course information.

Tool selection:
- Course outline queries (structure, lessons, what a course covers): use `get_course_outline`.
- Specific content questions (topics, concepts, explanations): use `search_course_content`.
- General knowledge questions: answer from existing knowledge without tools.

Tool usage:
- You may make up to TWO sequential tool calls per query when the first \
result shows you need complementary information (e.g. outline first, then \
a targeted content search). Prefer fewer calls when one suffices.
- If a tool yields no results, state that clearly without offering alternatives.

Responses must be brief, educational, and clear. Synthesize tool results \
into a direct answer — no meta-commentary about searches or tools.";

/// Run the tool-calling loop for one query and return the answer text.
///
/// Citations accumulate in the [`ToolContext`] and are drained by the
/// caller after this returns.
pub async fn run_tool_loop(
    model: &dyn ChatModel,
    system: &str,
    question: &str,
    registry: &ToolRegistry,
    ctx: &ToolContext,
    max_rounds: usize,
) -> Result<String> {
    let tools = registry.definitions();
    let mut messages = vec![Message::user_text(question)];

    for round in 0..max_rounds {
        let response = model.complete(system, &messages, &tools).await?;

        let tool_uses: Vec<(String, String, serde_json::Value)> = response
            .tool_uses()
            .into_iter()
            .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
            .collect();

        if tool_uses.is_empty() {
            return Ok(response.text());
        }

        // Record the model's tool requests, then execute them sequentially
        // in the order given.
        messages.push(Message {
            role: Role::Assistant,
            content: response.content,
        });

        let mut results = Vec::with_capacity(tool_uses.len());
        for (id, name, input) in tool_uses {
            tracing::debug!(round, tool = %name, "dispatching tool invocation");
            let block = match registry.dispatch(&name, input, ctx).await {
                Ok(output) => ContentBlock::ToolResult {
                    tool_use_id: id,
                    content: output,
                    is_error: false,
                },
                Err(e) => {
                    tracing::warn!(tool = %name, error = %e, "tool dispatch failed");
                    ContentBlock::ToolResult {
                        tool_use_id: id,
                        content: format!("Error executing tool '{}': {}", name, e),
                        is_error: true,
                    }
                }
            };
            results.push(block);
        }
        messages.push(Message {
            role: Role::User,
            content: results,
        });

        // Round limit reached: one final call with tools withheld forces a
        // terminal answer regardless of the response shape.
        if round + 1 == max_rounds {
            let final_response = model.complete(system, &messages, &[]).await?;
            return Ok(final_response.text());
        }
    }

    // max_rounds >= 1 is enforced by config validation; the loop always
    // returns from within.
    unreachable!("tool loop exited without producing an answer")
}
