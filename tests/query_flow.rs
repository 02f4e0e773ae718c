//! In-process integration tests for the full query pipeline.
//!
//! These drive ingest → resolution → retrieval tools → tool-calling loop
//! end-to-end through the library, substituting the two external
//! collaborators (embedding service, generative model) with deterministic
//! fakes implementing the crate's `Embedder` and `ChatModel` traits.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use lectern::assistant::Assistant;
use lectern::config::Config;
use lectern::embedding::Embedder;
use lectern::generator::{ChatModel, ChatResponse, ContentBlock, Message, StopReason, ToolSchema};
use lectern::ingest::ingest_directory;
use lectern::migrate;
use lectern::server::serve;
use lectern::store::VectorStore;

// ─── Fake embedder ──────────────────────────────────────────────────

/// Deterministic bag-of-words embedder: tokens hash into buckets, vectors
/// are L2-normalized. Shared tokens → positive similarity; disjoint text →
/// near-orthogonal.
struct HashEmbedder {
    dims: usize,
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-bow"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; self.dims];
                for token in text
                    .to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|t| !t.is_empty())
                {
                    let mut h: u64 = 0xcbf29ce484222325;
                    for b in token.bytes() {
                        h ^= b as u64;
                        h = h.wrapping_mul(0x100000001b3);
                    }
                    v[(h % self.dims as u64) as usize] += 1.0;
                }
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for x in &mut v {
                        *x /= norm;
                    }
                }
                v
            })
            .collect())
    }
}

// ─── Scripted model ─────────────────────────────────────────────────

/// Pops pre-baked responses and records what each call saw.
struct ScriptedModel {
    responses: Mutex<VecDeque<ChatResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
}

#[allow(dead_code)]
struct RecordedCall {
    system: String,
    tools_offered: bool,
    messages: Vec<Message>,
}

impl ScriptedModel {
    fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ChatResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: system.to_string(),
            tools_offered: !tools.is_empty(),
            messages: messages.to_vec(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted model exhausted"))
    }
}

fn text_response(text: &str) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
        stop_reason: StopReason::EndTurn,
    }
}

fn tool_use_response(id: &str, name: &str, input: Value) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }],
        stop_reason: StopReason::ToolUse,
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

const INTRO_DOC: &str = "\
Course Title: Intro
Course Link: https://example.com/intro
Course Instructor: Dr. Example

Lesson 1: Getting Started
The first lesson explains the basics of retrieval.

Lesson 2: Advanced Topics
The second lesson covers embeddings and ranking in depth.
";

fn test_config(tmp: &TempDir) -> Config {
    let content = format!(
        r#"
[db]
path = "{}/lectern.sqlite"

[server]
bind = "127.0.0.1:0"
"#,
        tmp.path().display()
    );
    toml::from_str(&content).unwrap()
}

/// Ingest the Intro course and return a populated store.
async fn populated_store(tmp: &TempDir, config: &Config) -> Arc<VectorStore> {
    let docs = tmp.path().join("docs");
    std::fs::create_dir_all(&docs).unwrap();
    std::fs::write(docs.join("intro.txt"), INTRO_DOC).unwrap();

    let pool = lectern::db::connect(&config.db.path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    let store = Arc::new(VectorStore::new(pool, Arc::new(HashEmbedder { dims: 64 })));

    let report = ingest_directory(config, &store, &docs).await.unwrap();
    assert_eq!(report.courses_added, 1);
    store
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

// ─── Tests ──────────────────────────────────────────────────────────

/// Outline scenario: ingest a two-lesson course, ask for its outline. The
/// outline tool returns both lesson titles in order and the citation list
/// has exactly one entry for the course.
#[tokio::test]
async fn test_outline_query_flow() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = populated_store(&tmp, &config).await;

    let model = Arc::new(ScriptedModel::new(vec![
        tool_use_response("tu_1", "get_course_outline", json!({"course_name": "Intro"})),
        text_response("Intro has two lessons: Getting Started and Advanced Topics."),
    ]));
    let assistant = Assistant::new(config, store, model.clone());

    let outcome = assistant
        .query("What is the outline of Intro?", None)
        .await
        .unwrap();

    assert_eq!(
        outcome.answer,
        "Intro has two lessons: Getting Started and Advanced Topics."
    );
    assert_eq!(outcome.sources.len(), 1);
    assert_eq!(outcome.sources[0].label, "Intro");
    assert_eq!(
        outcome.sources[0].link.as_deref(),
        Some("https://example.com/intro")
    );

    // The tool result handed to the model lists both lessons in order.
    let calls = model.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    match &calls[1].messages[2].content[0] {
        ContentBlock::ToolResult { content, .. } => {
            let l1 = content.find("Lesson 1: Getting Started").unwrap();
            let l2 = content.find("Lesson 2: Advanced Topics").unwrap();
            assert!(l1 < l2);
            assert!(content.contains("Total Lessons: 2"));
        }
        other => panic!("expected tool result, got {:?}", other),
    }
}

/// Two sequential tool calls across two rounds: the final citation list
/// reflects only the second round's sources.
#[tokio::test]
async fn test_citations_reflect_last_round_only() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = populated_store(&tmp, &config).await;

    let model = Arc::new(ScriptedModel::new(vec![
        tool_use_response(
            "tu_1",
            "search_course_content",
            json!({"query": "basics of retrieval", "lesson_number": 1}),
        ),
        tool_use_response(
            "tu_2",
            "search_course_content",
            json!({"query": "embeddings and ranking", "lesson_number": 2}),
        ),
        text_response("Lesson 1 covers basics; lesson 2 covers embeddings."),
    ]));
    let assistant = Assistant::new(config, store, model.clone());

    let outcome = assistant
        .query("Compare lesson 1 and lesson 2 of Intro", None)
        .await
        .unwrap();

    // max_tool_rounds = 2, so exactly three model calls, the last without tools.
    assert_eq!(model.call_count(), 3);
    assert!(!model.calls.lock().unwrap()[2].tools_offered);

    assert!(!outcome.sources.is_empty());
    assert!(
        outcome.sources.iter().all(|s| s.label == "Intro - Lesson 2"),
        "expected only second-round sources, got {:?}",
        outcome.sources
    );
}

/// Re-ingesting the identical document leaves the course count at 1.
#[tokio::test]
async fn test_reingest_idempotent_at_catalog_level() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = populated_store(&tmp, &config).await;

    let docs = tmp.path().join("docs");
    let second = ingest_directory(&config, &store, &docs).await.unwrap();
    assert_eq!(second.courses_added, 0);
    assert_eq!(second.courses_skipped, 1);

    let model = Arc::new(ScriptedModel::new(vec![]));
    let assistant = Assistant::new(config, store, model);
    let catalog = assistant.catalog().await.unwrap();
    assert_eq!(catalog.total_courses, 1);
    assert_eq!(catalog.course_titles, vec!["Intro"]);
}

/// A search against an unknown course surfaces an explicit "no matching
/// course" tool result and produces no citations.
#[tokio::test]
async fn test_unknown_course_surfaces_not_found() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = populated_store(&tmp, &config).await;

    let model = Arc::new(ScriptedModel::new(vec![
        tool_use_response(
            "tu_1",
            "search_course_content",
            json!({"query": "anything", "course_name": "Completely Unrelated Xyz123"}),
        ),
        text_response("No course by that name exists."),
    ]));
    let assistant = Assistant::new(config, store, model.clone());

    let outcome = assistant.query("What does Xyz123 cover?", None).await.unwrap();

    assert!(outcome.sources.is_empty());
    let calls = model.calls.lock().unwrap();
    match &calls[1].messages[2].content[0] {
        ContentBlock::ToolResult {
            content, is_error, ..
        } => {
            assert!(!*is_error, "a resolution miss is a result, not an error");
            assert!(content.contains("No course found matching 'Completely Unrelated Xyz123'"));
        }
        other => panic!("expected tool result, got {:?}", other),
    }
}

/// A follow-up query in the same session carries condensed history in the
/// system prompt; a fresh session does not.
#[tokio::test]
async fn test_session_history_carried_forward() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = populated_store(&tmp, &config).await;

    let model = Arc::new(ScriptedModel::new(vec![
        text_response("First answer."),
        text_response("Second answer."),
    ]));
    let assistant = Assistant::new(config, store, model.clone());

    let first = assistant.query("What is Intro?", None).await.unwrap();
    assert!(!model.calls.lock().unwrap()[0]
        .system
        .contains("Previous conversation"));

    let second = assistant
        .query("And who teaches it?", Some(first.session_id.clone()))
        .await
        .unwrap();
    assert_eq!(second.session_id, first.session_id);

    let calls = model.calls.lock().unwrap();
    let system = &calls[1].system;
    assert!(system.contains("Previous conversation"));
    assert!(system.contains("User: What is Intro?"));
    assert!(system.contains("Assistant: First answer."));
}

/// The HTTP surface: query answers with sources and a session id, rejects
/// empty queries, and reports the catalog.
#[tokio::test]
async fn test_http_query_and_courses() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = populated_store(&tmp, &config).await;

    let model = Arc::new(ScriptedModel::new(vec![
        tool_use_response("tu_1", "get_course_outline", json!({"course_name": "Intro"})),
        text_response("Intro has two lessons."),
    ]));
    let assistant = Arc::new(Assistant::new(config, store, model));

    let port = find_free_port();
    let bind = format!("127.0.0.1:{}", port);
    let server_handle = tokio::spawn(async move {
        serve(assistant, &bind).await.ok();
    });
    wait_for_server(port).await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{}", port);

    // Health
    let resp = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    // Courses
    let resp = client
        .get(format!("{}/courses", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total_courses"], 1);
    assert_eq!(body["course_titles"][0], "Intro");

    // Query
    let resp = client
        .post(format!("{}/query", base))
        .json(&json!({"query": "outline of Intro"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["answer"], "Intro has two lessons.");
    assert_eq!(body["sources"][0]["label"], "Intro");
    assert!(body["session_id"].as_str().unwrap().len() > 0);

    // Empty query → 400 with the shared error contract
    let resp = client
        .post(format!("{}/query", base))
        .json(&json!({"query": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    server_handle.abort();
}
