//! Retrieval tools exposed to the generative model.
//!
//! Each tool is described by a name, a purpose string, and a JSON-schema
//! parameter description, and executes against a [`ToolContext`] that
//! bridges to the vector store. The context also carries the per-query
//! citation buffer: every invocation that returns actual content replaces
//! the buffer, so the sources surfaced to the end user reflect only the
//! most recent tool call.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use crate::generator::ToolSchema;
use crate::models::SourceRef;
use crate::resolver::CourseResolver;
use crate::store::{ContentFilter, VectorStore};

/// Context bridge for tool execution, created fresh for each query so
/// concurrent queries never share citation state.
pub struct ToolContext {
    pub store: Arc<VectorStore>,
    pub resolver: CourseResolver,
    /// Max content chunks returned per search.
    pub max_results: usize,
    sources: Mutex<Vec<SourceRef>>,
}

impl ToolContext {
    pub fn new(store: Arc<VectorStore>, resolver: CourseResolver, max_results: usize) -> Self {
        Self {
            store,
            resolver,
            max_results,
            sources: Mutex::new(Vec::new()),
        }
    }

    /// Replace the citation buffer with this invocation's sources.
    fn set_sources(&self, sources: Vec<SourceRef>) {
        *self.sources.lock().unwrap() = sources;
    }

    /// Drain the citation buffer (called once per query, after the loop).
    pub fn take_sources(&self) -> Vec<SourceRef> {
        std::mem::take(&mut *self.sources.lock().unwrap())
    }
}

/// A retrieval operation the generative model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as offered to the model (lowercase with underscores).
    fn name(&self) -> &str;

    /// One-line purpose string the model uses to decide when to call it.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with the model-provided arguments, returning the formatted
    /// text block sent back to the model.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String>;
}

// ============ search_course_content ============

/// Semantic search over course content with optional course/lesson filters.
pub struct SearchContentTool;

#[async_trait]
impl Tool for SearchContentTool {
    fn name(&self) -> &str {
        "search_course_content"
    }

    fn description(&self) -> &str {
        "Search course materials with smart course name matching and lesson filtering"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for in the course content"
                },
                "course_name": {
                    "type": "string",
                    "description": "Course title (partial names match, e.g. 'MCP', 'Introduction')"
                },
                "lesson_number": {
                    "type": "integer",
                    "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String> {
        let query = params["query"].as_str().unwrap_or("");
        if query.trim().is_empty() {
            bail!("query must not be empty");
        }

        let course_name = params["course_name"].as_str();
        let lesson_number = params["lesson_number"].as_i64();

        // Resolve the course name first; a miss short-circuits without
        // running any content query.
        let resolved_title = match course_name {
            Some(name) => match ctx.resolver.resolve(name).await? {
                Some(title) => Some(title),
                None => return Ok(format!("No course found matching '{}'", name)),
            },
            None => None,
        };

        let filter = ContentFilter {
            course_title: resolved_title.clone(),
            lesson_number,
        };
        let hits = ctx
            .store
            .query_content(query, ctx.max_results, &filter)
            .await?;

        if hits.is_empty() {
            let mut scope = String::new();
            if let Some(ref title) = resolved_title {
                scope.push_str(&format!(" in course '{}'", title));
            }
            if let Some(n) = lesson_number {
                scope.push_str(&format!(" in lesson {}", n));
            }
            return Ok(format!("No relevant content found{}.", scope));
        }

        let mut blocks = Vec::with_capacity(hits.len());
        let mut sources: Vec<SourceRef> = Vec::new();

        for (chunk, _distance) in &hits {
            let header = match chunk.lesson_number {
                Some(n) => format!("[{} - Lesson {}]", chunk.course_title, n),
                None => format!("[{}]", chunk.course_title),
            };
            blocks.push(format!("{}\n{}", header, chunk.content));

            let label = match chunk.lesson_number {
                Some(n) => format!("{} - Lesson {}", chunk.course_title, n),
                None => chunk.course_title.clone(),
            };
            let source = SourceRef {
                label,
                link: chunk.lesson_link.clone(),
            };
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        ctx.set_sources(sources);
        Ok(blocks.join("\n\n"))
    }
}

// ============ get_course_outline ============

/// Course outline lookup: link, instructor, and the ordered lesson list.
pub struct CourseOutlineTool;

#[async_trait]
impl Tool for CourseOutlineTool {
    fn name(&self) -> &str {
        "get_course_outline"
    }

    fn description(&self) -> &str {
        "Get the outline of a course: its link, instructor, and complete lesson list"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "course_name": {
                    "type": "string",
                    "description": "Course title (partial names match)"
                }
            },
            "required": ["course_name"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String> {
        let course_name = params["course_name"].as_str().unwrap_or("");
        if course_name.trim().is_empty() {
            bail!("course_name must not be empty");
        }

        let Some(title) = ctx.resolver.resolve(course_name).await? else {
            return Ok(format!("No course found matching '{}'", course_name));
        };

        let Some(entry) = ctx.store.get_catalog_entry(&title).await? else {
            // Resolution returned a title the catalog no longer has; treat
            // as a miss rather than an internal error.
            return Ok(format!("No course found matching '{}'", course_name));
        };

        let mut out = String::new();
        out.push_str(&format!("Course: {}\n", entry.title));
        out.push_str(&format!("Course Link: {}\n", entry.link));
        out.push_str(&format!("Instructor: {}\n", entry.instructor));
        out.push_str(&format!("Total Lessons: {}\n", entry.lesson_count));
        out.push_str("Lesson List:\n");
        for lesson in &entry.lessons {
            out.push_str(&format!("  Lesson {}: {}\n", lesson.number, lesson.title));
        }

        ctx.set_sources(vec![SourceRef {
            label: entry.title.clone(),
            link: Some(entry.link.clone()),
        }]);

        Ok(out)
    }
}

// ============ ToolRegistry ============

/// Registry mapping tool names to typed handlers. Unknown-name dispatch is
/// a recoverable error value, never a panic.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Create a registry pre-loaded with the retrieval tools.
    pub fn with_retrieval_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchContentTool));
        registry.register(Box::new(CourseOutlineTool));
        registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Find a tool by name.
    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Tool definitions formatted for the model's tool-calling protocol.
    pub fn definitions(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.parameters_schema(),
            })
            .collect()
    }

    /// Dispatch an invocation by name.
    pub async fn dispatch(&self, name: &str, params: Value, ctx: &ToolContext) -> Result<String> {
        let tool = self
            .find(name)
            .ok_or_else(|| anyhow::anyhow!("no tool registered with name: {}", name))?;
        tool.execute(params, ctx).await
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
