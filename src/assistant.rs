//! Query facade tying the retrieval subsystem together.
//!
//! The [`Assistant`] owns the vector store, the generative model client,
//! the retrieval tool registry, and the session store. Each query gets a
//! fresh [`ToolContext`] so citation state never leaks between concurrent
//! queries; the session exchange is recorded only after the tool loop
//! completes, so a cancelled query leaves no partial state behind.

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::generator::ChatModel;
use crate::models::{CourseCatalog, SourceRef};
use crate::orchestrator::{run_tool_loop, SYSTEM_PROMPT};
use crate::resolver::CourseResolver;
use crate::session::SessionStore;
use crate::store::VectorStore;
use crate::tools::{ToolContext, ToolRegistry};

/// Result of one query: the answer, its citations, and the session id the
/// caller should carry forward.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub session_id: String,
}

pub struct Assistant {
    config: Config,
    store: Arc<VectorStore>,
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    sessions: SessionStore,
}

impl Assistant {
    pub fn new(config: Config, store: Arc<VectorStore>, model: Arc<dyn ChatModel>) -> Self {
        let sessions = SessionStore::new(config.session.max_history);
        Self {
            config,
            store,
            model,
            tools: ToolRegistry::with_retrieval_tools(),
            sessions,
        }
    }

    /// Answer a natural-language question, optionally continuing a session.
    pub async fn query(&self, text: &str, session_id: Option<String>) -> Result<QueryOutcome> {
        let session_id = session_id.unwrap_or_else(|| self.sessions.create_session());

        let system = match self.sessions.history(&session_id) {
            Some(history) => format!("{}\n\nPrevious conversation:\n{}", SYSTEM_PROMPT, history),
            None => SYSTEM_PROMPT.to_string(),
        };

        let resolver = CourseResolver::new(
            self.store.clone(),
            self.config.retrieval.catalog_distance_max,
        );
        let ctx = ToolContext::new(
            self.store.clone(),
            resolver,
            self.config.retrieval.max_results,
        );

        let question = format!("Answer this question about course materials: {}", text);
        let answer = run_tool_loop(
            self.model.as_ref(),
            &system,
            &question,
            &self.tools,
            &ctx,
            self.config.retrieval.max_tool_rounds,
        )
        .await?;

        let sources = ctx.take_sources();
        self.sessions.record(&session_id, text, &answer);

        Ok(QueryOutcome {
            answer,
            sources,
            session_id,
        })
    }

    /// Course count and titles for the catalog/statistics interface.
    pub async fn catalog(&self) -> Result<CourseCatalog> {
        self.store.catalog().await
    }
}
