//! Direct retrieval inspection (`lectern search`).
//!
//! Runs a content query against the vector index without involving the
//! generative model. Useful for checking what the search tool would hand
//! the model for a given query.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::store::{ContentFilter, VectorStore};

pub async fn run_search(
    config: &Config,
    query: &str,
    course: Option<String>,
    lesson: Option<i64>,
    limit: Option<usize>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let embedder = create_embedder(&config.embedding)?;
    let pool = db::connect(&config.db.path).await?;
    let store = VectorStore::new(pool, embedder);

    let filter = ContentFilter {
        course_title: course,
        lesson_number: lesson,
    };
    let limit = limit.unwrap_or(config.retrieval.max_results);
    let results = store.query_content(query, limit, &filter).await?;

    if results.is_empty() {
        println!("No results.");
        store.pool().close().await;
        return Ok(());
    }

    println!("{} result(s) for \"{}\":", results.len(), query);
    println!();
    for (i, (chunk, distance)) in results.iter().enumerate() {
        let location = match chunk.lesson_number {
            Some(n) => format!("{} — Lesson {}", chunk.course_title, n),
            None => chunk.course_title.clone(),
        };
        println!("{:>2}. [{:.4}] {}", i + 1, distance, location);
        let excerpt: String = chunk.content.chars().take(160).collect();
        println!("    \"{}\"", excerpt.replace('\n', " "));
        println!();
    }

    store.pool().close().await;
    Ok(())
}
