//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow: scan the document directory → parse each
//! course document → chunk → embed → store. Ingestion is idempotent: a
//! document whose course title is already in the catalog is skipped. A
//! parse failure aborts that document only; the rest of the batch
//! continues.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::chunk::chunk_course;
use crate::config::Config;
use crate::db;
use crate::document::parse_course_document;
use crate::embedding::create_embedder;
use crate::migrate;
use crate::store::VectorStore;

/// Counters from one ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents_seen: u64,
    pub courses_added: u64,
    pub courses_skipped: u64,
    pub parse_failures: u64,
    pub chunks_written: u64,
}

/// Ingest every matching document under `root` into the store.
pub async fn ingest_directory(
    config: &Config,
    store: &VectorStore,
    root: &Path,
) -> Result<IngestReport> {
    if !root.exists() {
        bail!("Document directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.ingest.include_globs)?;
    let mut files: Vec<PathBuf> = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if include_set.is_match(relative) {
            files.push(path.to_path_buf());
        }
    }

    // Sort for deterministic ordering
    files.sort();

    let mut report = IngestReport::default();

    for path in &files {
        report.documents_seen += 1;

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;

        let doc = match parse_course_document(&text) {
            Ok(doc) => doc,
            Err(e) => {
                report.parse_failures += 1;
                eprintln!("warning: skipping {}: {}", path.display(), e);
                continue;
            }
        };

        if store.course_exists(&doc.title).await? {
            report.courses_skipped += 1;
            continue;
        }

        let chunks = chunk_course(
            &doc,
            config.chunking.target_chars,
            config.chunking.overlap_chars,
        );
        store
            .add_course(&doc.course(), &chunks)
            .await
            .with_context(|| format!("storing course '{}'", doc.title))?;

        report.courses_added += 1;
        report.chunks_written += chunks.len() as u64;
    }

    Ok(report)
}

/// CLI entry point: connect, migrate, ingest, print the summary.
pub async fn run_ingest(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let root = match path.or_else(|| config.ingest.root.clone()) {
        Some(root) => root,
        None => bail!("No document directory given — pass a path or set [ingest] root in config"),
    };

    let embedder = create_embedder(&config.embedding)?;
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;
    let store = VectorStore::new(pool, embedder);

    let report = ingest_directory(config, &store, &root).await?;

    println!("ingest {}", root.display());
    println!("  documents found: {}", report.documents_seen);
    println!("  courses added: {}", report.courses_added);
    println!("  courses skipped (already ingested): {}", report.courses_skipped);
    println!("  parse failures: {}", report.parse_failures);
    println!("  chunks written: {}", report.chunks_written);
    println!("ok");

    store.pool().close().await;
    Ok(())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
