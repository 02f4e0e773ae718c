//! Two-collection vector index over SQLite.
//!
//! The store owns two similarity-searchable collections:
//!
//! - **catalog** — one entry per course, keyed by an embedding of the
//!   course title. Supports fuzzy course-name resolution and outline
//!   lookups.
//! - **chunks** — the course content units, keyed by embeddings of their
//!   text. Supports filtered nearest-neighbor content search.
//!
//! Embeddings are stored as little-endian f32 BLOBs and ranked by cosine
//! distance in process. Query operations never mutate state; ingestion
//! writes batch all rows for one course in a single transaction so a
//! concurrent reader never observes a partially-written course.

use anyhow::{bail, Context, Result};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::embedding::{blob_to_vec, cosine_distance, embed_query, vec_to_blob, Embedder};
use crate::models::{CatalogEntry, Course, CourseCatalog, CourseChunk, Lesson};

/// Metadata equality filters for content queries.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<i64>,
}

pub struct VectorStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl VectorStore {
    pub fn new(pool: SqlitePool, embedder: Arc<dyn Embedder>) -> Self {
        Self { pool, embedder }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Whether a course with this exact title is already ingested.
    pub async fn course_exists(&self, title: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog WHERE title = ?")
            .bind(title)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Insert or replace the catalog entry for a course. Idempotent: a
    /// write with an existing title replaces prior fields.
    pub async fn upsert_catalog_entry(&self, course: &Course) -> Result<()> {
        let embedding = embed_query(self.embedder.as_ref(), &course.title)
            .await
            .context("embedding course title")?;
        let mut tx = self.pool.begin().await?;
        self.upsert_catalog_tx(&mut tx, course, &embedding).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Batch-insert content chunks for one course inside a single
    /// transaction. Chunks are immutable once written; re-adding a course
    /// replaces its previous chunks wholesale.
    pub async fn add_course_chunks(&self, chunks: &[CourseChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let title = &chunks[0].course_title;
        if chunks.iter().any(|c| &c.course_title != title) {
            bail!("add_course_chunks requires chunks from a single course");
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self
            .embedder
            .embed(&texts)
            .await
            .context("embedding course chunks")?;
        if embeddings.len() != chunks.len() {
            bail!(
                "embedding count mismatch: {} texts, {} vectors",
                chunks.len(),
                embeddings.len()
            );
        }

        let mut tx = self.pool.begin().await?;
        self.insert_chunks_tx(&mut tx, title, chunks, &embeddings)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Write a course's catalog entry and all its chunks atomically.
    ///
    /// This is the ingestion entry point: embeddings are computed up front
    /// (the only external calls), then catalog row + chunk rows land in one
    /// transaction.
    pub async fn add_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<()> {
        let title_embedding = embed_query(self.embedder.as_ref(), &course.title)
            .await
            .context("embedding course title")?;

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder
                .embed(&texts)
                .await
                .context("embedding course chunks")?
        };
        if embeddings.len() != chunks.len() {
            bail!(
                "embedding count mismatch: {} texts, {} vectors",
                chunks.len(),
                embeddings.len()
            );
        }

        let mut tx = self.pool.begin().await?;
        self.upsert_catalog_tx(&mut tx, course, &title_embedding)
            .await?;
        self.insert_chunks_tx(&mut tx, &course.title, chunks, &embeddings)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_catalog_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        course: &Course,
        embedding: &[f32],
    ) -> Result<()> {
        let lessons_json = serde_json::to_string(&course.lessons)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO catalog (title, link, instructor, lesson_count, lessons_json, embedding, ingested_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET
                link = excluded.link,
                instructor = excluded.instructor,
                lesson_count = excluded.lesson_count,
                lessons_json = excluded.lessons_json,
                embedding = excluded.embedding,
                ingested_at = excluded.ingested_at
            "#,
        )
        .bind(&course.title)
        .bind(&course.link)
        .bind(&course.instructor)
        .bind(course.lessons.len() as i64)
        .bind(&lessons_json)
        .bind(vec_to_blob(embedding))
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn insert_chunks_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        title: &str,
        chunks: &[CourseChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        sqlx::query("DELETE FROM chunks WHERE course_title = ?")
            .bind(title)
            .execute(&mut **tx)
            .await?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            sqlx::query(
                r#"
                INSERT INTO chunks (course_title, lesson_number, lesson_link, chunk_index, content, embedding)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.course_title)
            .bind(chunk.lesson_number)
            .bind(&chunk.lesson_link)
            .bind(chunk.chunk_index)
            .bind(&chunk.content)
            .bind(vec_to_blob(embedding))
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Nearest catalog entries for a piece of text, ascending by cosine
    /// distance (0 = identical title).
    pub async fn query_catalog(&self, text: &str, k: usize) -> Result<Vec<(CatalogEntry, f32)>> {
        let query_vec = embed_query(self.embedder.as_ref(), text)
            .await
            .context("embedding catalog query")?;

        let rows = sqlx::query(
            "SELECT title, link, instructor, lesson_count, lessons_json, embedding FROM catalog",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(CatalogEntry, f32)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let distance = cosine_distance(&query_vec, &blob_to_vec(&blob));
                let lessons_json: String = row.get("lessons_json");
                let lessons: Vec<Lesson> =
                    serde_json::from_str(&lessons_json).unwrap_or_default();
                (
                    CatalogEntry {
                        title: row.get("title"),
                        link: row.get("link"),
                        instructor: row.get("instructor"),
                        lesson_count: row.get("lesson_count"),
                        lessons,
                    },
                    distance,
                )
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// Nearest content chunks for a piece of text, optionally restricted to
    /// a course title and/or lesson number (metadata equality, not fuzzy).
    pub async fn query_content(
        &self,
        text: &str,
        k: usize,
        filter: &ContentFilter,
    ) -> Result<Vec<(CourseChunk, f32)>> {
        let query_vec = embed_query(self.embedder.as_ref(), text)
            .await
            .context("embedding content query")?;

        let mut sql = String::from(
            "SELECT course_title, lesson_number, lesson_link, chunk_index, content, embedding FROM chunks",
        );
        let mut conditions: Vec<&str> = Vec::new();
        if filter.course_title.is_some() {
            conditions.push("course_title = ?");
        }
        if filter.lesson_number.is_some() {
            conditions.push("lesson_number = ?");
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        let mut query = sqlx::query(&sql);
        if let Some(ref title) = filter.course_title {
            query = query.bind(title);
        }
        if let Some(lesson) = filter.lesson_number {
            query = query.bind(lesson);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut scored: Vec<(CourseChunk, f32)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let distance = cosine_distance(&query_vec, &blob_to_vec(&blob));
                (
                    CourseChunk {
                        course_title: row.get("course_title"),
                        lesson_number: row.get("lesson_number"),
                        lesson_link: row.get("lesson_link"),
                        chunk_index: row.get("chunk_index"),
                        content: row.get("content"),
                    },
                    distance,
                )
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// Exact-title catalog lookup (no similarity involved).
    pub async fn get_catalog_entry(&self, title: &str) -> Result<Option<CatalogEntry>> {
        let row = sqlx::query(
            "SELECT title, link, instructor, lesson_count, lessons_json FROM catalog WHERE title = ?",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let lessons_json: String = row.get("lessons_json");
            let lessons: Vec<Lesson> = serde_json::from_str(&lessons_json).unwrap_or_default();
            CatalogEntry {
                title: row.get("title"),
                link: row.get("link"),
                instructor: row.get("instructor"),
                lesson_count: row.get("lesson_count"),
                lessons,
            }
        }))
    }

    /// Course count and titles for the catalog/statistics interface.
    pub async fn catalog(&self) -> Result<CourseCatalog> {
        let titles: Vec<String> =
            sqlx::query_scalar("SELECT title FROM catalog ORDER BY title ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(CourseCatalog {
            total_courses: titles.len() as i64,
            course_titles: titles,
        })
    }
}
