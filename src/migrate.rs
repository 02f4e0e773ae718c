use anyhow::Result;
use sqlx::SqlitePool;

/// Create the catalog and chunk tables. Idempotent — safe to run repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // One catalog row per course; the title embedding is the searchable key.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog (
            title TEXT PRIMARY KEY,
            link TEXT NOT NULL,
            instructor TEXT NOT NULL,
            lesson_count INTEGER NOT NULL,
            lessons_json TEXT NOT NULL,
            embedding BLOB NOT NULL,
            ingested_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Content chunks; identity = (course_title, lesson_number, chunk_index).
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            course_title TEXT NOT NULL,
            lesson_number INTEGER,
            lesson_link TEXT,
            chunk_index INTEGER NOT NULL,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL,
            UNIQUE(course_title, lesson_number, chunk_index),
            FOREIGN KEY (course_title) REFERENCES catalog(title)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_title)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chunks_course_lesson ON chunks(course_title, lesson_number)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
