//! Catalog overview (`lectern courses`).
//!
//! Lists what is indexed: course count, titles, lesson and chunk counts.
//! Reads the tables directly so it works without an embedding provider
//! configured.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

pub async fn run_courses(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    crate::migrate::run_migrations(&pool).await?;

    let rows = sqlx::query(
        r#"
        SELECT c.title, c.instructor, c.lesson_count, COUNT(ch.chunk_index) AS chunk_count
        FROM catalog c
        LEFT JOIN chunks ch ON ch.course_title = c.title
        GROUP BY c.title
        ORDER BY c.title ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    println!("total courses: {}", rows.len());

    if !rows.is_empty() {
        println!();
        println!(
            "  {:<40} {:<24} {:>7} {:>7}",
            "COURSE", "INSTRUCTOR", "LESSONS", "CHUNKS"
        );
        println!("  {}", "-".repeat(82));
        for row in &rows {
            let title: String = row.get("title");
            let instructor: String = row.get("instructor");
            let lesson_count: i64 = row.get("lesson_count");
            let chunk_count: i64 = row.get("chunk_count");
            println!(
                "  {:<40} {:<24} {:>7} {:>7}",
                title, instructor, lesson_count, chunk_count
            );
        }
    }

    pool.close().await;
    Ok(())
}
