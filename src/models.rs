//! Core data models used throughout Lectern.
//!
//! These types represent the courses, lessons, and content chunks that flow
//! through the ingestion and retrieval pipeline, plus the citation records
//! surfaced alongside answers.

use serde::{Deserialize, Serialize};

/// A course as parsed from an ingestion document.
///
/// Identity is the title (unique, case-sensitive). Courses are immutable
/// once stored; re-ingesting an existing title is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub link: String,
    pub instructor: String,
    pub lessons: Vec<Lesson>,
}

/// A lesson within a course. Owned by its course; the number is unique
/// within that course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub number: i64,
    pub title: String,
    pub link: Option<String>,
}

/// A retrievable slice of course text with positional identity.
///
/// Identity = (course_title, lesson_number, chunk_index). `lesson_number`
/// is `None` for course-level text that precedes the first lesson marker.
#[derive(Debug, Clone)]
pub struct CourseChunk {
    pub course_title: String,
    pub lesson_number: Option<i64>,
    pub lesson_link: Option<String>,
    pub chunk_index: i64,
    pub content: String,
}

/// One catalog row per course, searchable by title similarity.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub title: String,
    pub link: String,
    pub instructor: String,
    pub lesson_count: i64,
    pub lessons: Vec<Lesson>,
}

/// Provenance of retrieved content, shown to the end consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Catalog summary returned by `GET /courses` and `lectern courses`.
#[derive(Debug, Clone, Serialize)]
pub struct CourseCatalog {
    pub total_courses: i64,
    pub course_titles: Vec<String>,
}
