//! Course document parsing.
//!
//! An ingestion document is plain text: three header lines identifying the
//! course, followed by lesson blocks. Example:
//!
//! ```text
//! Course Title: Introduction to RAG Systems
//! Course Link: https://example.com/rag
//! Course Instructor: Dr. Test
//!
//! Lesson 0: Course Overview
//! Lesson Link: https://example.com/rag/lesson-0
//! Welcome to the course. This lesson covers the basics.
//!
//! Lesson 1: What is RAG
//! ...
//! ```
//!
//! A malformed header is a structured [`ParseError`] that aborts ingestion
//! of that document only. Lines that look like lesson markers but carry an
//! unparseable number are skipped with a warning, not fatal.

use thiserror::Error;

use crate::models::{Course, Lesson};

const HEADER_TITLE: &str = "Course Title:";
const HEADER_LINK: &str = "Course Link:";
const HEADER_INSTRUCTOR: &str = "Course Instructor:";
const LESSON_LINK: &str = "Lesson Link:";

/// Structured parse failure for a single ingestion document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("document is empty")]
    Empty,
    #[error("missing required header line '{0}'")]
    MissingHeader(&'static str),
    #[error("header field '{0}' is empty")]
    EmptyHeader(&'static str),
}

/// A parsed course document: header metadata plus lesson bodies, ready for
/// the chunker.
#[derive(Debug, Clone)]
pub struct CourseDocument {
    pub title: String,
    pub link: String,
    pub instructor: String,
    /// Course-level text appearing before the first lesson marker.
    pub preamble: String,
    pub lessons: Vec<LessonBlock>,
}

/// One lesson block: marker metadata plus free-text body.
#[derive(Debug, Clone)]
pub struct LessonBlock {
    pub number: i64,
    pub title: String,
    pub link: Option<String>,
    pub body: String,
}

impl CourseDocument {
    /// Course metadata view of this document (lesson bodies dropped).
    pub fn course(&self) -> Course {
        Course {
            title: self.title.clone(),
            link: self.link.clone(),
            instructor: self.instructor.clone(),
            lessons: self
                .lessons
                .iter()
                .map(|l| Lesson {
                    number: l.number,
                    title: l.title.clone(),
                    link: l.link.clone(),
                })
                .collect(),
        }
    }
}

/// Parse a course document.
///
/// The first three non-empty lines must be, in order, `Course Title:`,
/// `Course Link:`, and `Course Instructor:`. Everything after that is
/// course preamble until the first `Lesson <n>: <title>` marker, then
/// lesson blocks until end of input.
pub fn parse_course_document(text: &str) -> Result<CourseDocument, ParseError> {
    let mut lines = text.lines();

    let title = parse_header_line(&mut lines, HEADER_TITLE)?;
    let link = parse_header_line(&mut lines, HEADER_LINK)?;
    let instructor = parse_header_line(&mut lines, HEADER_INSTRUCTOR)?;

    let mut preamble_lines: Vec<&str> = Vec::new();
    let mut lessons: Vec<LessonBlock> = Vec::new();

    for line in lines {
        let trimmed = line.trim();

        if let Some(marker) = parse_lesson_marker(trimmed) {
            match marker {
                Ok((number, lesson_title)) => {
                    lessons.push(LessonBlock {
                        number,
                        title: lesson_title,
                        link: None,
                        body: String::new(),
                    });
                }
                Err(bad) => {
                    tracing::warn!(line = bad, "skipping unrecognized lesson marker");
                }
            }
            continue;
        }

        match lessons.last_mut() {
            Some(lesson) => {
                // A lesson link line is only honored directly after the marker.
                if lesson.body.trim().is_empty() && lesson.link.is_none() {
                    if let Some(rest) = trimmed.strip_prefix(LESSON_LINK) {
                        let url = rest.trim();
                        if !url.is_empty() {
                            lesson.link = Some(url.to_string());
                        }
                        continue;
                    }
                }
                if !lesson.body.is_empty() {
                    lesson.body.push('\n');
                }
                lesson.body.push_str(line);
            }
            None => preamble_lines.push(line),
        }
    }

    for lesson in &mut lessons {
        lesson.body = lesson.body.trim().to_string();
    }

    Ok(CourseDocument {
        title,
        link,
        instructor,
        preamble: preamble_lines.join("\n").trim().to_string(),
        lessons,
    })
}

/// Consume the next non-empty line and require it to carry the given header
/// prefix with a non-empty value.
fn parse_header_line<'a>(
    lines: &mut std::str::Lines<'a>,
    prefix: &'static str,
) -> Result<String, ParseError> {
    let line = lines
        .by_ref()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or(if prefix == HEADER_TITLE {
            ParseError::Empty
        } else {
            ParseError::MissingHeader(prefix)
        })?;

    let value = line
        .strip_prefix(prefix)
        .ok_or(ParseError::MissingHeader(prefix))?
        .trim();

    if value.is_empty() {
        return Err(ParseError::EmptyHeader(prefix));
    }
    Ok(value.to_string())
}

/// Recognize `Lesson <n>: <title>` markers.
///
/// Returns `None` for ordinary body lines, `Some(Ok(..))` for a valid
/// marker, and `Some(Err(line))` for a line that announces itself as a
/// lesson marker but has an unparseable number.
fn parse_lesson_marker(line: &str) -> Option<Result<(i64, String), String>> {
    let rest = line.strip_prefix("Lesson ")?;
    // "Lesson Link:" lines are handled separately, not markers.
    if rest.starts_with("Link:") {
        return None;
    }
    let colon = rest.find(':')?;
    let number_part = rest[..colon].trim();
    match number_part.parse::<i64>() {
        Ok(number) => Some(Ok((number, rest[colon + 1..].trim().to_string()))),
        Err(_) => Some(Err(line.to_string())),
    }
}
