//! Sentence-boundary text chunker.
//!
//! Splits lesson body text into [`CourseChunk`]s that respect a configurable
//! `target_chars` limit. Splitting occurs on sentence boundaries so no chunk
//! ever cuts a sentence in half, and consecutive chunks share a trailing
//! overlap of whole sentences (up to `overlap_chars`) so context is not lost
//! across a boundary.
//!
//! The first chunk of each lesson is prefixed with a synthetic header
//! (`Course <title> Lesson <n> content:`) so a chunk retrieved in isolation
//! still tells the generative model where it came from.

use crate::document::CourseDocument;
use crate::models::CourseChunk;

/// Abbreviations that a period does not terminate a sentence after.
const ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "cf", "al",
    "fig", "no", "approx",
];

/// Split text into sentences, robust to common abbreviations.
///
/// A `.`, `!`, or `?` followed by whitespace ends a sentence unless the word
/// before it is a known abbreviation or a single-letter initial ("J.").
/// Input whitespace is normalized to single spaces.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = normalized.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        current.push(ch);

        let is_terminator = matches!(ch, '.' | '!' | '?');
        let at_boundary = i + 1 >= chars.len() || chars[i + 1] == ' ';

        if is_terminator && at_boundary && !(ch == '.' && ends_with_abbreviation(&current)) {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

/// Check whether the text ends in `<abbreviation>.` — in which case the
/// period is part of the word, not a sentence boundary.
fn ends_with_abbreviation(text: &str) -> bool {
    let Some(word) = text.trim_end_matches('.').split_whitespace().last() else {
        return false;
    };
    let word = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '.');

    // Single-letter initials like "J." in "J. Smith".
    if word.len() == 1 && word.chars().all(|c| c.is_uppercase()) {
        return true;
    }

    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

/// Split one body of text into chunk strings.
///
/// Sentences accumulate until appending the next one would exceed
/// `target_chars`; the next chunk is seeded with trailing sentences
/// totalling at most `overlap_chars`. A single sentence longer than the
/// target is kept whole.
fn chunk_body(text: &str, target_chars: usize, overlap_chars: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;
    // Whether `current` holds anything beyond the overlap seed.
    let mut fresh = false;

    for sentence in sentences {
        let added = if current.is_empty() {
            sentence.len()
        } else {
            current_len + 1 + sentence.len()
        };

        if !current.is_empty() && added > target_chars {
            chunks.push(current.join(" "));

            // Seed the next chunk with trailing sentences within the overlap budget.
            let mut seed: Vec<String> = Vec::new();
            let mut seed_len = 0usize;
            for prev in current.iter().rev() {
                let next_len = if seed.is_empty() {
                    prev.len()
                } else {
                    seed_len + 1 + prev.len()
                };
                if next_len > overlap_chars {
                    break;
                }
                seed.insert(0, prev.clone());
                seed_len = next_len;
            }
            current = seed;
            current_len = seed_len;
            fresh = false;
        }

        current_len = if current.is_empty() {
            sentence.len()
        } else {
            current_len + 1 + sentence.len()
        };
        current.push(sentence);
        fresh = true;
    }

    // Never emit a chunk that is pure overlap duplication.
    if fresh && !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// Chunk an entire course document into ordered [`CourseChunk`]s.
///
/// Preamble text (before the first lesson marker) chunks with a NULL lesson
/// number. Chunk indices restart at 0 within each lesson.
pub fn chunk_course(
    doc: &CourseDocument,
    target_chars: usize,
    overlap_chars: usize,
) -> Vec<CourseChunk> {
    let mut chunks = Vec::new();

    for (i, body) in chunk_body(&doc.preamble, target_chars, overlap_chars)
        .into_iter()
        .enumerate()
    {
        let content = if i == 0 {
            format!("Course {} content: {}", doc.title, body)
        } else {
            body
        };
        chunks.push(CourseChunk {
            course_title: doc.title.clone(),
            lesson_number: None,
            lesson_link: None,
            chunk_index: i as i64,
            content,
        });
    }

    for lesson in &doc.lessons {
        for (i, body) in chunk_body(&lesson.body, target_chars, overlap_chars)
            .into_iter()
            .enumerate()
        {
            let content = if i == 0 {
                format!(
                    "Course {} Lesson {} content: {}",
                    doc.title, lesson.number, body
                )
            } else {
                body
            };
            chunks.push(CourseChunk {
                course_title: doc.title.clone(),
                lesson_number: Some(lesson.number),
                lesson_link: lesson.link.clone(),
                chunk_index: i as i64,
                content,
            });
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_course_document;

    fn doc_with_lesson(body: &str) -> CourseDocument {
        parse_course_document(&format!(
            "Course Title: T\nCourse Link: L\nCourse Instructor: I\n\nLesson 1: A\n{}\n",
            body
        ))
        .unwrap()
    }

    #[test]
    fn test_split_simple_sentences() {
        let s = split_sentences("First sentence. Second sentence! Third one?");
        assert_eq!(
            s,
            vec!["First sentence.", "Second sentence!", "Third one?"]
        );
    }

    #[test]
    fn test_split_does_not_break_on_abbreviations() {
        let s = split_sentences("Dr. Smith teaches the class. It is good.");
        assert_eq!(s, vec!["Dr. Smith teaches the class.", "It is good."]);

        let s = split_sentences("Use embeddings, e.g. MiniLM vectors. They work well.");
        assert_eq!(
            s,
            vec!["Use embeddings, e.g. MiniLM vectors.", "They work well."]
        );
    }

    #[test]
    fn test_split_does_not_break_inside_dotted_tokens() {
        // No whitespace after the dot — not a boundary.
        let s = split_sentences("Visit example.com for details. Then continue.");
        assert_eq!(s, vec!["Visit example.com for details.", "Then continue."]);
    }

    #[test]
    fn test_split_initials() {
        let s = split_sentences("J. Doe wrote this. It is short.");
        assert_eq!(s, vec!["J. Doe wrote this.", "It is short."]);
    }

    #[test]
    fn test_short_lesson_is_single_chunk() {
        let doc = doc_with_lesson("One short sentence. Another short sentence.");
        let chunks = chunk_course(&doc, 800, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].lesson_number, Some(1));
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(
            chunks[0].content,
            "Course T Lesson 1 content: One short sentence. Another short sentence."
        );
    }

    #[test]
    fn test_reconstruction_for_single_chunk_lesson() {
        let body = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota.";
        let doc = doc_with_lesson(body);
        let chunks = chunk_course(&doc, 800, 100);
        assert_eq!(chunks.len(), 1);
        let stripped = chunks[0]
            .content
            .strip_prefix("Course T Lesson 1 content: ")
            .unwrap();
        assert_eq!(stripped, body);
    }

    #[test]
    fn test_chunks_respect_target_size() {
        let body = (0..40)
            .map(|i| format!("Sentence number {} has a fixed shape.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let doc = doc_with_lesson(&body);
        let chunks = chunk_course(&doc, 200, 60);
        assert!(chunks.len() > 1);

        for (i, chunk) in chunks.iter().enumerate() {
            let core = if i == 0 {
                chunk
                    .content
                    .strip_prefix("Course T Lesson 1 content: ")
                    .unwrap()
            } else {
                chunk.content.as_str()
            };
            assert!(
                core.len() <= 200,
                "chunk {} exceeds target: {} chars",
                i,
                core.len()
            );
            assert_eq!(chunk.chunk_index, i as i64);
        }
    }

    #[test]
    fn test_adjacent_chunks_share_overlap() {
        let body = (0..40)
            .map(|i| format!("Sentence number {} has a fixed shape.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let doc = doc_with_lesson(&body);
        let chunks = chunk_course(&doc, 200, 60);
        assert!(chunks.len() > 2);

        for pair in chunks.windows(2) {
            let prev = &pair[0].content;
            // The next chunk must start with the last sentence of the previous one.
            let last_sentence = split_sentences(prev).pop().unwrap();
            assert!(
                pair[1].content.starts_with(&last_sentence),
                "expected overlap '{}' at start of '{}'",
                last_sentence,
                pair[1].content
            );
        }
    }

    #[test]
    fn test_oversized_single_sentence_kept_whole() {
        let giant = format!("{} end.", "word ".repeat(300).trim());
        let doc = doc_with_lesson(&giant);
        let chunks = chunk_course(&doc, 100, 20);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.len() > 100);
        assert!(chunks[0].content.ends_with("end."));
    }

    #[test]
    fn test_preamble_chunked_without_lesson_number() {
        let doc = parse_course_document(
            "Course Title: T\nCourse Link: L\nCourse Instructor: I\n\nPreamble text here.\n\nLesson 1: A\nLesson body.\n",
        )
        .unwrap();
        let chunks = chunk_course(&doc, 800, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].lesson_number, None);
        assert_eq!(chunks[0].content, "Course T content: Preamble text here.");
        assert_eq!(chunks[1].lesson_number, Some(1));
    }

    #[test]
    fn test_empty_lesson_produces_no_chunks() {
        let doc = doc_with_lesson("");
        let chunks = chunk_course(&doc, 800, 100);
        assert!(chunks.is_empty());
    }
}
