//! Shared fixtures for unit tests: a deterministic embedder and sample
//! course data mirroring a small two-lesson course.

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::models::{Course, CourseChunk, Lesson};

/// Deterministic bag-of-words embedder: tokens hash into a fixed number of
/// buckets and the vector is L2-normalized. Identical strings embed
/// identically; strings sharing tokens have positive similarity; disjoint
/// strings are (near-)orthogonal. No I/O.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            // FNV-1a
            let mut h: u64 = 0xcbf29ce484222325;
            for b in token.bytes() {
                h ^= b as u64;
                h = h.wrapping_mul(0x100000001b3);
            }
            v[(h % self.dims as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-bow"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

pub fn sample_course() -> Course {
    Course {
        title: "Introduction to RAG Systems".to_string(),
        link: "https://example.com/rag-course".to_string(),
        instructor: "Dr. Test".to_string(),
        lessons: vec![
            Lesson {
                number: 0,
                title: "Course Overview".to_string(),
                link: Some("https://example.com/lesson-0".to_string()),
            },
            Lesson {
                number: 1,
                title: "What is RAG".to_string(),
                link: Some("https://example.com/lesson-1".to_string()),
            },
            Lesson {
                number: 2,
                title: "Vector Databases".to_string(),
                link: Some("https://example.com/lesson-2".to_string()),
            },
        ],
    }
}

pub fn sample_chunks() -> Vec<CourseChunk> {
    vec![
        CourseChunk {
            course_title: "Introduction to RAG Systems".to_string(),
            lesson_number: Some(1),
            lesson_link: Some("https://example.com/lesson-1".to_string()),
            chunk_index: 0,
            content: "RAG stands for retrieval augmented generation. It combines retrieval \
                      from a knowledge base with language model generation."
                .to_string(),
        },
        CourseChunk {
            course_title: "Introduction to RAG Systems".to_string(),
            lesson_number: Some(2),
            lesson_link: Some("https://example.com/lesson-2".to_string()),
            chunk_index: 0,
            content: "Vector databases store embeddings which are numerical representations \
                      of text."
                .to_string(),
        },
        CourseChunk {
            course_title: "Introduction to RAG Systems".to_string(),
            lesson_number: Some(2),
            lesson_link: Some("https://example.com/lesson-2".to_string()),
            chunk_index: 1,
            content: "Embeddings capture semantic meaning so similar text maps to nearby \
                      vectors."
                .to_string(),
        },
    ]
}
