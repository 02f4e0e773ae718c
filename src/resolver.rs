//! Fuzzy course-name resolution.
//!
//! Maps a user-supplied, possibly misspelled or partial course name to a
//! canonical catalog title via nearest-neighbor search over title
//! embeddings. The nearest match is accepted only when its cosine distance
//! is within `retrieval.catalog_distance_max`; otherwise the resolver
//! reports no match, and callers surface that explicitly rather than
//! returning content from an unrelated course.

use anyhow::Result;
use std::sync::Arc;

use crate::store::VectorStore;

pub struct CourseResolver {
    store: Arc<VectorStore>,
    max_distance: f32,
}

impl CourseResolver {
    pub fn new(store: Arc<VectorStore>, max_distance: f32) -> Self {
        Self {
            store,
            max_distance,
        }
    }

    /// Resolve a raw course name to its canonical catalog title.
    ///
    /// Returns `None` when the catalog is empty or the nearest entry is
    /// farther than the acceptance threshold. An exact existing title
    /// always resolves (distance 0).
    pub async fn resolve(&self, raw_name: &str) -> Result<Option<String>> {
        let matches = self.store.query_catalog(raw_name, 1).await?;

        match matches.into_iter().next() {
            Some((entry, distance)) if distance <= self.max_distance => {
                tracing::debug!(
                    raw = raw_name,
                    resolved = %entry.title,
                    distance,
                    "resolved course name"
                );
                Ok(Some(entry.title))
            }
            Some((entry, distance)) => {
                tracing::debug!(
                    raw = raw_name,
                    nearest = %entry.title,
                    distance,
                    max = self.max_distance,
                    "nearest course rejected by distance threshold"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
