//! Embedding-similarity lore matching.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serene_core::{Embedder, LoreMatchingStrategy, MatchMessage, MatchableEntry, MatchingError};
use tokio::sync::RwLock;

/// Cosine of the angle between two embeddings, clamped to `[-1, 1]`.
///
/// Embeddings of different dimension, or with no magnitude, score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, sq_a, sq_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, sq_a, sq_b), (x, y)| {
            (dot + x * y, sq_a + x * x, sq_b + y * y)
        });

    let magnitude = (sq_a * sq_b).sqrt();
    if magnitude <= f32::EPSILON {
        0.0
    } else {
        (dot / magnitude).clamp(-1.0, 1.0)
    }
}

/// Matches when the message embedding is close enough to the entry's.
///
/// The entry is embedded from its keys, or its content when it has none.
/// Embeddings are cached by text until [`cleanup`](LoreMatchingStrategy::cleanup).
pub struct VectorMatchingStrategy {
    embedder: Arc<dyn Embedder>,
    threshold: f32,
    initialized: bool,
    cache: RwLock<HashMap<String, Arc<Vec<f32>>>>,
}

impl VectorMatchingStrategy {
    pub fn new(embedder: Arc<dyn Embedder>, threshold: f32) -> Self {
        Self {
            embedder,
            threshold,
            initialized: false,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn embedding(&self, text: &str) -> Result<Arc<Vec<f32>>, MatchingError> {
        if let Some(hit) = self.cache.read().await.get(text) {
            return Ok(Arc::clone(hit));
        }
        let vector = Arc::new(self.embedder.embed(text).await?);
        self.cache
            .write()
            .await
            .insert(text.to_string(), Arc::clone(&vector));
        Ok(vector)
    }
}

#[async_trait]
impl LoreMatchingStrategy for VectorMatchingStrategy {
    fn name(&self) -> &str {
        "vector"
    }

    async fn initialize(&mut self) -> Result<(), MatchingError> {
        tracing::debug!(embedder = self.embedder.name(), "Vector matching ready");
        self.initialized = true;
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<(), MatchingError> {
        self.cache.write().await.clear();
        self.initialized = false;
        Ok(())
    }

    async fn matches_message(
        &self,
        entry: &dyn MatchableEntry,
        message: &MatchMessage<'_>,
    ) -> Result<bool, MatchingError> {
        if !self.initialized {
            return Err(MatchingError::NotInitialized(self.name().to_string()));
        }
        if message.text.trim().is_empty() {
            return Ok(false);
        }

        let entry_text = match entry.key_list() {
            keys if keys.is_empty() => entry.content().to_string(),
            keys => keys.join(", "),
        };
        let entry_vec = self.embedding(&entry_text).await?;
        let message_vec = self.embedding(message.text).await?;
        Ok(cosine_similarity(&entry_vec, &message_vec) >= self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serene_core::{KindedLore, LoreEntry, LoreKind, Role};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text as counts of a few marker words.
    struct BagOfWords {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for BagOfWords {
        fn name(&self) -> &str {
            "bag-of-words"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, MatchingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let lower = text.to_lowercase();
            Ok(["dragon", "fire", "wizard", "tower"]
                .iter()
                .map(|w| lower.matches(w).count() as f32)
                .collect())
        }
    }

    fn message(text: &str) -> MatchMessage<'_> {
        MatchMessage {
            id: 1,
            role: Role::User,
            text,
        }
    }

    #[test]
    fn identical_vectors_are_similar() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_and_degenerate_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn opposite_and_scaled_vectors() {
        assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]) + 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 2.0], &[10.0, 20.0]) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn must_be_initialized() {
        let embedder = Arc::new(BagOfWords {
            calls: AtomicUsize::new(0),
        });
        let strategy = VectorMatchingStrategy::new(embedder, 0.5);
        let entry = LoreEntry::new(1, "dragon", "d");
        let kinded = KindedLore {
            kind: LoreKind::WorldLore,
            entry: &entry,
        };
        let err = strategy
            .matches_message(&kinded, &message("a dragon"))
            .await
            .unwrap_err();
        assert!(matches!(err, MatchingError::NotInitialized(_)));
    }

    #[tokio::test]
    async fn similar_text_matches_and_embeddings_are_cached() {
        let embedder = Arc::new(BagOfWords {
            calls: AtomicUsize::new(0),
        });
        let mut strategy = VectorMatchingStrategy::new(embedder.clone(), 0.7);
        strategy.initialize().await.unwrap();

        let entry = LoreEntry::new(1, "dragon, fire", "d");
        let kinded = KindedLore {
            kind: LoreKind::WorldLore,
            entry: &entry,
        };
        assert!(
            strategy
                .matches_message(&kinded, &message("The dragon breathes fire"))
                .await
                .unwrap()
        );
        assert!(
            !strategy
                .matches_message(&kinded, &message("The wizard climbs the tower"))
                .await
                .unwrap()
        );
        // entry text embedded once, each message once
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);

        strategy.cleanup().await.unwrap();
        assert!(
            strategy
                .matches_message(&kinded, &message("dragon"))
                .await
                .is_err()
        );
    }
}
