use crate::{
    core::{
        memory::{MemoryDb, MemoryRecord},
        model::{first_tag, DOCUMENT_ID_TAG},
    },
    err,
    error::DocAssistError,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// A [MemoryDb] keeping every index in a map. Search is a linear cosine similarity scan.
#[derive(Debug, Default)]
pub struct InMemoryDb {
    indexes: RwLock<HashMap<String, Index>>,
}

#[derive(Debug)]
struct Index {
    size: usize,
    records: HashMap<String, MemoryRecord>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MemoryDb for InMemoryDb {
    fn id(&self) -> &'static str {
        "inmemory"
    }

    async fn list_indexes(&self) -> Result<Vec<String>, DocAssistError> {
        let mut indexes = self
            .indexes
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        indexes.sort();
        Ok(indexes)
    }

    async fn create_index(&self, index: &str, size: usize) -> Result<(), DocAssistError> {
        let mut indexes = self.indexes.write().await;

        if let Some(existing) = indexes.get(index) {
            if existing.size != size {
                return err!(
                    Llm,
                    "index '{index}' holds vectors of size {}, got {size}",
                    existing.size
                );
            }
            return Ok(());
        }

        debug!("Creating index '{index}' ({size})");

        indexes.insert(
            index.to_string(),
            Index {
                size,
                records: HashMap::new(),
            },
        );

        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), DocAssistError> {
        self.indexes.write().await.remove(index);
        Ok(())
    }

    async fn upsert(&self, index: &str, record: MemoryRecord) -> Result<(), DocAssistError> {
        let mut indexes = self.indexes.write().await;

        let Some(idx) = indexes.get_mut(index) else {
            return err!(DoesNotExist, "Index '{index}'");
        };

        if record.vector.len() != idx.size {
            return err!(
                Llm,
                "vector of size {} does not fit index '{index}' of size {}",
                record.vector.len(),
                idx.size
            );
        }

        idx.records.insert(record.id.clone(), record);

        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryRecord, f32)>, DocAssistError> {
        let indexes = self.indexes.read().await;

        let Some(idx) = indexes.get(index) else {
            return err!(DoesNotExist, "Index '{index}'");
        };

        let mut results = idx
            .records
            .values()
            .map(|record| (record, cosine_similarity(vector, &record.vector)))
            .collect::<Vec<_>>();

        results.sort_by(|(a, a_score), (b, b_score)| {
            b_score.total_cmp(a_score).then_with(|| a.id.cmp(&b.id))
        });

        Ok(results
            .into_iter()
            .take(limit)
            .map(|(record, score)| (record.clone(), score))
            .collect())
    }

    async fn delete_document(
        &self,
        index: &str,
        document_id: &str,
    ) -> Result<(), DocAssistError> {
        let mut indexes = self.indexes.write().await;

        if let Some(idx) = indexes.get_mut(index) {
            idx.records
                .retain(|_, record| first_tag(&record.tags, DOCUMENT_ID_TAG) != Some(document_id));
        }

        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = a.iter().zip(b).map(|(a, b)| a * b).sum::<f32>();
    let norm_a = a.iter().map(|a| a * a).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|b| b * b).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::{cosine_similarity, InMemoryDb};
    use crate::{
        core::{
            memory::{MemoryDb, MemoryRecord},
            model::{add_tag, TagCollection, DOCUMENT_ID_TAG},
        },
        error::{DocAssistErr, DocAssistError},
    };

    fn record(document_id: &str, part: &str, vector: Vec<f32>) -> MemoryRecord {
        let mut tags = TagCollection::new();
        add_tag(&mut tags, DOCUMENT_ID_TAG, document_id);
        MemoryRecord {
            id: MemoryRecord::id_for(document_id, part),
            vector,
            text: format!("{document_id} {part}"),
            tags,
        }
    }

    #[test]
    fn similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(0.0, cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]));
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let db = InMemoryDb::new();
        db.create_index("default", 2).await.unwrap();
        // Creating twice is fine
        db.create_index("default", 2).await.unwrap();

        db.upsert("default", record("a", "0", vec![1.0, 0.0]))
            .await
            .unwrap();
        db.upsert("default", record("a", "1", vec![0.7, 0.7]))
            .await
            .unwrap();
        db.upsert("default", record("b", "0", vec![0.0, 1.0]))
            .await
            .unwrap();

        let results = db.search("default", &[1.0, 0.1], 2).await.unwrap();
        assert_eq!(2, results.len());
        assert_eq!(MemoryRecord::id_for("a", "0"), results[0].0.id);
        assert_eq!(MemoryRecord::id_for("a", "1"), results[1].0.id);
        assert!(results[0].1 >= results[1].1);
    }

    #[tokio::test]
    async fn upsert_replaces_and_delete_removes() {
        let db = InMemoryDb::new();
        db.create_index("default", 2).await.unwrap();

        db.upsert("default", record("a", "0", vec![1.0, 0.0]))
            .await
            .unwrap();
        db.upsert("default", record("a", "0", vec![0.0, 1.0]))
            .await
            .unwrap();
        db.upsert("default", record("b", "0", vec![1.0, 0.0]))
            .await
            .unwrap();

        let results = db.search("default", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(2, results.len());

        db.delete_document("default", "a").await.unwrap();

        let results = db.search("default", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(1, results.len());
        assert_eq!(MemoryRecord::id_for("b", "0"), results[0].0.id);

        assert_eq!(vec!["default".to_string()], db.list_indexes().await.unwrap());
        db.delete_index("default").await.unwrap();
        assert!(db.list_indexes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_index() {
        let db = InMemoryDb::new();

        let result = db.upsert("nope", record("a", "0", vec![1.0])).await;
        assert!(matches!(
            result,
            Err(DocAssistError {
                error: DocAssistErr::DoesNotExist(_),
                ..
            })
        ));

        assert!(db.search("nope", &[1.0], 1).await.is_err());
    }
}
