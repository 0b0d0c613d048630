use crate::core::memory::{MemoryDb, MemoryRecord};
use crate::core::model::{first_tag, DOCUMENT_ID_TAG};
use crate::error::DocAssistError;
use crate::map_err;
use qdrant_client::qdrant::vectors_config::Config;
use qdrant_client::qdrant::with_payload_selector::SelectorOptions;
use qdrant_client::qdrant::{
    value, Condition, CreateCollection, DeletePointsBuilder, Distance, Filter, PointStruct,
    SearchParams, SearchPoints, UpsertPointsBuilder, Value, VectorParams, VectorsConfig,
    WithPayloadSelector,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Holds the string ID of the record.
const RECORD_ID_PROPERTY: &str = "record_id";
/// Holds the partition text.
const TEXT_PROPERTY: &str = "text";
/// Holds the record tags, serialized as JSON.
const TAGS_PROPERTY: &str = "tags";
/// Holds the document ID so records can be deleted per document.
const DOCUMENT_ID_PROPERTY: &str = "document_id";

/// Alias for an arced Qdrant instance.
///
/// Qdrant only accepts UUIDs and integers as point IDs, so each point's ID is
/// derived from the record ID with a v5 UUID and the record ID is kept in the payload.
pub type QdrantDb = Arc<Qdrant>;

pub fn init(url: &str) -> QdrantDb {
    info!("Connecting to qdrant at {url}");
    Arc::new(
        Qdrant::from_url(url)
            .build()
            .expect("error initialising qdrant"),
    )
}

#[async_trait::async_trait]
impl MemoryDb for Qdrant {
    fn id(&self) -> &'static str {
        "qdrant"
    }

    async fn list_indexes(&self) -> Result<Vec<String>, DocAssistError> {
        Ok(map_err!(self.list_collections().await)
            .collections
            .into_iter()
            .map(|col| col.name)
            .collect())
    }

    async fn create_index(&self, index: &str, size: usize) -> Result<(), DocAssistError> {
        if self.list_indexes().await?.iter().any(|name| name == index) {
            return Ok(());
        }

        debug!("Creating collection '{index}' ({size})");

        let config = VectorsConfig {
            config: Some(Config::Params(VectorParams {
                size: size as u64,
                distance: Distance::Cosine.into(),
                ..Default::default()
            })),
        };

        let res = map_err!(
            self.create_collection(CreateCollection {
                collection_name: index.to_string(),
                vectors_config: Some(config),
                ..Default::default()
            })
            .await
        );

        debug_assert!(res.result);

        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), DocAssistError> {
        map_err!(self.delete_collection(index).await);
        Ok(())
    }

    async fn upsert(&self, index: &str, record: MemoryRecord) -> Result<(), DocAssistError> {
        let MemoryRecord {
            id,
            vector,
            text,
            tags,
        } = record;

        let document_id = first_tag(&tags, DOCUMENT_ID_TAG)
            .unwrap_or_default()
            .to_string();

        let mut payload = Payload::new();
        payload.insert(RECORD_ID_PROPERTY, id.clone());
        payload.insert(TEXT_PROPERTY, text);
        payload.insert(TAGS_PROPERTY, map_err!(serde_json::to_string(&tags)));
        payload.insert(DOCUMENT_ID_PROPERTY, document_id);

        let point = PointStruct::new(point_id(&id), vector, payload);

        map_err!(
            self.upsert_points(UpsertPointsBuilder::new(index, vec![point]).wait(true))
                .await
        );

        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryRecord, f32)>, DocAssistError> {
        let search_points = SearchPoints {
            collection_name: index.to_string(),
            vector: vector.to_vec(),
            filter: None,
            limit: limit as u64,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            params: Some(SearchParams::default()),
            ..Default::default()
        };

        let search_result = map_err!(self.search_points(search_points).await);

        let results = search_result
            .result
            .into_iter()
            .filter_map(|mut point| {
                let record = record_from_payload(&mut point.payload)?;
                Some((record, point.score))
            })
            .collect();

        Ok(results)
    }

    async fn delete_document(
        &self,
        index: &str,
        document_id: &str,
    ) -> Result<(), DocAssistError> {
        map_err!(
            self.delete_points(
                DeletePointsBuilder::new(index)
                    .points(Filter::must([Condition::matches(
                        DOCUMENT_ID_PROPERTY,
                        document_id.to_string(),
                    )]))
                    .wait(true),
            )
            .await
        );

        Ok(())
    }
}

fn point_id(record_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes()).to_string()
}

fn record_from_payload(payload: &mut HashMap<String, Value>) -> Option<MemoryRecord> {
    let id = take_string(payload, RECORD_ID_PROPERTY)?;
    let text = take_string(payload, TEXT_PROPERTY)?;
    let tags = take_string(payload, TAGS_PROPERTY)?;

    let tags = match serde_json::from_str(&tags) {
        Ok(tags) => tags,
        Err(e) => {
            warn!("Invalid tags on record '{id}': {e}");
            return None;
        }
    };

    Some(MemoryRecord {
        id,
        vector: vec![],
        text,
        tags,
    })
}

fn take_string(payload: &mut HashMap<String, Value>, key: &str) -> Option<String> {
    let Some(value) = payload.remove(key) else {
        warn!("Missing '{key}' property");
        return None;
    };

    match value.kind {
        Some(value::Kind::StringValue(s)) => Some(s),
        v => {
            warn!("Found unsupported value kind for '{key}': {v:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{point_id, record_from_payload, RECORD_ID_PROPERTY, TAGS_PROPERTY, TEXT_PROPERTY};
    use qdrant_client::qdrant::Value;
    use std::collections::HashMap;

    #[test]
    fn point_ids_are_stable_uuids() {
        let id = point_id("d=doc//p=part");
        assert_eq!(id, point_id("d=doc//p=part"));
        assert_ne!(id, point_id("d=doc//p=other"));
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn reads_records_from_payload() {
        let mut payload = HashMap::from([
            (RECORD_ID_PROPERTY.to_string(), Value::from("d=doc//p=part")),
            (TEXT_PROPERTY.to_string(), Value::from("{}")),
            (
                TAGS_PROPERTY.to_string(),
                Value::from(r#"{"endpoint":["/pets"]}"#),
            ),
        ]);

        let record = record_from_payload(&mut payload).unwrap();
        assert_eq!("d=doc//p=part", record.id);
        assert_eq!(vec!["/pets".to_string()], record.tags["endpoint"]);

        let mut payload = HashMap::from([(TEXT_PROPERTY.to_string(), Value::from("{}"))]);
        assert!(record_from_payload(&mut payload).is_none());
    }
}
