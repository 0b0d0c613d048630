use crate::{
    core::model::{
        first_tag, TagCollection, DOCUMENT_ID_TAG, FILE_ID_TAG, FILE_TYPE_TAG, PARTITION_NUMBER_TAG,
        SWAGGER_FILE_TAG,
    },
    error::DocAssistError,
};
use serde::Serialize;

/// A partition embedded and stored in a [MemoryDb].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryRecord {
    /// Unique record ID. See [MemoryRecord::id_for].
    pub id: String,

    #[serde(skip)]
    pub vector: Vec<f32>,

    /// The partition text.
    pub text: String,

    /// Inherited pipeline tags, the endpoint tag and the reserved tags.
    pub tags: TagCollection,
}

impl MemoryRecord {
    /// Deterministic ID so re-importing a document overwrites its previous records.
    ///
    /// * `document_id`: Document ID.
    /// * `partition_id`: Name of the partition artifact the record is generated from.
    pub fn id_for(document_id: &str, partition_id: &str) -> String {
        format!("d={document_id}//p={partition_id}")
    }
}

/// Operations on the similarity index partitions are stored in.
#[async_trait::async_trait]
pub trait MemoryDb {
    fn id(&self) -> &'static str;

    /// List the indexes in the database.
    async fn list_indexes(&self) -> Result<Vec<String>, DocAssistError>;

    /// Create the index if it doesn't exist.
    ///
    /// * `index`: Index name.
    /// * `size`: Vector size of the index.
    async fn create_index(&self, index: &str, size: usize) -> Result<(), DocAssistError>;

    /// Delete the index along with all its records.
    ///
    /// * `index`: Index name.
    async fn delete_index(&self, index: &str) -> Result<(), DocAssistError>;

    /// Insert the record, replacing any record with the same ID.
    ///
    /// * `index`: Index name.
    /// * `record`: The record to store.
    async fn upsert(&self, index: &str, record: MemoryRecord) -> Result<(), DocAssistError>;

    /// Query the index for records similar to `vector`, ordered by descending relevance.
    ///
    /// * `index`: Index name.
    /// * `vector`: Query vector.
    /// * `limit`: Maximum amount of records to return.
    async fn search(
        &self,
        index: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryRecord, f32)>, DocAssistError>;

    /// Delete all the records tagged with the document ID.
    ///
    /// * `index`: Index name.
    /// * `document_id`: Document ID.
    async fn delete_document(&self, index: &str, document_id: &str)
        -> Result<(), DocAssistError>;
}

/// Search results grouped by the file they were generated from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub query: String,
    pub results: Vec<Citation>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Partitions of a single source file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub document_id: String,
    pub file_id: String,
    pub index: String,
    pub source_name: String,
    pub source_content_type: String,
    pub partitions: Vec<CitationPartition>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationPartition {
    pub text: String,
    pub relevance: f32,
    pub partition_number: usize,
    pub tags: TagCollection,
}

/// Group ranked records into citations. Citations are ordered by their best
/// relevance and keep the ranking order of their partitions.
///
/// * `index`: The index the records come from.
/// * `query`: The query the records were obtained with.
/// * `records`: Records in descending relevance order.
pub fn group_citations(
    index: &str,
    query: &str,
    records: Vec<(MemoryRecord, f32)>,
) -> SearchResult {
    let mut results: Vec<Citation> = vec![];

    for (record, relevance) in records {
        let document_id = first_tag(&record.tags, DOCUMENT_ID_TAG)
            .unwrap_or_default()
            .to_string();
        let file_id = first_tag(&record.tags, FILE_ID_TAG)
            .unwrap_or_default()
            .to_string();

        let partition = CitationPartition {
            partition_number: first_tag(&record.tags, PARTITION_NUMBER_TAG)
                .and_then(|n| n.parse().ok())
                .unwrap_or_default(),
            text: record.text,
            relevance,
            tags: record.tags,
        };

        match results
            .iter_mut()
            .find(|c| c.document_id == document_id && c.file_id == file_id)
        {
            Some(citation) => citation.partitions.push(partition),
            None => results.push(Citation {
                document_id,
                file_id,
                index: index.to_string(),
                source_name: first_tag(&partition.tags, SWAGGER_FILE_TAG)
                    .unwrap_or_default()
                    .to_string(),
                source_content_type: first_tag(&partition.tags, FILE_TYPE_TAG)
                    .unwrap_or_default()
                    .to_string(),
                partitions: vec![partition],
            }),
        }
    }

    SearchResult {
        query: query.to_string(),
        results,
    }
}
