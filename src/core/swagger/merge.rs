use super::ApiDocument;
use crate::{
    core::model::{first_tag, TagCollection, API_TOKEN_TAG},
    err,
    error::DocAssistError,
};
use serde::{Deserialize, Serialize};

/// A partition obtained from the memory, together with the tags it was stored with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartitionRecord {
    /// Serialized single endpoint document.
    pub text: String,

    /// Tags of the stored partition.
    pub tags: TagCollection,
}

/// A document reconstructed from a set of partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    /// Path keys of the merged document, in insertion order.
    pub endpoints: Vec<String>,

    /// The serialized merged document. Empty when nothing was merged.
    pub document: String,

    /// The API key stored with the first partition.
    pub api_key: Option<String>,
}

/// Merge the path items of the given partitions into a single document.
///
/// All records must originate from the same source document; shared metadata
/// is taken from the first record and the rest of it is discarded. A path key
/// appearing in more than one record is rejected.
///
/// Merging zero records yields an empty [MergeResult].
///
/// * `records`: Partitions in ranking order.
pub fn merge(records: &[PartitionRecord]) -> Result<MergeResult, DocAssistError> {
    let Some(first) = records.first() else {
        return Ok(MergeResult::default());
    };

    let api_key = first_tag(&first.tags, API_TOKEN_TAG)
        .filter(|key| !key.is_empty())
        .map(String::from);

    let documents = records
        .iter()
        .map(|record| ApiDocument::parse(&record.text))
        .collect::<Result<Vec<_>, _>>()?;

    let mut documents = documents.into_iter();

    // Checked above
    let Some(mut merged) = documents.next() else {
        return Ok(MergeResult::default());
    };

    let mut paths = std::mem::take(&mut merged.paths);

    for document in documents {
        for (key, item) in document.paths {
            if paths.contains_key(&key) {
                return err!(DuplicatePath, "'{key}' appears in more than one partition");
            }
            paths.insert(key, item);
        }
    }

    let endpoints = paths.keys().cloned().collect();

    merged.paths = paths;

    let document = merged.serialize()?;

    Ok(MergeResult {
        endpoints,
        document,
        api_key,
    })
}
