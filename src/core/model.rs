//! Models shared across the core modules.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Tags attached to documents, artifacts and memory records. Every tag can hold multiple values.
pub type TagCollection = BTreeMap<String, Vec<String>>;

/// Tag holding the name of the file a partition originates from.
pub const SWAGGER_FILE_TAG: &str = "swaggerFile";
/// Tag holding the path key of the endpoint stored in a partition.
pub const ENDPOINT_TAG: &str = "endpoint";
/// Tag holding the API key used when calling the described API.
pub const API_TOKEN_TAG: &str = "apiToken";

/// Reserved tag holding the ID of the imported document.
pub const DOCUMENT_ID_TAG: &str = "__document_id";
/// Reserved tag holding the ID of the uploaded file a record was generated from.
pub const FILE_ID_TAG: &str = "__file_id";
/// Reserved tag holding the ID of the partition artifact a record was generated from.
pub const FILE_PART_TAG: &str = "__file_part";
/// Reserved tag holding the index of the partition within its file.
pub const PARTITION_NUMBER_TAG: &str = "__part_n";
/// Reserved tag holding the MIME type of the uploaded file.
pub const FILE_TYPE_TAG: &str = "__file_type";

/// Append `value` to the tag `key`.
pub fn add_tag(tags: &mut TagCollection, key: &str, value: impl Into<String>) {
    tags.entry(key.to_string()).or_default().push(value.into());
}

/// Returns the first value of the tag `key`.
pub fn first_tag<'a>(tags: &'a TagCollection, key: &str) -> Option<&'a str> {
    tags.get(key).and_then(|values| values.first()).map(String::as_str)
}

/// Hex encoded SHA-256 digest of `input`.
pub fn sha256(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_keep_every_value() {
        let mut tags = TagCollection::new();
        add_tag(&mut tags, ENDPOINT_TAG, "/pets");
        add_tag(&mut tags, ENDPOINT_TAG, "/orders");

        assert_eq!(Some("/pets"), first_tag(&tags, ENDPOINT_TAG));
        assert_eq!(2, tags[ENDPOINT_TAG].len());
        assert_eq!(None, first_tag(&tags, API_TOKEN_TAG));
    }

    #[test]
    fn sha256_is_hex() {
        let hash = sha256(b"Hello world.");
        assert_eq!(64, hash.len());
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, sha256(b"Hello world."));
    }
}
