use super::ApiDocument;
use crate::error::DocAssistError;
use serde::Serialize;
use serde_json::Value;

/// Reported by [Split] right before it serializes a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Total amount of partitions the document yields.
    pub total: usize,

    /// Index of the partition about to be produced.
    pub current: usize,
}

/// A self contained document holding a single path key of its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPartition {
    /// The path key.
    pub endpoint: String,

    /// The serialized single endpoint document.
    pub text: String,
}

/// Parse `text` and return a lazy iterator of its per endpoint partitions.
///
/// Parsing happens eagerly so a malformed document is reported before anything is emitted.
/// `progress` is called once per partition, before the partition is serialized.
///
/// * `text`: The JSON or YAML source document.
/// * `progress`: Progress callback.
pub fn split<F>(text: &str, progress: F) -> Result<Split<F>, DocAssistError>
where
    F: FnMut(Progress),
{
    let mut document = ApiDocument::parse(text)?;

    let paths = std::mem::take(&mut document.paths);
    let total = paths.len();

    Ok(Split {
        document,
        paths: paths.into_iter().collect::<Vec<_>>().into_iter(),
        total,
        current: 0,
        progress,
    })
}

/// Single pass iterator over the partitions of a document. See [split].
pub struct Split<F> {
    /// The source document, without its paths.
    document: ApiDocument,
    paths: std::vec::IntoIter<(String, Value)>,
    total: usize,
    current: usize,
    progress: F,
}

impl<F> Split<F> {
    /// Total amount of partitions this iterator yields.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl<F> Iterator for Split<F>
where
    F: FnMut(Progress),
{
    type Item = Result<EndpointPartition, DocAssistError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (endpoint, item) = self.paths.next()?;

        (self.progress)(Progress {
            total: self.total,
            current: self.current,
        });
        self.current += 1;

        let text = self
            .document
            .serialize_paths(std::iter::once((&endpoint, &item)));

        Some(text.map(|text| EndpointPartition { endpoint, text }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

impl<F> ExactSizeIterator for Split<F> where F: FnMut(Progress) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::swagger::{
        tests::{PETSTORE_V2, PETSTORE_V3},
        Dialect,
    };
    use crate::error::DocAssistErr;

    #[test]
    fn emits_one_partition_per_path() {
        for source in [PETSTORE_V2, PETSTORE_V3] {
            let mut reports = vec![];
            let partitions = split(source, |p| reports.push(p))
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap();

            let paths = ApiDocument::parse(source).unwrap().paths;

            assert_eq!(paths.len(), partitions.len());
            assert_eq!(
                paths.keys().collect::<Vec<_>>(),
                partitions.iter().map(|p| &p.endpoint).collect::<Vec<_>>()
            );
            assert_eq!(
                (0..paths.len())
                    .map(|current| Progress {
                        total: paths.len(),
                        current
                    })
                    .collect::<Vec<_>>(),
                reports
            );
        }
    }

    #[test]
    fn partitions_are_self_contained() {
        let source = ApiDocument::parse(PETSTORE_V3).unwrap();

        for partition in split(PETSTORE_V3, |_| {}).unwrap() {
            let partition = partition.unwrap();
            let document = ApiDocument::parse(&partition.text).unwrap();

            assert_eq!(Dialect::Swagger2, document.dialect);
            assert_eq!(
                vec![&partition.endpoint],
                document.paths.keys().collect::<Vec<_>>()
            );
            assert_eq!(source.info, document.info);
            assert_eq!(source.servers, document.servers);
            assert_eq!(source.tags, document.tags);
            assert!(!partition.text.contains("\"$ref\""));
        }
    }

    #[test]
    fn partitions_define_their_security_schemes() {
        let swagger = r#"{
            "swagger": "2.0",
            "info": { "title": "Keys", "version": "1" },
            "securityDefinitions": {
                "key": { "type": "apiKey", "name": "api_key", "in": "header" },
                "basic": { "type": "basic" }
            },
            "security": [{ "key": [] }],
            "paths": {
                "/a": { "get": { "responses": {} } },
                "/b": { "get": { "security": [{ "basic": [] }], "responses": {} } }
            }
        }"#;

        let openapi = r#"
openapi: 3.0.3
info:
  title: Keys
  version: "1"
security:
  - key: []
paths:
  /a:
    get:
      responses: {}
  /b:
    get:
      security:
        - bearer: []
      responses: {}
components:
  securitySchemes:
    key:
      type: apiKey
      name: api_key
      in: query
    bearer:
      type: http
      scheme: bearer
"#;

        for source in [swagger, openapi] {
            for partition in split(source, |_| {}).unwrap() {
                let partition = partition.unwrap();
                let output: Value = serde_json::from_str(&partition.text).unwrap();
                let definitions = output["securityDefinitions"].as_object().unwrap();

                let mut requirements = output["security"].as_array().unwrap().clone();
                for operation in output["paths"][&partition.endpoint].as_object().unwrap().values() {
                    if let Some(security) = operation.get("security").and_then(Value::as_array) {
                        requirements.extend(security.iter().cloned());
                    }
                }

                assert!(!requirements.is_empty());
                for requirement in requirements {
                    for name in requirement.as_object().unwrap().keys() {
                        assert!(
                            definitions.contains_key(name),
                            "'{name}' not defined in {}",
                            partition.text
                        );
                    }
                }

                assert_eq!("apiKey", definitions["key"]["type"]);
                assert_eq!("api_key", definitions["key"]["name"]);
            }
        }
    }

    #[test]
    fn progress_is_reported_lazily() {
        let mut reports = 0;
        {
            let mut partitions = split(PETSTORE_V2, |_| reports += 1).unwrap();
            assert_eq!(3, partitions.total());
            assert_eq!(3, partitions.len());
            partitions.next().unwrap().unwrap();
        }
        assert_eq!(1, reports);
    }

    #[test]
    fn malformed_document_emits_nothing() {
        let mut reports = 0;
        let result = split("{not valid json", |_| reports += 1);

        assert!(matches!(
            result,
            Err(DocAssistError {
                error: DocAssistErr::MalformedDocument(_),
                ..
            })
        ));
        assert_eq!(0, reports);
    }

    #[test]
    fn empty_paths_yield_nothing() {
        let source = r#"{"swagger": "2.0", "info": {"title": "t", "version": "1"}, "paths": {}}"#;
        let mut partitions = split(source, |_| panic!("no progress expected")).unwrap();
        assert_eq!(0, partitions.total());
        assert!(partitions.next().is_none());
    }
}
