//! Parsing, partitioning and merging of OpenAPI/Swagger documents.
//!
//! Documents are read in either the Swagger 2.0 or OpenAPI 3.x dialect, from JSON or YAML,
//! and are always written back as self contained Swagger 2.0 JSON.

use crate::{err, error::DocAssistError, map_err};
use serde_json::{Map, Value};
use tracing::warn;

mod downgrade;
mod merge;
mod reference;
mod split;

pub use merge::{merge, MergeResult, PartitionRecord};
pub use split::{split, EndpointPartition, Progress, Split};

/// The specification version written by [ApiDocument::serialize].
pub const SWAGGER_VERSION: &str = "2.0";

/// Root keys holding the targets of local references.
const WORKSPACE_KEYS: [&str; 5] = [
    "components",
    "definitions",
    "parameters",
    "responses",
    "securityDefinitions",
];

/// The specification family a document was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `swagger: "2.0"`
    Swagger2,

    /// `openapi: "3.x.y"`
    OpenApi3,
}

impl Dialect {
    fn detect(root: &Map<String, Value>) -> Result<Self, DocAssistError> {
        if let Some(version) = root.get("swagger") {
            return match version.as_str() {
                Some(v) if v.starts_with('2') => Ok(Self::Swagger2),
                _ => err!(MalformedDocument, "unsupported swagger version: {version}"),
            };
        }

        if let Some(version) = root.get("openapi") {
            return match version.as_str() {
                Some(v) if v.starts_with('3') => Ok(Self::OpenApi3),
                _ => err!(MalformedDocument, "unsupported openapi version: {version}"),
            };
        }

        err!(MalformedDocument, "missing `swagger` or `openapi` version")
    }
}

/// In memory form of an API description document.
///
/// Everything except the path keys and the server URLs is kept as opaque JSON
/// so it can be copied between documents without being interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiDocument {
    /// The dialect the document was read in. Determines how path items get written.
    pub dialect: Dialect,

    /// The `info` block.
    pub info: Value,

    /// Base URLs of the described API, in order of appearance.
    pub servers: Vec<String>,

    /// Path keys mapped to their path items, in order of appearance.
    pub paths: Map<String, Value>,

    /// The `externalDocs` block.
    pub external_docs: Option<Value>,

    /// Root level `x-` extensions.
    pub extensions: Map<String, Value>,

    /// Root level security requirements.
    pub security: Vec<Value>,

    /// Root level tags.
    pub tags: Vec<Value>,

    /// Targets of local references, i.e. `components` or `definitions` and friends.
    /// Used to inline references when writing. Only the security schemes get written.
    pub workspace: Value,
}

impl ApiDocument {
    /// Parse a JSON or YAML document. Input starting with `{` is treated as JSON.
    ///
    /// * `text`: The document source.
    pub fn parse(text: &str) -> Result<Self, DocAssistError> {
        let text = text.trim_start();

        if text.is_empty() {
            return err!(MalformedDocument, "empty document");
        }

        let root: Value = if text.starts_with('{') {
            match serde_json::from_str(text) {
                Ok(root) => root,
                Err(e) => return err!(MalformedDocument, "invalid JSON; {e}"),
            }
        } else {
            match serde_yaml::from_str(text) {
                Ok(root) => root,
                Err(e) => return err!(MalformedDocument, "invalid YAML; {e}"),
            }
        };

        let Value::Object(mut root) = root else {
            return err!(MalformedDocument, "document root is not a mapping");
        };

        let dialect = Dialect::detect(&root)?;

        let Some(Value::Object(paths)) = root.remove("paths") else {
            return err!(MalformedDocument, "missing `paths` mapping");
        };

        let info = match root.remove("info") {
            Some(info @ Value::Object(_)) => info,
            _ => return err!(MalformedDocument, "missing `info` mapping"),
        };

        let servers = match dialect {
            Dialect::Swagger2 => swagger_servers(&root),
            Dialect::OpenApi3 => openapi_servers(&root),
        };

        let external_docs = root.remove("externalDocs");
        let security = take_array(&mut root, "security");
        let tags = take_array(&mut root, "tags");

        let mut workspace = Map::new();
        for key in WORKSPACE_KEYS {
            if let Some(value) = root.remove(key) {
                workspace.insert(key.to_string(), value);
            }
        }

        let extensions = root
            .into_iter()
            .filter(|(key, _)| key.starts_with("x-"))
            .collect();

        Ok(Self {
            dialect,
            info,
            servers,
            paths,
            external_docs,
            extensions,
            security,
            tags,
            workspace: Value::Object(workspace),
        })
    }

    /// Write the document as Swagger 2.0 JSON with all local references inlined.
    pub fn serialize(&self) -> Result<String, DocAssistError> {
        self.serialize_paths(self.paths.iter())
    }

    /// Write the document's shared metadata together with the given path items instead
    /// of the document's own.
    ///
    /// * `paths`: The path keys and items to write.
    pub(crate) fn serialize_paths<'a>(
        &self,
        paths: impl Iterator<Item = (&'a String, &'a Value)>,
    ) -> Result<String, DocAssistError> {
        let mut root = Map::new();

        root.insert("swagger".to_string(), Value::from(SWAGGER_VERSION));
        root.insert("info".to_string(), self.info.clone());

        write_location(&mut root, &self.servers);

        let mut items = Map::new();
        for (key, item) in paths {
            let item = reference::inline(item, &self.workspace);
            let item = match self.dialect {
                Dialect::Swagger2 => item,
                Dialect::OpenApi3 => downgrade::path_item(item),
            };
            items.insert(key.clone(), item);
        }
        root.insert("paths".to_string(), Value::Object(items));

        let definitions = self.security_definitions();
        if !definitions.is_empty() {
            root.insert("securityDefinitions".to_string(), Value::Object(definitions));
        }

        if !self.security.is_empty() {
            root.insert("security".to_string(), Value::Array(self.security.clone()));
        }

        if !self.tags.is_empty() {
            root.insert("tags".to_string(), Value::Array(self.tags.clone()));
        }

        if let Some(ref docs) = self.external_docs {
            root.insert("externalDocs".to_string(), docs.clone());
        }

        for (key, value) in self.extensions.iter() {
            root.insert(key.clone(), value.clone());
        }

        Ok(map_err!(serde_json::to_string_pretty(&Value::Object(root))))
    }

    /// The security schemes named by root and operation level `security` requirements,
    /// in their 2.0 form.
    fn security_definitions(&self) -> Map<String, Value> {
        match self.dialect {
            Dialect::Swagger2 => match self.workspace.get("securityDefinitions") {
                Some(Value::Object(definitions)) => definitions.clone(),
                _ => Map::new(),
            },
            Dialect::OpenApi3 => match self.workspace.pointer("/components/securitySchemes") {
                Some(schemes) => {
                    downgrade::security_schemes(reference::inline(schemes, &self.workspace))
                }
                None => Map::new(),
            },
        }
    }
}

fn take_array(root: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match root.remove(key) {
        Some(Value::Array(values)) => values,
        _ => vec![],
    }
}

/// Servers from `schemes`, `host` and `basePath`.
fn swagger_servers(root: &Map<String, Value>) -> Vec<String> {
    let base_path = root.get("basePath").and_then(Value::as_str).unwrap_or("");

    let Some(host) = root.get("host").and_then(Value::as_str) else {
        if base_path.is_empty() {
            return vec![];
        }
        return vec![base_path.to_string()];
    };

    let schemes = root
        .get("schemes")
        .and_then(Value::as_array)
        .map(|schemes| schemes.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    if schemes.is_empty() {
        return vec![format!("https://{host}{base_path}")];
    }

    schemes
        .into_iter()
        .map(|scheme| format!("{scheme}://{host}{base_path}"))
        .collect()
}

/// Server URLs with their variables substituted by the variables' defaults.
fn openapi_servers(root: &Map<String, Value>) -> Vec<String> {
    let Some(servers) = root.get("servers").and_then(Value::as_array) else {
        return vec![];
    };

    servers
        .iter()
        .filter_map(|server| {
            let mut url = server.get("url")?.as_str()?.to_string();

            if let Some(variables) = server.get("variables").and_then(Value::as_object) {
                for (name, variable) in variables {
                    if let Some(default) = variable.get("default").and_then(Value::as_str) {
                        url = url.replace(&format!("{{{name}}}"), default);
                    }
                }
            }

            Some(url)
        })
        .collect()
}

/// Splits a server URL into its scheme, host and path.
fn split_url(url: &str) -> (Option<&str>, Option<&str>, &str) {
    let Some((scheme, rest)) = url.split_once("://") else {
        return (None, None, url);
    };

    match rest.find('/') {
        Some(i) => (Some(scheme), Some(&rest[..i]), &rest[i..]),
        None => (Some(scheme), Some(rest), ""),
    }
}

/// Writes `host`, `basePath` and `schemes` for the first server. Servers sharing
/// its host and base path contribute their schemes.
///
/// Other servers cannot be expressed in 2.0 and are lost, so a round trip of a
/// document with differing hosts or base paths only keeps the first server's location.
fn write_location(root: &mut Map<String, Value>, servers: &[String]) {
    let Some(first) = servers.first() else {
        return;
    };

    let (_, host, base_path) = split_url(first);

    let mut schemes = vec![];
    let mut dropped = vec![];
    for server in servers {
        match split_url(server) {
            (scheme, h, p) if h == host && p == base_path => {
                if let Some(scheme) = scheme {
                    if !schemes.contains(&scheme) {
                        schemes.push(scheme);
                    }
                }
            }
            _ => dropped.push(server.as_str()),
        }
    }

    if !dropped.is_empty() {
        warn!("Servers {dropped:?} differ from '{first}' in host or base path, dropping");
    }

    if let Some(host) = host {
        root.insert("host".to_string(), Value::from(host));
    }

    if !base_path.is_empty() {
        root.insert("basePath".to_string(), Value::from(base_path));
    }

    if !schemes.is_empty() {
        root.insert(
            "schemes".to_string(),
            Value::Array(schemes.into_iter().map(Value::from).collect()),
        );
    }
}
