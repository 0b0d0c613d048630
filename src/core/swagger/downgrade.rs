//! Rewrites OpenAPI 3.x path items into their Swagger 2.0 form.
//!
//! Input is expected to have its references inlined already.

use serde_json::{Map, Value};

const OPERATIONS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

/// Schema keywords that live directly on non-body parameters in 2.0.
const PARAMETER_SCHEMA_KEYS: [&str; 13] = [
    "type",
    "format",
    "items",
    "collectionFormat",
    "default",
    "maximum",
    "minimum",
    "maxLength",
    "minLength",
    "pattern",
    "enum",
    "multipleOf",
    "uniqueItems",
];

/// 3.x parameter keys with no 2.0 counterpart.
const PARAMETER_DROPPED_KEYS: [&str; 6] = [
    "style",
    "explode",
    "allowReserved",
    "example",
    "examples",
    "deprecated",
];

const JSON_MEDIA_TYPE: &str = "application/json";
const FORM_MEDIA_TYPES: [&str; 2] = ["application/x-www-form-urlencoded", "multipart/form-data"];

pub(super) fn path_item(item: Value) -> Value {
    let Value::Object(item) = item else {
        return item;
    };

    let mut result = Map::new();

    for (key, value) in item {
        if OPERATIONS.contains(&key.as_str()) {
            result.insert(key, operation(value));
        } else if key == "parameters" {
            result.insert(key, parameters(value));
        } else if key.starts_with("x-") {
            result.insert(key, value);
        }
    }

    Value::Object(result)
}

fn operation(operation: Value) -> Value {
    let Value::Object(operation) = operation else {
        return operation;
    };

    let mut result = Map::new();
    let mut params = vec![];
    let mut consumes = vec![];
    let mut produces = vec![];

    for (key, value) in operation {
        match key.as_str() {
            "parameters" => {
                if let Value::Array(values) = parameters(value) {
                    params.extend(values);
                }
            }
            "requestBody" => {
                let (body, media_types) = request_body(value);
                params.extend(body);
                consumes.extend(media_types);
            }
            "responses" => {
                let (responses, media_types) = responses(value);
                result.insert(key, responses);
                for media_type in media_types {
                    if !produces.contains(&media_type) {
                        produces.push(media_type);
                    }
                }
            }
            "callbacks" | "servers" => {}
            _ => {
                result.insert(key, value);
            }
        }
    }

    if !consumes.is_empty() {
        result.insert("consumes".to_string(), string_array(consumes));
    }

    if !produces.is_empty() {
        result.insert("produces".to_string(), string_array(produces));
    }

    if !params.is_empty() {
        result.insert("parameters".to_string(), Value::Array(params));
    }

    Value::Object(result)
}

fn parameters(parameters: Value) -> Value {
    let Value::Array(parameters) = parameters else {
        return parameters;
    };

    Value::Array(parameters.into_iter().map(parameter).collect())
}

fn parameter(parameter: Value) -> Value {
    let Value::Object(mut parameter) = parameter else {
        return parameter;
    };

    for key in PARAMETER_DROPPED_KEYS {
        parameter.remove(key);
    }

    let schema = parameter.remove("schema");
    parameter.remove("content");

    if let Some(Value::Object(schema)) = schema {
        for (key, value) in schema {
            if PARAMETER_SCHEMA_KEYS.contains(&key.as_str()) && !parameter.contains_key(&key) {
                parameter.insert(key, value);
            }
        }
    }

    if !parameter.contains_key("type") {
        parameter.insert("type".to_string(), Value::from("string"));
    }

    Value::Object(parameter)
}

/// Returns the parameters the body turns into and its media types.
fn request_body(body: Value) -> (Vec<Value>, Vec<String>) {
    let Value::Object(mut body) = body else {
        return (vec![], vec![]);
    };

    let required = body.remove("required").unwrap_or(Value::Bool(false));
    let description = body.remove("description");

    let Some(Value::Object(content)) = body.remove("content") else {
        return (vec![], vec![]);
    };

    let media_types: Vec<String> = content.keys().cloned().collect();

    let Some((media_type, media)) = preferred_media(&content) else {
        return (vec![], media_types);
    };

    let schema = media.get("schema").cloned().unwrap_or_else(|| {
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::from("object"));
        Value::Object(schema)
    });

    if FORM_MEDIA_TYPES.contains(&media_type) {
        return (form_parameters(&schema), media_types);
    }

    let mut param = Map::new();
    param.insert("name".to_string(), Value::from("body"));
    param.insert("in".to_string(), Value::from("body"));
    param.insert("required".to_string(), required);
    if let Some(description) = description {
        param.insert("description".to_string(), description);
    }
    param.insert("schema".to_string(), schema);

    (vec![Value::Object(param)], media_types)
}

/// One `formData` parameter per property of an object schema.
fn form_parameters(schema: &Value) -> Vec<Value> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return vec![];
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|required| required.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, property)| {
            let mut param = Map::new();
            param.insert("name".to_string(), Value::from(name.as_str()));
            param.insert("in".to_string(), Value::from("formData"));
            param.insert(
                "required".to_string(),
                Value::Bool(required.contains(&name.as_str())),
            );

            if let Some(description) = property.get("description") {
                param.insert("description".to_string(), description.clone());
            }

            let binary = property.get("format").and_then(Value::as_str) == Some("binary");

            if binary {
                param.insert("type".to_string(), Value::from("file"));
            } else if let Some(property) = property.as_object() {
                for (key, value) in property {
                    if PARAMETER_SCHEMA_KEYS.contains(&key.as_str()) {
                        param.insert(key.clone(), value.clone());
                    }
                }
            }

            if !param.contains_key("type") {
                param.insert("type".to_string(), Value::from("string"));
            }

            Value::Object(param)
        })
        .collect()
}

/// Returns the rewritten responses and every media type they produce.
fn responses(responses: Value) -> (Value, Vec<String>) {
    let Value::Object(responses) = responses else {
        return (responses, vec![]);
    };

    let mut media_types = vec![];
    let mut result = Map::new();

    for (status, response) in responses {
        let Value::Object(mut response) = response else {
            result.insert(status, response);
            continue;
        };

        let mut rewritten = Map::new();

        let description = response
            .remove("description")
            .unwrap_or_else(|| Value::from(""));
        rewritten.insert("description".to_string(), description);

        if let Some(Value::Object(content)) = response.remove("content") {
            media_types.extend(content.keys().cloned());
            if let Some(schema) = preferred_media(&content).and_then(|(_, m)| m.get("schema")) {
                rewritten.insert("schema".to_string(), schema.clone());
            }
        }

        if let Some(Value::Object(headers)) = response.remove("headers") {
            let headers = headers
                .into_iter()
                .map(|(name, header)| (name, header_object(header)))
                .collect();
            rewritten.insert("headers".to_string(), Value::Object(headers));
        }

        for (key, value) in response {
            if key.starts_with("x-") {
                rewritten.insert(key, value);
            }
        }

        result.insert(status, Value::Object(rewritten));
    }

    (Value::Object(result), media_types)
}

fn header_object(header: Value) -> Value {
    let Value::Object(mut header) = header else {
        return header;
    };

    let mut result = Map::new();

    if let Some(description) = header.remove("description") {
        result.insert("description".to_string(), description);
    }

    if let Some(Value::Object(schema)) = header.remove("schema") {
        for (key, value) in schema {
            if PARAMETER_SCHEMA_KEYS.contains(&key.as_str()) {
                result.insert(key, value);
            }
        }
    }

    if !result.contains_key("type") {
        result.insert("type".to_string(), Value::from("string"));
    }

    Value::Object(result)
}

/// JSON if present, otherwise the first listed media type.
fn preferred_media(content: &Map<String, Value>) -> Option<(&str, &Value)> {
    content
        .iter()
        .find(|(media_type, _)| media_type.as_str() == JSON_MEDIA_TYPE)
        .or_else(|| content.iter().next())
        .map(|(media_type, media)| (media_type.as_str(), media))
}

/// Rewrites `components.securitySchemes` into 2.0 `securityDefinitions`.
/// Schemes with no 2.0 counterpart, i.e. `openIdConnect` and non basic/bearer `http`, are dropped.
pub(super) fn security_schemes(schemes: Value) -> Map<String, Value> {
    let Value::Object(schemes) = schemes else {
        return Map::new();
    };

    schemes
        .into_iter()
        .filter_map(|(name, scheme)| Some((name, security_scheme(scheme)?)))
        .collect()
}

fn security_scheme(scheme: Value) -> Option<Value> {
    let Value::Object(mut scheme) = scheme else {
        return None;
    };

    let description = scheme.remove("description");
    let ty = scheme.get("type").and_then(Value::as_str)?.to_string();

    let mut result = match ty.as_str() {
        "apiKey" => {
            let mut result = Map::new();
            result.insert("type".to_string(), Value::from("apiKey"));
            result.insert("name".to_string(), scheme.remove("name")?);
            result.insert("in".to_string(), scheme.remove("in")?);
            result
        }
        "http" => match scheme.get("scheme").and_then(Value::as_str)? {
            s if s.eq_ignore_ascii_case("basic") => {
                let mut result = Map::new();
                result.insert("type".to_string(), Value::from("basic"));
                result
            }
            // 2.0 has no bearer scheme, the token goes in the header as is.
            s if s.eq_ignore_ascii_case("bearer") => {
                let mut result = Map::new();
                result.insert("type".to_string(), Value::from("apiKey"));
                result.insert("name".to_string(), Value::from("Authorization"));
                result.insert("in".to_string(), Value::from("header"));
                result
            }
            _ => return None,
        },
        "oauth2" => oauth2_flow(scheme.remove("flows")?)?,
        _ => return None,
    };

    if let Some(description) = description {
        result.insert("description".to_string(), description);
    }

    Some(Value::Object(result))
}

/// 2.0 describes a single flow per scheme, the first one found in 3.x flow order is used.
fn oauth2_flow(flows: Value) -> Option<Map<String, Value>> {
    let Value::Object(mut flows) = flows else {
        return None;
    };

    let (flow, mut definition) = [
        ("implicit", "implicit"),
        ("password", "password"),
        ("clientCredentials", "application"),
        ("authorizationCode", "accessCode"),
    ]
    .into_iter()
    .find_map(|(from, to)| match flows.remove(from) {
        Some(Value::Object(definition)) => Some((to, definition)),
        _ => None,
    })?;

    let mut result = Map::new();
    result.insert("type".to_string(), Value::from("oauth2"));
    result.insert("flow".to_string(), Value::from(flow));

    for key in ["authorizationUrl", "tokenUrl"] {
        if let Some(url) = definition.remove(key) {
            result.insert(key.to_string(), url);
        }
    }

    result.insert(
        "scopes".to_string(),
        definition
            .remove("scopes")
            .unwrap_or_else(|| Value::Object(Map::new())),
    );

    Some(result)
}

fn string_array(values: Vec<String>) -> Value {
    Value::Array(values.into_iter().map(Value::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_becomes_body_parameter() {
        let item = json!({
            "post": {
                "operationId": "createPet",
                "requestBody": {
                    "required": true,
                    "content": {
                        "application/xml": { "schema": { "type": "string" } },
                        "application/json": { "schema": { "type": "object" } }
                    }
                },
                "responses": {
                    "201": { "description": "Created" }
                }
            }
        });

        let post = &path_item(item)["post"];

        assert_eq!(
            json!([{
                "name": "body",
                "in": "body",
                "required": true,
                "schema": { "type": "object" }
            }]),
            post["parameters"]
        );
        assert_eq!(json!(["application/xml", "application/json"]), post["consumes"]);
        assert!(post.get("requestBody").is_none());
    }

    #[test]
    fn parameter_schema_is_hoisted() {
        let item = json!({
            "parameters": [{
                "name": "limit",
                "in": "query",
                "style": "form",
                "schema": { "type": "integer", "format": "int32", "maximum": 100 }
            }]
        });

        assert_eq!(
            json!({
                "parameters": [{
                    "name": "limit",
                    "in": "query",
                    "type": "integer",
                    "format": "int32",
                    "maximum": 100
                }]
            }),
            path_item(item)
        );
    }

    #[test]
    fn responses_use_json_schema_and_headers() {
        let item = json!({
            "get": {
                "responses": {
                    "200": {
                        "description": "ok",
                        "headers": { "x-next": { "schema": { "type": "string" } } },
                        "content": {
                            "application/json": { "schema": { "type": "array" } }
                        }
                    },
                    "default": {
                        "content": { "text/plain": { "schema": { "type": "string" } } }
                    }
                }
            }
        });

        let get = &path_item(item)["get"];

        assert_eq!(
            json!({
                "200": {
                    "description": "ok",
                    "schema": { "type": "array" },
                    "headers": { "x-next": { "type": "string" } }
                },
                "default": {
                    "description": "",
                    "schema": { "type": "string" }
                }
            }),
            get["responses"]
        );
        assert_eq!(json!(["application/json", "text/plain"]), get["produces"]);
    }

    #[test]
    fn multipart_body_becomes_form_data() {
        let item = json!({
            "put": {
                "requestBody": {
                    "content": {
                        "multipart/form-data": {
                            "schema": {
                                "type": "object",
                                "required": ["photo"],
                                "properties": {
                                    "caption": { "type": "string" },
                                    "photo": { "type": "string", "format": "binary" }
                                }
                            }
                        }
                    }
                },
                "responses": {}
            }
        });

        let put = &path_item(item)["put"];

        assert_eq!(
            json!([
                { "name": "caption", "in": "formData", "required": false, "type": "string" },
                { "name": "photo", "in": "formData", "required": true, "type": "file" }
            ]),
            put["parameters"]
        );
        assert_eq!(json!(["multipart/form-data"]), put["consumes"]);
    }

    #[test]
    fn security_schemes_become_definitions() {
        let schemes = json!({
            "key": { "type": "apiKey", "name": "api_key", "in": "header" },
            "basic": { "type": "http", "scheme": "basic", "description": "Basic auth" },
            "bearer": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" },
            "oauth": {
                "type": "oauth2",
                "flows": {
                    "authorizationCode": {
                        "authorizationUrl": "https://example.com/authorize",
                        "tokenUrl": "https://example.com/token",
                        "scopes": { "read:pets": "Read pets" }
                    }
                }
            },
            "oidc": { "type": "openIdConnect", "openIdConnectUrl": "https://example.com/.well-known" }
        });

        assert_eq!(
            json!({
                "key": { "type": "apiKey", "name": "api_key", "in": "header" },
                "basic": { "type": "basic", "description": "Basic auth" },
                "bearer": { "type": "apiKey", "name": "Authorization", "in": "header" },
                "oauth": {
                    "type": "oauth2",
                    "flow": "accessCode",
                    "authorizationUrl": "https://example.com/authorize",
                    "tokenUrl": "https://example.com/token",
                    "scopes": { "read:pets": "Read pets" }
                }
            }),
            Value::Object(security_schemes(schemes))
        );
    }

    #[test]
    fn unsupported_keys_are_dropped() {
        let item = json!({
            "summary": "Pets",
            "servers": [{ "url": "https://other.example.com" }],
            "trace": { "responses": {} },
            "x-internal": true,
            "get": {
                "callbacks": { "done": {} },
                "responses": {}
            }
        });

        assert_eq!(
            json!({
                "x-internal": true,
                "get": { "responses": {} }
            }),
            path_item(item)
        );
    }
}
