use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Returns a copy of `value` with every local `$ref` replaced by its target in `workspace`.
///
/// References that point back into one of their own ancestors are replaced with a plain
/// object schema. References that cannot be resolved are kept as they are.
pub(super) fn inline(value: &Value, workspace: &Value) -> Value {
    let mut stack = vec![];
    resolve(value, workspace, &mut stack)
}

fn resolve<'a>(value: &'a Value, workspace: &'a Value, stack: &mut Vec<&'a str>) -> Value {
    match value {
        Value::Object(object) => {
            if let Some(pointer) = local_ref(object) {
                return resolve_ref(pointer, workspace, stack).unwrap_or_else(|| value.clone());
            }

            let object = object
                .iter()
                .map(|(key, value)| (key.clone(), resolve(value, workspace, stack)))
                .collect();

            Value::Object(object)
        }
        Value::Array(values) => Value::Array(
            values
                .iter()
                .map(|value| resolve(value, workspace, stack))
                .collect(),
        ),
        _ => value.clone(),
    }
}

fn resolve_ref<'a>(
    pointer: &'a str,
    workspace: &'a Value,
    stack: &mut Vec<&'a str>,
) -> Option<Value> {
    if stack.contains(&pointer) {
        debug!("Recursive reference '{pointer}', replacing with object schema");
        let mut object = Map::new();
        object.insert("type".to_string(), Value::from("object"));
        return Some(Value::Object(object));
    }

    let Some(target) = workspace.pointer(&pointer[1..]) else {
        warn!("Unresolved reference '{pointer}'");
        return None;
    };

    stack.push(pointer);
    let resolved = resolve(target, workspace, stack);
    stack.pop();

    Some(resolved)
}

/// Returns the `$ref` of the object if it points into the same document.
fn local_ref(object: &Map<String, Value>) -> Option<&str> {
    object
        .get("$ref")
        .and_then(Value::as_str)
        .filter(|pointer| pointer.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inlines_nested_references() {
        let workspace = json!({
            "definitions": {
                "Pet": { "type": "object", "properties": { "tag": { "$ref": "#/definitions/Tag" } } },
                "Tag": { "type": "string" }
            }
        });

        let value = json!({ "schema": { "$ref": "#/definitions/Pet" } });

        assert_eq!(
            json!({
                "schema": { "type": "object", "properties": { "tag": { "type": "string" } } }
            }),
            inline(&value, &workspace)
        );
    }

    #[test]
    fn recursive_references_terminate() {
        let workspace = json!({
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "children": { "type": "array", "items": { "$ref": "#/components/schemas/Node" } }
                        }
                    }
                }
            }
        });

        let value = json!({ "$ref": "#/components/schemas/Node" });
        let inlined = inline(&value, &workspace);

        assert_eq!(
            json!({ "type": "object" }),
            inlined["properties"]["children"]["items"]
        );
    }

    #[test]
    fn sibling_references_are_both_inlined() {
        let workspace = json!({ "definitions": { "Id": { "type": "integer" } } });
        let value = json!([{ "$ref": "#/definitions/Id" }, { "$ref": "#/definitions/Id" }]);

        assert_eq!(
            json!([{ "type": "integer" }, { "type": "integer" }]),
            inline(&value, &workspace)
        );
    }

    #[test]
    fn unresolved_and_external_references_are_kept() {
        let workspace = json!({});
        let value = json!({
            "a": { "$ref": "#/definitions/Missing" },
            "b": { "$ref": "other.yaml#/Pet" }
        });

        assert_eq!(value, inline(&value, &workspace));
    }
}
