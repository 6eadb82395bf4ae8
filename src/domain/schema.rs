//! Conversion of tool input schemas into strict function-calling specs.
//!
//! The chat-completion service is told that every declared property is
//! required and that no other property may appear, so the model cannot
//! invent arguments the tool server does not understand.

use super::types::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Function declaration in the shape expected by the chat-completion API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    pub strict: bool,
}

/// Derives the strict function spec for `definition`.
///
/// Never fails. A schema that is not an object is replaced by an empty
/// object schema; a schema without `properties` ends up with an empty
/// `required` list.
pub fn translate(definition: &ToolDefinition) -> FunctionCallSpec {
    let mut schema = match &definition.input_schema {
        Value::Object(map) => map.clone(),
        _ => {
            let mut map = Map::new();
            map.insert("type".to_string(), Value::String("object".to_string()));
            map
        }
    };

    let required: Vec<Value> = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().map(Value::String).collect())
        .unwrap_or_default();

    schema.insert("additionalProperties".to_string(), Value::Bool(false));
    schema.insert("required".to_string(), Value::Array(required));

    FunctionCallSpec {
        name: definition.name.clone(),
        description: definition.description.clone(),
        parameters: Value::Object(schema),
        strict: true,
    }
}

pub fn translate_all(definitions: &[ToolDefinition]) -> Vec<FunctionCallSpec> {
    definitions.iter().map(translate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(schema: Value) -> ToolDefinition {
        ToolDefinition {
            name: "write_file".into(),
            description: "Write content to a file".into(),
            input_schema: schema,
        }
    }

    #[test]
    fn requires_every_declared_property() {
        let spec = translate(&definition(json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["file_path"]
        })));

        let required: Vec<&str> = spec.parameters["required"]
            .as_array()
            .expect("required array")
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required.len(), 2);
        assert!(required.contains(&"file_path"));
        assert!(required.contains(&"content"));
        assert_eq!(spec.parameters["additionalProperties"], json!(false));
        assert!(spec.strict);
    }

    #[test]
    fn keeps_optional_defaults_but_still_requires_them() {
        let spec = translate(&definition(json!({
            "type": "object",
            "properties": {
                "directory_path": {"type": "string", "default": "."}
            }
        })));
        assert_eq!(spec.parameters["required"], json!(["directory_path"]));
        assert_eq!(
            spec.parameters["properties"]["directory_path"]["default"],
            json!(".")
        );
    }

    #[test]
    fn schema_without_properties_gets_empty_required() {
        let spec = translate(&definition(json!({"type": "object"})));
        assert_eq!(spec.parameters["required"], json!([]));
        assert_eq!(spec.parameters["additionalProperties"], json!(false));
    }

    #[test]
    fn non_object_schema_is_replaced() {
        let spec = translate(&definition(Value::Null));
        assert_eq!(spec.parameters["type"], json!("object"));
        assert_eq!(spec.parameters["required"], json!([]));
    }

    #[test]
    fn translation_does_not_touch_the_definition() {
        let original = definition(json!({
            "type": "object",
            "properties": {"file_path": {"type": "string"}}
        }));
        let before = original.clone();
        let _ = translate(&original);
        assert_eq!(original, before);
        assert_eq!(translate(&original).name, "write_file");
    }
}
