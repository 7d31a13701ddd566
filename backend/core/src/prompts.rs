//! Fixed instructions and output schema sent with every analysis request.

use serde_json::{json, Value};

pub const DESCRIBE_PROMPT: &str = "Describe this photo in detail. Cover the main subject, \
the setting, notable objects, colors and any visible text. Use Markdown with short \
paragraphs, and bullet lists where they help.";

pub const EXTRACT_PROMPT: &str = "Extract structured information from this photo. List the \
objects you can see, transcribe any visible text, classify the type of scene, name the \
dominant colors, and list the elements that are crucial to understanding the image.";

/// Name under which the schema is registered with the provider.
pub const EXTRACTION_SCHEMA_NAME: &str = "photo_extraction";

/// Strict JSON schema the provider must honour for extraction.
pub fn extraction_schema() -> Value {
    let string_list = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "properties": {
            "objects": string_list,
            "text_content": { "type": "string" },
            "scene_type": { "type": "string" },
            "colors": string_list,
            "crucial_elements": string_list,
        },
        "required": ["objects", "text_content", "scene_type", "colors", "crucial_elements"],
        "additionalProperties": false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_requires_all_known_fields() {
        let schema = extraction_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        for field in crate::extraction::KNOWN_FIELDS {
            assert!(required.contains(&field), "{field} missing from schema");
            assert!(schema["properties"].get(field).is_some());
        }
    }
}
