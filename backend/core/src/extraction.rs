//! Structured extraction document.
//!
//! Five fields are fixed by the output schema sent to the provider. Providers
//! are free to add more, so anything unrecognised is kept in `extra` as a
//! tagged value instead of being dropped. Fields are read one at a time: a
//! bad field never costs the others.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names fixed by the extraction schema, in display order.
pub const KNOWN_FIELDS: [&str; 5] = [
    "objects",
    "scene_type",
    "text_content",
    "colors",
    "crucial_elements",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub objects: Vec<String>,
    pub text_content: String,
    pub scene_type: String,
    pub colors: Vec<String>,
    pub crucial_elements: Vec<String>,
    /// Provider-added attributes, plus known fields of the wrong type, in
    /// document order.
    pub extra: Vec<(String, ExtraValue)>,
}

impl ExtractionResult {
    /// `None` unless the document is a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(Self::from_object)
    }

    /// `null` counts as absent. A known field that is not of its schema type
    /// is moved to `extra` rather than discarded.
    pub fn from_object(map: &Map<String, Value>) -> Self {
        let mut doc = Self::default();
        for (key, value) in map {
            let is_known = KNOWN_FIELDS.contains(&key.as_str());
            if is_known && value.is_null() {
                continue;
            }
            let placed = match key.as_str() {
                "objects" => string_list(value).map(|v| doc.objects = v),
                "text_content" => value.as_str().map(|s| doc.text_content = s.to_string()),
                "scene_type" => value.as_str().map(|s| doc.scene_type = s.to_string()),
                "colors" => string_list(value).map(|v| doc.colors = v),
                "crucial_elements" => string_list(value).map(|v| doc.crucial_elements = v),
                _ => None,
            };
            if placed.is_none() {
                doc.extra.push((key.clone(), ExtraValue::from_value(value)));
            }
        }
        doc
    }

    pub fn extra(&self, key: &str) -> Option<&ExtraValue> {
        self.extra.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Value of an attribute the schema does not name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Text(String),
    List(Vec<String>),
    Json(Value),
}

impl ExtraValue {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s.clone()),
            other => string_list(other).map_or_else(|| Self::Json(other.clone()), Self::List),
        }
    }

    /// Strings are shown as-is; everything else as compact JSON text.
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::List(items) => Value::from(items.clone()).to_string(),
            Self::Json(value) => value.to_string(),
        }
    }
}

/// Turn a snake_case key into a label: `dominant_light` becomes `Dominant Light`.
pub fn humanize_field_name(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for c in spaced.chars() {
        let is_word = c.is_alphanumeric();
        if is_word && at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !is_word;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_fields_and_extras_split() {
        let doc = ExtractionResult::from_value(&json!({
            "objects": ["cup", "plate"],
            "scene_type": "kitchen",
            "text_content": "",
            "colors": ["white"],
            "crucial_elements": ["cup"],
            "mood": "calm",
            "tags": ["warm", "indoor"],
            "lighting": {"source": "window"},
            "people": 0
        }))
        .unwrap();

        assert_eq!(doc.objects, vec!["cup", "plate"]);
        assert_eq!(doc.scene_type, "kitchen");
        assert_eq!(doc.extra.len(), 4);
        assert_eq!(doc.extra("mood"), Some(&ExtraValue::Text("calm".into())));
        assert_eq!(
            doc.extra("tags"),
            Some(&ExtraValue::List(vec!["warm".into(), "indoor".into()]))
        );
        assert_eq!(doc.extra("lighting").unwrap().display(), r#"{"source":"window"}"#);
        assert_eq!(doc.extra("people").unwrap().display(), "0");
    }

    #[test]
    fn test_extras_keep_document_order() {
        let doc = ExtractionResult::from_value(&json!({
            "zoom": "wide",
            "mood": "calm",
            "angle": "low"
        }))
        .unwrap();
        let keys: Vec<&str> = doc.extra.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zoom", "mood", "angle"]);
    }

    #[test]
    fn test_missing_known_fields_default_to_empty() {
        let doc = ExtractionResult::from_value(&json!({"scene_type": "street"})).unwrap();
        assert!(doc.objects.is_empty());
        assert!(doc.text_content.is_empty());
        assert!(doc.extra.is_empty());
    }

    #[test]
    fn test_null_known_field_is_absent() {
        let doc = ExtractionResult::from_value(&json!({
            "objects": ["cup"],
            "text_content": null,
            "colors": null
        }))
        .unwrap();
        assert_eq!(doc.objects, vec!["cup"]);
        assert!(doc.text_content.is_empty());
        assert!(doc.colors.is_empty());
        assert!(doc.extra.is_empty());
    }

    #[test]
    fn test_mistyped_known_field_moves_to_extra_alone() {
        let doc = ExtractionResult::from_value(&json!({
            "objects": ["cup"],
            "colors": "white",
            "crucial_elements": ["cup", 3]
        }))
        .unwrap();
        assert_eq!(doc.objects, vec!["cup"]);
        assert!(doc.colors.is_empty());
        assert_eq!(doc.extra("colors"), Some(&ExtraValue::Text("white".into())));
        assert_eq!(doc.extra("crucial_elements").unwrap().display(), r#"["cup",3]"#);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(ExtractionResult::from_value(&json!(["cup"])).is_none());
    }

    #[test]
    fn test_list_extra_displays_as_json() {
        let value = ExtraValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(value.display(), r#"["a","b"]"#);
    }

    #[test]
    fn test_humanize_field_name() {
        assert_eq!(humanize_field_name("mood"), "Mood");
        assert_eq!(humanize_field_name("dominant_light_source"), "Dominant Light Source");
        assert_eq!(humanize_field_name("already Spaced"), "Already Spaced");
    }
}
