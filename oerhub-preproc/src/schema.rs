//! Declarative structural schema validation.
//!
//! Validation is structural only: presence, primitive kind, and
//! required-list satisfaction, applied recursively through object
//! properties and array items. No semantic checks (a `language` value is
//! not verified to be a real ISO code) and no partial credit — a record
//! either passes or fails. Nothing here panics on malformed input.

use serde_json::Value;
use std::collections::BTreeMap;

/// Primitive JSON kinds a schema node may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl SchemaKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            SchemaKind::Object => value.is_object(),
            SchemaKind::Array => value.is_array(),
            SchemaKind::String => value.is_string(),
            SchemaKind::Number => value.is_number(),
            SchemaKind::Boolean => value.is_boolean(),
            SchemaKind::Null => value.is_null(),
        }
    }
}

/// A schema node: accepted kinds plus the nested structure for objects and
/// arrays. Properties not listed are ignored; properties listed but absent
/// only fail when named in `required`.
#[derive(Debug, Clone)]
pub struct Schema {
    kinds: Vec<SchemaKind>,
    properties: BTreeMap<String, Schema>,
    required: Vec<String>,
    items: Option<Box<Schema>>,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl Schema {
    fn with_kinds(kinds: Vec<SchemaKind>) -> Self {
        Self {
            kinds,
            properties: BTreeMap::new(),
            required: Vec::new(),
            items: None,
            min_length: None,
            max_length: None,
        }
    }

    pub fn string() -> Self {
        Self::with_kinds(vec![SchemaKind::String])
    }

    /// A string with inclusive length bounds.
    pub fn string_len(min: usize, max: usize) -> Self {
        let mut schema = Self::string();
        schema.min_length = Some(min);
        schema.max_length = Some(max);
        schema
    }

    pub fn number() -> Self {
        Self::with_kinds(vec![SchemaKind::Number])
    }

    pub fn boolean() -> Self {
        Self::with_kinds(vec![SchemaKind::Boolean])
    }

    pub fn object() -> Self {
        Self::with_kinds(vec![SchemaKind::Object])
    }

    pub fn array(items: Schema) -> Self {
        let mut schema = Self::with_kinds(vec![SchemaKind::Array]);
        schema.items = Some(Box::new(items));
        schema
    }

    /// A node accepting any of the given kinds, e.g. `["object", "string",
    /// "null"]` for loosely typed harvested fields.
    pub fn one_of(kinds: &[SchemaKind]) -> Self {
        Self::with_kinds(kinds.to_vec())
    }

    pub fn property(mut self, name: &str, schema: Schema) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    pub fn require(mut self, name: &str) -> Self {
        self.required.push(name.to_string());
        self
    }
}

/// Structural validator for [`Schema`] against `serde_json::Value`.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Whole-record pass/fail.
    pub fn validate(&self, value: &Value, schema: &Schema) -> bool {
        if !schema.kinds.iter().any(|k| k.matches(value)) {
            return false;
        }

        if let Some(s) = value.as_str() {
            if let Some(min) = schema.min_length {
                if s.chars().count() < min {
                    return false;
                }
            }
            if let Some(max) = schema.max_length {
                if s.chars().count() > max {
                    return false;
                }
            }
        }

        if let Some(map) = value.as_object() {
            for name in &schema.required {
                if !map.contains_key(name) {
                    return false;
                }
            }
            for (name, sub) in &schema.properties {
                if let Some(v) = map.get(name) {
                    if !self.validate(v, sub) {
                        return false;
                    }
                }
            }
        }

        if let Some(list) = value.as_array() {
            if let Some(items) = &schema.items {
                for v in list {
                    if !self.validate(v, items) {
                        return false;
                    }
                }
            }
        }

        true
    }
}

/// The fixed schema for a fully processed material record.
pub fn material_schema() -> Schema {
    let concept = Schema::object()
        .property("name", Schema::string())
        .property("uri", Schema::string())
        .property("lang", Schema::string())
        .property("supportLen", Schema::number())
        .property("pageRank", Schema::number())
        .property("cosine", Schema::number())
        .require("name")
        .require("uri")
        .require("lang")
        .require("supportLen")
        .require("pageRank")
        .require("cosine");

    let provider_metadata = Schema::object()
        .property("title", Schema::string())
        .property("url", Schema::string())
        .require("title")
        .require("url");

    let material_metadata = Schema::object()
        .property("rawText", Schema::string())
        .property("dfxp", Schema::string())
        .property("wikipediaConcepts", Schema::array(concept))
        .property("transcriptions", Schema::object())
        .require("rawText")
        .require("wikipediaConcepts");

    Schema::object()
        .property("title", Schema::string())
        .property("description", Schema::string())
        .property("provideruri", Schema::string())
        .property("materialurl", Schema::string())
        .property("author", Schema::string())
        .property("language", Schema::string_len(2, 2))
        .property("datecreated", Schema::string())
        .property("dateretrieved", Schema::string())
        .property(
            "type",
            Schema::one_of(&[SchemaKind::Object, SchemaKind::String, SchemaKind::Null]),
        )
        .property("providermetadata", provider_metadata)
        .property("materialmetadata", material_metadata)
        .property("license", Schema::string())
        .require("title")
        .require("provideruri")
        .require("materialurl")
        .require("language")
        .require("providermetadata")
        .require("materialmetadata")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_material() -> Value {
        json!({
            "title": "Intro to Graphs",
            "provideruri": "https://provider.example/materials",
            "materialurl": "https://provider.example/materials/graphs",
            "language": "en",
            "providermetadata": { "title": "Example U", "url": "https://provider.example" },
            "materialmetadata": {
                "rawText": "a graph is a set of vertices and edges",
                "wikipediaConcepts": []
            }
        })
    }

    #[test]
    fn valid_record_passes() {
        let validator = SchemaValidator::new();
        assert!(validator.validate(&valid_material(), &material_schema()));
    }

    #[test]
    fn missing_concepts_field_fails_but_empty_list_passes() {
        let validator = SchemaValidator::new();
        let schema = material_schema();

        let mut missing = valid_material();
        missing["materialmetadata"]
            .as_object_mut()
            .unwrap()
            .remove("wikipediaConcepts");
        assert!(!validator.validate(&missing, &schema));

        // The otherwise-identical record with an empty list passes.
        assert!(validator.validate(&valid_material(), &schema));
    }

    #[test]
    fn missing_raw_text_fails() {
        let validator = SchemaValidator::new();
        let mut record = valid_material();
        record["materialmetadata"]
            .as_object_mut()
            .unwrap()
            .remove("rawText");
        assert!(!validator.validate(&record, &material_schema()));
    }

    #[test]
    fn wrong_primitive_kind_fails() {
        let validator = SchemaValidator::new();
        let mut record = valid_material();
        record["title"] = json!(42);
        assert!(!validator.validate(&record, &material_schema()));
    }

    #[test]
    fn language_length_bounds_enforced() {
        let validator = SchemaValidator::new();
        let mut record = valid_material();
        record["language"] = json!("eng");
        assert!(!validator.validate(&record, &material_schema()));
    }

    #[test]
    fn type_field_accepts_object_string_and_null() {
        let validator = SchemaValidator::new();
        let schema = material_schema();

        for type_value in [
            json!({ "ext": "pdf", "mime": "application/pdf" }),
            json!("pdf"),
            json!(null),
        ] {
            let mut record = valid_material();
            record["type"] = type_value;
            assert!(validator.validate(&record, &schema));
        }
    }

    #[test]
    fn malformed_concept_item_fails() {
        let validator = SchemaValidator::new();
        let mut record = valid_material();
        record["materialmetadata"]["wikipediaConcepts"] = json!([{ "name": "Graph" }]);
        assert!(!validator.validate(&record, &material_schema()));
    }

    #[test]
    fn non_object_top_level_fails_without_panicking() {
        let validator = SchemaValidator::new();
        assert!(!validator.validate(&json!("not a record"), &material_schema()));
        assert!(!validator.validate(&json!(null), &material_schema()));
    }
}
