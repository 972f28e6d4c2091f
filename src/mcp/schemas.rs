//! JSON schema builders for MCP tools.

use serde_json::{Map, Value, json};

/// Schema for tools addressing a single document by id.
pub(crate) fn document_id_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "id".into(),
        integer_schema("Document identifier returned by the upload endpoint", Some(1)),
    );
    finalize_object_schema(properties, &["id"])
}

/// Schema for the `list-documents` tool.
pub(crate) fn list_documents_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "owner".into(),
        string_schema("Only list documents uploaded by this owner"),
    );
    finalize_object_schema(properties, &[])
}

/// Schema for the `keywords` tool.
pub(crate) fn keywords_input_schema(default_top_n: usize) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "text".into(),
        string_schema("Text to extract frequency keywords from"),
    );
    let mut top_n = integer_schema("Number of keywords to return", Some(1));
    if let Value::Object(map) = &mut top_n {
        map.insert("default".into(), json!(default_top_n));
    }
    properties.insert("top_n".into(), top_n);

    finalize_object_schema(properties, &["text"])
}

/// Schema for the `cluster-documents` tool.
pub(crate) fn cluster_input_schema(default_count: usize) -> Map<String, Value> {
    let mut properties = Map::new();
    let mut n_clusters = integer_schema(
        "Requested cluster count; clamped to the number of summarized documents",
        Some(1),
    );
    if let Value::Object(map) = &mut n_clusters {
        map.insert("default".into(), json!(default_count));
    }
    properties.insert("n_clusters".into(), n_clusters);

    finalize_object_schema(properties, &[])
}

/// Schema for the `similar-documents` tool.
pub(crate) fn similar_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "id".into(),
        integer_schema("Document to compare against", Some(1)),
    );
    let mut k = integer_schema("Maximum number of neighbours to return", Some(1));
    if let Value::Object(map) = &mut k {
        map.insert("default".into(), json!(5));
    }
    properties.insert("k".into(), k);

    let mut schema = finalize_object_schema(properties, &["id"]);
    schema.insert("examples".into(), json!([{ "id": 3 }, { "id": 3, "k": 10 }]));
    schema
}

/// Schema representing an empty object (used for parameterless tools).
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn integer_schema(description: &str, minimum: Option<i64>) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("integer".into()));
    schema.insert("description".into(), Value::String(description.into()));
    if let Some(minimum) = minimum {
        schema.insert("minimum".into(), Value::Number(minimum.into()));
    }
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}
