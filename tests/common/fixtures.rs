//! Test fixtures for integration tests.

#![allow(dead_code)]

use mongodb::bson::{Document, doc, oid::ObjectId};
use schemango::analysis::QuerySample;
use schemango::bson::DocumentValue;
use serde_json::{Value, json};

pub fn values(docs: Vec<Value>) -> Vec<DocumentValue> {
    docs.into_iter().map(DocumentValue::from).collect()
}

/// Four people, one without `age` and one with a string `age`.
pub fn people() -> Vec<DocumentValue> {
    values(vec![
        json!({ "name": "A", "age": 30 }),
        json!({ "name": "B", "age": "thirty" }),
        json!({ "name": "C" }),
        json!({ "name": "D", "age": 25 }),
    ])
}

/// People with an extra `email` field.
pub fn people_with_email() -> Vec<DocumentValue> {
    values(vec![
        json!({ "name": "A", "age": 30, "email": "a@example.com" }),
        json!({ "name": "B", "age": 41, "email": "b@example.com" }),
    ])
}

/// `count` documents where `nickname` appears in the first `with_field` of them.
pub fn partially_covered(count: usize, with_field: usize) -> Vec<DocumentValue> {
    (0..count)
        .map(|i| {
            let mut doc = json!({ "id": i });
            if i < with_field {
                doc["nickname"] = json!(format!("nick-{i}"));
            }
            DocumentValue::from(doc)
        })
        .collect()
}

/// Orders with nested customer objects, an array of line items and a large tag list.
pub fn orders() -> Vec<DocumentValue> {
    let tags: Vec<Value> = (0..120).map(|i| json!(format!("t{i}"))).collect();
    values(vec![
        json!({
            "_id": { "$oid": "65a1b2c3d4e5f60718293a4b" },
            "orderId": "o-1",
            "status": "open",
            "customer": { "email": "a@example.com", "address": { "city": "Oslo" } },
            "items": [{ "sku": "x", "qty": 1 }, { "sku": "y", "qty": 2 }],
            "tags": tags,
            "createdAt": { "$date": "2024-01-05T10:00:00Z" },
        }),
        json!({
            "_id": { "$oid": "65a1b2c3d4e5f60718293a4c" },
            "orderId": "o-2",
            "status": null,
            "customer": { "email": "b@example.com" },
            "items": [],
            "tags": ["a"],
            "createdAt": { "$date": "2024-01-06T10:00:00Z" },
        }),
    ])
}

pub fn query(filter: Value, millis: u64, scan_type: &str) -> QuerySample {
    QuerySample::from_filter(&DocumentValue::from(filter), millis, scan_type, chrono::Utc::now())
}

/// BSON counterpart of [`people`].
pub fn people_documents() -> Vec<Document> {
    vec![
        doc! { "name": "A", "age": 30 },
        doc! { "name": "B", "age": "thirty" },
        doc! { "name": "C" },
        doc! { "name": "D", "age": 25_i64 },
    ]
}

/// Generate a document with various BSON types for type handling tests.
pub fn document_with_all_types() -> Document {
    doc! {
        "_id": ObjectId::new(),
        "string": "hello world",
        "int32": 42_i32,
        "int64": 9_000_000_000_000_i64,
        "double": std::f64::consts::PI,
        "boolean": true,
        "null": null,
        "array": ["a", "b", "c"],
        "nested": {
            "key": "value",
            "deep": {
                "deeper": "bottom"
            }
        },
        "date": mongodb::bson::DateTime::now(),
    }
}
