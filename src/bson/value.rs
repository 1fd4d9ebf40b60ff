//! Closed value model for sampled documents.

use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::{Bson, Document};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Ordered field list of an object value. Keeps the key order of the source document.
pub type ObjectFields = Vec<(String, DocumentValue)>;

/// A dynamically-typed document value.
///
/// `ObjectReference` and `Timestamp` are scalars even though their BSON encodings are
/// structured; walkers must never descend into them.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentValue {
    Null,
    /// Legacy BSON `undefined`.
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<DocumentValue>),
    Object(ObjectFields),
    /// Opaque object id, stored as its hex form.
    ObjectReference(String),
    Timestamp(DateTime<Utc>),
}

impl DocumentValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DocumentValue::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectFields> {
        match self {
            DocumentValue::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DocumentValue]> {
        match self {
            DocumentValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a direct child of an object value.
    pub fn get(&self, key: &str) -> Option<&DocumentValue> {
        self.as_object()?.iter().find(|(name, _)| name == key).map(|(_, value)| value)
    }

    /// Build an object value from `(key, value)` pairs.
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, DocumentValue)>,
    {
        DocumentValue::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<&Document> for DocumentValue {
    fn from(doc: &Document) -> Self {
        DocumentValue::Object(
            doc.iter().map(|(key, value)| (key.to_string(), DocumentValue::from(value))).collect(),
        )
    }
}

impl From<Document> for DocumentValue {
    fn from(doc: Document) -> Self {
        DocumentValue::from(&doc)
    }
}

impl From<&Bson> for DocumentValue {
    fn from(value: &Bson) -> Self {
        match value {
            Bson::Null => DocumentValue::Null,
            Bson::Undefined => DocumentValue::Undefined,
            Bson::Boolean(b) => DocumentValue::Bool(*b),
            Bson::Double(n) => DocumentValue::Number(*n),
            Bson::Int32(n) => DocumentValue::Number(f64::from(*n)),
            Bson::Int64(n) => DocumentValue::Number(*n as f64),
            Bson::Decimal128(d) => match d.to_string().parse::<f64>() {
                Ok(n) => DocumentValue::Number(n),
                Err(_) => DocumentValue::String(d.to_string()),
            },
            Bson::String(s) | Bson::Symbol(s) | Bson::JavaScriptCode(s) => {
                DocumentValue::String(s.clone())
            }
            Bson::Array(items) => DocumentValue::Array(items.iter().map(Into::into).collect()),
            Bson::Document(doc) => DocumentValue::from(doc),
            Bson::ObjectId(oid) => DocumentValue::ObjectReference(oid.to_hex()),
            Bson::DateTime(dt) => DateTime::from_timestamp_millis(dt.timestamp_millis())
                .map(DocumentValue::Timestamp)
                .unwrap_or_else(|| DocumentValue::String(dt.to_string())),
            Bson::Timestamp(ts) => DateTime::from_timestamp(i64::from(ts.time), 0)
                .map(DocumentValue::Timestamp)
                .unwrap_or(DocumentValue::Null),
            Bson::RegularExpression(regex) => DocumentValue::String(regex.pattern.to_string()),
            other => DocumentValue::String(other.to_string()),
        }
    }
}

impl From<Bson> for DocumentValue {
    fn from(value: Bson) -> Self {
        DocumentValue::from(&value)
    }
}

/// Relaxed extended JSON input: `{"$oid": ..}` and `{"$date": ..}` wrappers become
/// references and timestamps, everything else maps structurally.
impl From<serde_json::Value> for DocumentValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => DocumentValue::Null,
            Value::Bool(b) => DocumentValue::Bool(b),
            Value::Number(n) => DocumentValue::Number(n.as_f64().unwrap_or_default()),
            Value::String(s) => DocumentValue::String(s),
            Value::Array(items) => {
                DocumentValue::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(Value::String(oid)) = map.get("$oid") {
                        return DocumentValue::ObjectReference(oid.clone());
                    }
                    if let Some(date) = map.get("$date").and_then(parse_extjson_date) {
                        return DocumentValue::Timestamp(date);
                    }
                }
                DocumentValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

fn parse_extjson_date(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => {
            DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
        }
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        serde_json::Value::Object(inner) => {
            let millis = inner.get("$numberLong")?.as_str()?.parse().ok()?;
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

impl Serialize for DocumentValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DocumentValue::Null | DocumentValue::Undefined => serializer.serialize_unit(),
            DocumentValue::Bool(b) => serializer.serialize_bool(*b),
            DocumentValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            DocumentValue::String(s) => serializer.serialize_str(s),
            DocumentValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DocumentValue::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            DocumentValue::ObjectReference(oid) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$oid", oid)?;
                map.end()
            }
            DocumentValue::Timestamp(dt) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$date", &dt.to_rfc3339_opts(SecondsFormat::Millis, true))?;
                map.end()
            }
        }
    }
}
