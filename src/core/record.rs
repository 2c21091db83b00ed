use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{DbError, Result, Value};

/// A lightweight persisted row: collection name, primary id and a typed
/// field map. This is what sessions stage, flush and query; domain types
/// convert themselves to and from it at the repository boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub collection: String,
    pub id: Uuid,
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(collection: &str, id: Uuid) -> Self {
        Self {
            collection: collection.to_string(),
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Result<String> {
        match self.fields.get(name) {
            Some(Value::Text(v)) => Ok(v.clone()),
            other => Err(self.decode_error(name, "text", other)),
        }
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        match self.fields.get(name) {
            Some(Value::Integer(v)) => Ok(*v),
            other => Err(self.decode_error(name, "integer", other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        match self.fields.get(name) {
            Some(Value::Float(v)) => Ok(*v),
            other => Err(self.decode_error(name, "float", other)),
        }
    }

    pub fn timestamp(&self, name: &str) -> Result<DateTime<Utc>> {
        match self.fields.get(name) {
            Some(Value::Timestamp(v)) => Ok(*v),
            other => Err(self.decode_error(name, "timestamp", other)),
        }
    }

    fn decode_error(&self, name: &str, expected: &str, got: Option<&Value>) -> DbError {
        let got = got.map(Value::type_name).unwrap_or("missing");
        DbError::storage(
            "decode",
            format!(
                "field '{name}' of '{}' expected {expected}, got {got}",
                self.collection
            ),
        )
    }
}
