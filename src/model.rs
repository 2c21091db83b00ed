use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{DbError, Record, Result, Value};

/// Collection the item entity lives in. Carries a unique index on `name`.
pub const COLLECTION: &str = "items";

/// Stored item entity. Identity and timestamps are client-assigned at
/// creation; `updated_at` is bumped on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i64,
    pub price: f64,
}

/// Creation payload: the caller-supplied fields of an [`Item`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i64,
    pub price: f64,
}

impl NewItem {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            quantity: 0,
            price: 0.0,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }
}

impl Item {
    /// Materialize a new entity with a fresh id and both timestamps set to
    /// now.
    pub fn create(new: NewItem) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: new.name,
            description: new.description,
            quantity: new.quantity,
            price: new.price,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn to_record(&self) -> Record {
        let description = match &self.description {
            Some(text) => Value::Text(text.clone()),
            None => Value::Null,
        };
        Record::new(COLLECTION, self.id)
            .with_field("created_at", self.created_at)
            .with_field("updated_at", self.updated_at)
            .with_field("name", self.name.as_str())
            .with_field("description", description)
            .with_field("quantity", self.quantity)
            .with_field("price", self.price)
    }

    pub fn from_record(record: &Record) -> Result<Self> {
        let description = match record.get("description") {
            None | Some(Value::Null) => None,
            Some(Value::Text(text)) => Some(text.clone()),
            Some(other) => {
                return Err(DbError::storage(
                    "decode",
                    format!("field 'description' is {}, expected text", other.type_name()),
                ));
            }
        };
        Ok(Self {
            id: record.id,
            created_at: record.timestamp("created_at")?,
            updated_at: record.timestamp("updated_at")?,
            name: record.text("name")?,
            description,
            quantity: record.integer("quantity")?,
            price: record.float("price")?,
        })
    }
}
