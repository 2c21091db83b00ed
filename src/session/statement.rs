use std::fmt;

use uuid::Uuid;

use crate::core::Record;

/// Read statement accepted by `execute`. Writes never go through `execute`;
/// they are staged with the unit-of-work verbs (`add`, `merge`, `delete`).
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    SelectById { collection: String, id: Uuid },
    SelectAll { collection: String },
}

impl Statement {
    pub fn select_by_id(collection: &str, id: Uuid) -> Self {
        Statement::SelectById {
            collection: collection.to_string(),
            id,
        }
    }

    pub fn select_all(collection: &str) -> Self {
        Statement::SelectAll {
            collection: collection.to_string(),
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            Statement::SelectById { collection, .. } => collection,
            Statement::SelectAll { collection } => collection,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::SelectById { collection, id } => {
                write!(f, "SELECT {collection} WHERE id = {id}")
            }
            Statement::SelectAll { collection } => write!(f, "SELECT {collection}"),
        }
    }
}

/// Result of an `execute` call: zero or more records in storage order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    records: Vec<Record>,
}

impl QueryResult {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// First record, if any. Used for by-id lookups where absence is a
    /// normal outcome rather than an error.
    pub fn into_optional(mut self) -> Option<Record> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.records.remove(0))
        }
    }
}
