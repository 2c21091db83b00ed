use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::core::{DbError, Record, Result};
use crate::session::{QueryResult, Statement};

/// Flushed-but-uncommitted writes of one session, keyed by collection and
/// id. `None` marks a pending delete.
pub(crate) type Overlay = BTreeMap<(String, Uuid), Option<Record>>;

#[derive(Debug, Clone)]
pub(crate) enum PendingChange {
    Insert(Record),
    Merge(Record),
    Delete { collection: String, id: Uuid },
}

#[derive(Debug, Clone)]
pub(crate) struct UniqueIndex {
    pub collection: String,
    pub field: String,
}

/// Committed state shared by every session of one factory.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    collections: HashMap<String, BTreeMap<Uuid, Record>>,
    unique_indexes: Vec<UniqueIndex>,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unique_index(&mut self, collection: &str, field: &str) {
        self.unique_indexes.push(UniqueIndex {
            collection: collection.to_string(),
            field: field.to_string(),
        });
    }

    /// Session view of one record: the overlay wins over committed state.
    pub fn lookup(&self, overlay: &Overlay, collection: &str, id: Uuid) -> Option<Record> {
        if let Some(entry) = overlay.get(&(collection.to_string(), id)) {
            return entry.clone();
        }
        self.collections
            .get(collection)
            .and_then(|records| records.get(&id))
            .cloned()
    }

    pub fn query(&self, overlay: &Overlay, stmt: &Statement) -> QueryResult {
        match stmt {
            Statement::SelectById { collection, id } => {
                QueryResult::new(self.lookup(overlay, collection, *id).into_iter().collect())
            }
            Statement::SelectAll { collection } => {
                let mut merged: BTreeMap<Uuid, Record> = self
                    .collections
                    .get(collection)
                    .cloned()
                    .unwrap_or_default();
                for ((coll, id), entry) in overlay {
                    if coll != collection {
                        continue;
                    }
                    match entry {
                        Some(record) => {
                            merged.insert(*id, record.clone());
                        }
                        None => {
                            merged.remove(id);
                        }
                    }
                }
                QueryResult::new(merged.into_values().collect())
            }
        }
    }

    /// Returns the violated field name if `candidate` collides with another
    /// record (committed or overlaid) on a unique index.
    pub fn unique_conflict(&self, overlay: &Overlay, candidate: &Record) -> Option<String> {
        for index in &self.unique_indexes {
            if index.collection != candidate.collection {
                continue;
            }
            let Some(value) = candidate.fields.get(&index.field) else {
                continue;
            };
            if let Some(records) = self.collections.get(&candidate.collection) {
                for (id, existing) in records {
                    if *id == candidate.id
                        || overlay.contains_key(&(candidate.collection.clone(), *id))
                    {
                        continue;
                    }
                    if existing.fields.get(&index.field) == Some(value) {
                        return Some(index.field.clone());
                    }
                }
            }
            for ((coll, id), entry) in overlay {
                if coll != &candidate.collection || *id == candidate.id {
                    continue;
                }
                if let Some(existing) = entry {
                    if existing.fields.get(&index.field) == Some(value) {
                        return Some(index.field.clone());
                    }
                }
            }
        }
        None
    }

    /// Publish a session overlay. Unique indexes are re-validated against
    /// the committed state because another session may have committed since
    /// the overlay was flushed.
    pub fn apply(&mut self, overlay: Overlay) -> Result<()> {
        for entry in overlay.values().flatten() {
            if let Some(field) = self.unique_conflict(&overlay, entry) {
                return Err(constraint_violation("commit", entry, &field));
            }
        }
        for ((collection, id), entry) in overlay {
            match entry {
                Some(record) => {
                    self.collections
                        .entry(collection)
                        .or_default()
                        .insert(id, record);
                }
                None => {
                    if let Some(records) = self.collections.get_mut(&collection) {
                        records.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }
}

fn constraint_violation(verb: &str, record: &Record, field: &str) -> DbError {
    let value = record
        .fields
        .get(field)
        .map(ToString::to_string)
        .unwrap_or_default();
    DbError::storage(
        verb,
        format!(
            "unique constraint violated: {}.{field} = '{value}'",
            record.collection
        ),
    )
}

/// Per-session staging area: verbs accumulate in `staged` until `flush`
/// moves them into the overlay, which `commit` later publishes.
#[derive(Debug, Default)]
pub(crate) struct Workspace {
    staged: Vec<PendingChange>,
    pub overlay: Overlay,
}

impl Workspace {
    pub fn stage_insert(&mut self, record: Record) {
        self.staged.push(PendingChange::Insert(record));
    }

    pub fn stage_merge(&mut self, record: Record) {
        self.staged.push(PendingChange::Merge(record));
    }

    pub fn stage_delete(&mut self, collection: &str, id: Uuid) {
        self.staged.push(PendingChange::Delete {
            collection: collection.to_string(),
            id,
        });
    }

    pub fn has_pending(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Move staged changes into the overlay, enforcing unique indexes in
    /// submission order.
    pub fn flush(&mut self, state: &StoreState) -> Result<()> {
        for change in self.staged.drain(..) {
            match change {
                PendingChange::Insert(record) => {
                    let key = (record.collection.clone(), record.id);
                    let committed = state.lookup(&Overlay::new(), &record.collection, record.id);
                    if committed.is_some() && !self.overlay.contains_key(&key) {
                        return Err(DbError::storage(
                            "flush",
                            format!("duplicate id {} in '{}'", record.id, record.collection),
                        ));
                    }
                    if let Some(field) = state.unique_conflict(&self.overlay, &record) {
                        return Err(constraint_violation("flush", &record, &field));
                    }
                    self.overlay.insert(key, Some(record));
                }
                PendingChange::Merge(record) => {
                    if let Some(field) = state.unique_conflict(&self.overlay, &record) {
                        return Err(constraint_violation("flush", &record, &field));
                    }
                    self.overlay
                        .insert((record.collection.clone(), record.id), Some(record));
                }
                PendingChange::Delete { collection, id } => {
                    self.overlay.insert((collection, id), None);
                }
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.staged.clear();
        self.overlay.clear();
    }
}
