//! Item repositories.
//!
//! Thin persistence adapters over the execution strategies. Absence is an
//! empty result, never an error: a `NotFound` from the driver is absorbed
//! here; every other error aborts the enclosing scope unchanged.

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::{DbError, Mode, Result};
use crate::execution::{AsyncExec, SyncExec};
use crate::model::{Item, NewItem, COLLECTION};
use crate::session::{AsyncSession, Statement, SyncSession};

pub trait ItemRepository: Send + Sync {
    fn get_by_id(&self, session: &mut dyn SyncSession, id: Uuid) -> Result<Option<Item>>;
    fn create(&self, session: &mut dyn SyncSession, new_item: NewItem) -> Result<Item>;
    fn list(&self, session: &mut dyn SyncSession) -> Result<Vec<Item>>;
    fn update(&self, session: &mut dyn SyncSession, item: Item) -> Result<Item>;
    fn delete(&self, session: &mut dyn SyncSession, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait AsyncItemRepository: Send + Sync {
    async fn get_by_id(&self, session: &mut dyn AsyncSession, id: Uuid) -> Result<Option<Item>>;
    async fn create(&self, session: &mut dyn AsyncSession, new_item: NewItem) -> Result<Item>;
    async fn list(&self, session: &mut dyn AsyncSession) -> Result<Vec<Item>>;
    async fn update(&self, session: &mut dyn AsyncSession, item: Item) -> Result<Item>;
    async fn delete(&self, session: &mut dyn AsyncSession, id: Uuid) -> Result<bool>;
}

#[derive(Debug, Clone, Copy)]
pub struct ItemSyncRepository {
    exec: SyncExec,
}

impl ItemSyncRepository {
    pub fn new(exec: SyncExec) -> Self {
        log::info!("init sync item repository");
        Self { exec }
    }

    pub fn mode(&self) -> Mode {
        self.exec.mode()
    }
}

impl ItemRepository for ItemSyncRepository {
    fn get_by_id(&self, session: &mut dyn SyncSession, id: Uuid) -> Result<Option<Item>> {
        let result = self
            .exec
            .execute(session, Statement::select_by_id(COLLECTION, id))?;
        result
            .into_optional()
            .map(|record| Item::from_record(&record))
            .transpose()
    }

    fn create(&self, session: &mut dyn SyncSession, new_item: NewItem) -> Result<Item> {
        let item = Item::create(new_item);
        self.exec.add(session, item.to_record())?;
        self.exec.flush(session)?;
        Ok(item)
    }

    fn list(&self, session: &mut dyn SyncSession) -> Result<Vec<Item>> {
        let result = self.exec.execute(session, Statement::select_all(COLLECTION))?;
        result
            .into_records()
            .iter()
            .map(Item::from_record)
            .collect()
    }

    fn update(&self, session: &mut dyn SyncSession, mut item: Item) -> Result<Item> {
        item.touch();
        let merged = self.exec.merge(session, item.to_record())?;
        Item::from_record(&merged)
    }

    fn delete(&self, session: &mut dyn SyncSession, id: Uuid) -> Result<bool> {
        let Some(item) = self.get_by_id(session, id)? else {
            return Ok(false);
        };
        match self.exec.delete(session, &item.to_record()) {
            Ok(()) => {
                self.exec.flush(session)?;
                Ok(true)
            }
            Err(DbError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ItemAsyncRepository {
    exec: AsyncExec,
}

impl ItemAsyncRepository {
    pub fn new(exec: AsyncExec) -> Self {
        log::info!("init async item repository");
        Self { exec }
    }

    pub fn mode(&self) -> Mode {
        self.exec.mode()
    }
}

#[async_trait]
impl AsyncItemRepository for ItemAsyncRepository {
    async fn get_by_id(&self, session: &mut dyn AsyncSession, id: Uuid) -> Result<Option<Item>> {
        let result = self
            .exec
            .execute(session, Statement::select_by_id(COLLECTION, id))
            .await?;
        result
            .into_optional()
            .map(|record| Item::from_record(&record))
            .transpose()
    }

    async fn create(&self, session: &mut dyn AsyncSession, new_item: NewItem) -> Result<Item> {
        let item = Item::create(new_item);
        self.exec.add(session, item.to_record())?;
        self.exec.flush(session).await?;
        Ok(item)
    }

    async fn list(&self, session: &mut dyn AsyncSession) -> Result<Vec<Item>> {
        let result = self
            .exec
            .execute(session, Statement::select_all(COLLECTION))
            .await?;
        result
            .into_records()
            .iter()
            .map(Item::from_record)
            .collect()
    }

    async fn update(&self, session: &mut dyn AsyncSession, mut item: Item) -> Result<Item> {
        item.touch();
        let merged = self.exec.merge(session, item.to_record()).await?;
        Item::from_record(&merged)
    }

    async fn delete(&self, session: &mut dyn AsyncSession, id: Uuid) -> Result<bool> {
        let Some(item) = self.get_by_id(session, id).await? else {
            return Ok(false);
        };
        match self.exec.delete(session, &item.to_record()).await {
            Ok(()) => {
                self.exec.flush(session).await?;
                Ok(true)
            }
            Err(DbError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
