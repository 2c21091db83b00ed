//! Item services.
//!
//! The facade layer: five operations per entity taking and returning plain
//! domain values, with no session visible to callers. Reads run inside a
//! session scope, writes inside a transaction scope, both obtained through
//! the manager's `transactional` wrapper.

use futures::FutureExt;
use uuid::Uuid;

use crate::core::{Mode, Result};
use crate::model::{Item, NewItem};
use crate::repository::{
    AsyncItemRepository, ItemAsyncRepository, ItemRepository, ItemSyncRepository,
};
use crate::transaction::{AsyncManager, SyncManager};

/// Blocking item facade, used by `NativeSync` and `AsyncBridgedSync`.
pub struct SyncItemService {
    manager: SyncManager,
    repository: ItemSyncRepository,
}

impl SyncItemService {
    pub fn new(manager: SyncManager, repository: ItemSyncRepository) -> Self {
        log::info!("init sync item service");
        Self {
            manager,
            repository,
        }
    }

    pub fn mode(&self) -> Mode {
        self.repository.mode()
    }

    pub fn manager(&self) -> &SyncManager {
        &self.manager
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Item>> {
        let repository = self.repository;
        self.manager
            .transactional(true)
            .run1(move |session, id: Uuid| repository.get_by_id(session, id), id)
    }

    pub fn create(&self, new_item: NewItem) -> Result<Item> {
        let repository = self.repository;
        self.manager.transactional(false).run1(
            move |session, new_item: NewItem| repository.create(session, new_item),
            new_item,
        )
    }

    pub fn list(&self) -> Result<Vec<Item>> {
        let repository = self.repository;
        self.manager
            .transactional(true)
            .run(move |session| repository.list(session))
    }

    pub fn update(&self, item: Item) -> Result<Item> {
        let repository = self.repository;
        self.manager
            .transactional(false)
            .run1(move |session, item: Item| repository.update(session, item), item)
    }

    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let repository = self.repository;
        self.manager
            .transactional(false)
            .run1(move |session, id: Uuid| repository.delete(session, id), id)
    }
}

/// Non-blocking item facade, used by `NativeAsync` and `SyncBridgedAsync`.
///
/// # Examples
///
/// ```
/// use duotx::config::DbConfig;
/// use duotx::core::Mode;
/// use duotx::model::NewItem;
///
/// let service = duotx::selector::build_async(&DbConfig::new(Mode::NativeAsync)).unwrap();
/// tokio_test::block_on(async {
///     let item = service.create(NewItem::new("demo")).await.unwrap();
///     assert_eq!(service.get(item.id).await.unwrap(), Some(item));
/// });
/// ```
pub struct AsyncItemService {
    manager: AsyncManager,
    repository: ItemAsyncRepository,
}

impl AsyncItemService {
    pub fn new(manager: AsyncManager, repository: ItemAsyncRepository) -> Self {
        log::info!("init async item service");
        Self {
            manager,
            repository,
        }
    }

    pub fn mode(&self) -> Mode {
        self.repository.mode()
    }

    pub fn manager(&self) -> &AsyncManager {
        &self.manager
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Item>> {
        let repository = self.repository;
        self.manager
            .transactional(true)
            .run1(
                move |session, id: Uuid| {
                    async move { repository.get_by_id(session, id).await }.boxed()
                },
                id,
            )
            .await
    }

    pub async fn create(&self, new_item: NewItem) -> Result<Item> {
        let repository = self.repository;
        self.manager
            .transactional(false)
            .run1(
                move |session, new_item: NewItem| {
                    async move { repository.create(session, new_item).await }.boxed()
                },
                new_item,
            )
            .await
    }

    pub async fn list(&self) -> Result<Vec<Item>> {
        let repository = self.repository;
        self.manager
            .transactional(true)
            .run(move |session| async move { repository.list(session).await }.boxed())
            .await
    }

    pub async fn update(&self, item: Item) -> Result<Item> {
        let repository = self.repository;
        self.manager
            .transactional(false)
            .run1(
                move |session, item: Item| {
                    async move { repository.update(session, item).await }.boxed()
                },
                item,
            )
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let repository = self.repository;
        self.manager
            .transactional(false)
            .run1(
                move |session, id: Uuid| {
                    async move { repository.delete(session, id).await }.boxed()
                },
                id,
            )
            .await
    }
}

/// Facade flavor selected by the declared side of the mode.
pub enum ItemService {
    Sync(SyncItemService),
    Async(AsyncItemService),
}

impl ItemService {
    pub fn mode(&self) -> Mode {
        match self {
            ItemService::Sync(service) => service.mode(),
            ItemService::Async(service) => service.mode(),
        }
    }

    pub fn as_sync(&self) -> Option<&SyncItemService> {
        match self {
            ItemService::Sync(service) => Some(service),
            ItemService::Async(_) => None,
        }
    }

    pub fn as_async(&self) -> Option<&AsyncItemService> {
        match self {
            ItemService::Async(service) => Some(service),
            ItemService::Sync(_) => None,
        }
    }
}
