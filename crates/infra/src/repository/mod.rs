//! Manager-scoped repositories for managers, inventory items and activity logs.
//!
//! Every query that returns items or logs takes the owning `ManagerId` explicitly.
//! Implementations must never return another manager's records.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use stockroom_core::{DomainError, ItemId, ManagerId, Violations};
use stockroom_inventory::{ActivityLog, InventoryItem, StoreManager};

pub use in_memory::{
    InMemoryActivityLogRepository, InMemoryInventoryItemRepository, InMemoryStoreManagerRepository,
};
pub use postgres::{
    migrate, PostgresActivityLogRepository, PostgresInventoryItemRepository, PostgresStoreManagerRepository,
};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository operation error.
///
/// Persistence failures are surfaced as-is (no retries); query operations for an
/// unknown manager return empty results rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The entity failed field validation and was not persisted.
    #[error("invalid entity: {0}")]
    Invalid(Violations),

    #[error("not found")]
    NotFound,

    /// A uniqueness or immutability rule was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request was rejected by a domain rule other than field validation.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Storage backend failure (connection, lock, constraint, decode).
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<DomainError> for RepositoryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Invalid(v) => RepositoryError::Invalid(v),
            DomainError::NotFound => RepositoryError::NotFound,
            DomainError::Conflict(msg) => RepositoryError::Conflict(msg),
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => RepositoryError::Rejected(msg),
        }
    }
}

#[async_trait]
pub trait StoreManagerRepository: Send + Sync {
    /// Insert (no id) or update (id set). Rejects invalid managers and duplicate emails.
    async fn save(&self, manager: StoreManager) -> RepositoryResult<StoreManager>;

    async fn find_by_id(&self, id: ManagerId) -> RepositoryResult<Option<StoreManager>>;

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<StoreManager>>;
}

#[async_trait]
pub trait InventoryItemRepository: Send + Sync {
    /// Validate, refresh `updated_at`, then insert (no id) or update (id set).
    ///
    /// Updates only touch rows owned by the item's manager; a missing row is `NotFound`.
    async fn save(&self, item: InventoryItem) -> RepositoryResult<InventoryItem>;

    async fn find_by_id(&self, manager_id: ManagerId, id: ItemId) -> RepositoryResult<Option<InventoryItem>>;

    /// Remove an item and return it. Activity logs referencing it are kept.
    async fn delete(&self, manager_id: ManagerId, id: ItemId) -> RepositoryResult<InventoryItem>;

    /// All items owned by the manager, ordered by id.
    async fn find_by_manager_id(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>>;

    /// Items with `0 < quantity < 10`.
    async fn find_low_stock_items(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>>;

    /// Items with `quantity == 0`.
    async fn find_out_of_stock_items(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>>;

    /// Items whose name, category or sku contains `term`, ignoring case.
    async fn search_items(&self, term: &str, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>>;
}

#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    /// Persist a new log entry. Logs are immutable: an entry that already has an id is rejected.
    async fn append(&self, log: ActivityLog) -> RepositoryResult<ActivityLog>;

    /// Up to 10 of the manager's logs, most recent first.
    async fn find_top10_by_manager_id_order_by_timestamp_desc(
        &self,
        manager_id: ManagerId,
    ) -> RepositoryResult<Vec<ActivityLog>>;
}

#[async_trait]
impl<S> StoreManagerRepository for Arc<S>
where
    S: StoreManagerRepository + ?Sized,
{
    async fn save(&self, manager: StoreManager) -> RepositoryResult<StoreManager> {
        (**self).save(manager).await
    }

    async fn find_by_id(&self, id: ManagerId) -> RepositoryResult<Option<StoreManager>> {
        (**self).find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<StoreManager>> {
        (**self).find_by_email(email).await
    }
}

#[async_trait]
impl<S> InventoryItemRepository for Arc<S>
where
    S: InventoryItemRepository + ?Sized,
{
    async fn save(&self, item: InventoryItem) -> RepositoryResult<InventoryItem> {
        (**self).save(item).await
    }

    async fn find_by_id(&self, manager_id: ManagerId, id: ItemId) -> RepositoryResult<Option<InventoryItem>> {
        (**self).find_by_id(manager_id, id).await
    }

    async fn delete(&self, manager_id: ManagerId, id: ItemId) -> RepositoryResult<InventoryItem> {
        (**self).delete(manager_id, id).await
    }

    async fn find_by_manager_id(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        (**self).find_by_manager_id(manager_id).await
    }

    async fn find_low_stock_items(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        (**self).find_low_stock_items(manager_id).await
    }

    async fn find_out_of_stock_items(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        (**self).find_out_of_stock_items(manager_id).await
    }

    async fn search_items(&self, term: &str, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        (**self).search_items(term, manager_id).await
    }
}

#[async_trait]
impl<S> ActivityLogRepository for Arc<S>
where
    S: ActivityLogRepository + ?Sized,
{
    async fn append(&self, log: ActivityLog) -> RepositoryResult<ActivityLog> {
        (**self).append(log).await
    }

    async fn find_top10_by_manager_id_order_by_timestamp_desc(
        &self,
        manager_id: ManagerId,
    ) -> RepositoryResult<Vec<ActivityLog>> {
        (**self)
            .find_top10_by_manager_id_order_by_timestamp_desc(manager_id)
            .await
    }
}
