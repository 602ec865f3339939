//! In-memory repositories for tests/dev.
//!
//! Rows live in a `BTreeMap` keyed by id, so "ordered by id" falls out of iteration
//! order. Manager isolation is enforced by filtering every read on `manager_id`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::instrument;

use stockroom_core::{ActivityLogId, Entity, ItemId, ManagerId, ManagerScoped, Validate};
use stockroom_inventory::{most_recent_first, ActivityLog, InventoryItem, StoreManager, RECENT_ACTIVITY_LIMIT};

use super::{
    ActivityLogRepository, InventoryItemRepository, RepositoryError, RepositoryResult,
    StoreManagerRepository,
};

/// Id-keyed table with a sequence, shared by the three repositories.
#[derive(Debug)]
struct Table<K, V> {
    rows: RwLock<BTreeMap<K, V>>,
    sequence: AtomicI64,
}

impl<K: Ord, V> Table<K, V> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            sequence: AtomicI64::new(0),
        }
    }

    fn next_id(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, BTreeMap<K, V>>> {
        self.rows
            .read()
            .map_err(|_| RepositoryError::Storage("in-memory table lock poisoned".to_string()))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, BTreeMap<K, V>>> {
        self.rows
            .write()
            .map_err(|_| RepositoryError::Storage("in-memory table lock poisoned".to_string()))
    }
}

impl<K: Ord, V: ManagerScoped + Clone> Table<K, V> {
    /// Rows owned by `manager_id` that satisfy `keep`, in id order.
    fn scoped(&self, manager_id: ManagerId, keep: impl Fn(&V) -> bool) -> RepositoryResult<Vec<V>> {
        let rows = self.read()?;
        Ok(rows
            .values()
            .filter(|v| v.manager_id() == manager_id && keep(*v))
            .cloned()
            .collect())
    }
}

/// In-memory store manager repository.
#[derive(Debug)]
pub struct InMemoryStoreManagerRepository {
    table: Table<ManagerId, StoreManager>,
}

impl InMemoryStoreManagerRepository {
    pub fn new() -> Self {
        Self { table: Table::new() }
    }
}

impl Default for InMemoryStoreManagerRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreManagerRepository for InMemoryStoreManagerRepository {
    #[instrument(skip(self, manager), fields(email = %manager.email()), err)]
    async fn save(&self, manager: StoreManager) -> RepositoryResult<StoreManager> {
        manager.ensure_valid()?;

        let mut rows = self.table.write()?;
        let duplicate = rows
            .values()
            .any(|m| m.email() == manager.email() && m.id() != manager.id());
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "email already registered: {}",
                manager.email()
            )));
        }

        let saved = match manager.id() {
            None => manager.with_id(ManagerId::new(self.table.next_id())),
            Some(id) if rows.contains_key(&id) => manager,
            Some(_) => return Err(RepositoryError::NotFound),
        };
        let id = saved.id().ok_or(RepositoryError::NotFound)?;
        rows.insert(id, saved.clone());
        Ok(saved)
    }

    async fn find_by_id(&self, id: ManagerId) -> RepositoryResult<Option<StoreManager>> {
        Ok(self.table.read()?.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<StoreManager>> {
        Ok(self
            .table
            .read()?
            .values()
            .find(|m| m.email() == email)
            .cloned())
    }
}

/// In-memory inventory item repository.
#[derive(Debug)]
pub struct InMemoryInventoryItemRepository {
    table: Table<ItemId, InventoryItem>,
}

impl InMemoryInventoryItemRepository {
    pub fn new() -> Self {
        Self { table: Table::new() }
    }
}

impl Default for InMemoryInventoryItemRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryItemRepository for InMemoryInventoryItemRepository {
    #[instrument(skip(self, item), fields(manager_id = %item.manager_id()), err)]
    async fn save(&self, mut item: InventoryItem) -> RepositoryResult<InventoryItem> {
        item.ensure_valid()?;
        item.on_update();

        let mut rows = self.table.write()?;
        let saved = match item.id() {
            None => item.with_id(ItemId::new(self.table.next_id())),
            Some(id) => {
                let owned = rows
                    .get(&id)
                    .is_some_and(|existing| existing.manager_id() == item.manager_id());
                if !owned {
                    return Err(RepositoryError::NotFound);
                }
                item
            }
        };
        let id = saved.id().ok_or(RepositoryError::NotFound)?;
        rows.insert(id, saved.clone());
        Ok(saved)
    }

    async fn find_by_id(&self, manager_id: ManagerId, id: ItemId) -> RepositoryResult<Option<InventoryItem>> {
        Ok(self
            .table
            .read()?
            .get(&id)
            .filter(|item| item.manager_id() == manager_id)
            .cloned())
    }

    #[instrument(skip(self), fields(manager_id = %manager_id, item_id = %id), err)]
    async fn delete(&self, manager_id: ManagerId, id: ItemId) -> RepositoryResult<InventoryItem> {
        let mut rows = self.table.write()?;
        let owned = rows.get(&id).is_some_and(|item| item.manager_id() == manager_id);
        if !owned {
            return Err(RepositoryError::NotFound);
        }
        rows.remove(&id).ok_or(RepositoryError::NotFound)
    }

    async fn find_by_manager_id(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        self.table.scoped(manager_id, |_| true)
    }

    async fn find_low_stock_items(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        self.table.scoped(manager_id, InventoryItem::is_low_stock)
    }

    async fn find_out_of_stock_items(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        self.table.scoped(manager_id, InventoryItem::is_out_of_stock)
    }

    async fn search_items(&self, term: &str, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        self.table.scoped(manager_id, |item| item.matches_term(term))
    }
}

/// In-memory activity log repository (append-only).
#[derive(Debug)]
pub struct InMemoryActivityLogRepository {
    table: Table<ActivityLogId, ActivityLog>,
}

impl InMemoryActivityLogRepository {
    pub fn new() -> Self {
        Self { table: Table::new() }
    }

    /// Total number of logs across all managers.
    pub fn len(&self) -> RepositoryResult<usize> {
        Ok(self.table.read()?.len())
    }

    pub fn is_empty(&self) -> RepositoryResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for InMemoryActivityLogRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityLogRepository for InMemoryActivityLogRepository {
    async fn append(&self, log: ActivityLog) -> RepositoryResult<ActivityLog> {
        if let Some(id) = log.id() {
            return Err(RepositoryError::Conflict(format!(
                "activity log {id} is already persisted and cannot be rewritten"
            )));
        }

        let mut rows = self.table.write()?;
        let id = ActivityLogId::new(self.table.next_id());
        let saved = log.with_id(id);
        rows.insert(id, saved.clone());
        Ok(saved)
    }

    async fn find_top10_by_manager_id_order_by_timestamp_desc(
        &self,
        manager_id: ManagerId,
    ) -> RepositoryResult<Vec<ActivityLog>> {
        let logs = self.table.scoped(manager_id, |_| true)?;
        Ok(most_recent_first(logs, RECENT_ACTIVITY_LIMIT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use stockroom_inventory::ItemDraft;

    fn draft(name: &str, quantity: i32) -> ItemDraft {
        ItemDraft {
            name: name.to_string(),
            sku: format!("SKU-{name}"),
            category: "Misc".to_string(),
            price: Decimal::ONE,
            quantity,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn item_ids_are_assigned_sequentially() {
        let repo = InMemoryInventoryItemRepository::new();
        let m = ManagerId::new(1);

        let a = repo.save(InventoryItem::new(m, draft("a", 1))).await.unwrap();
        let b = repo.save(InventoryItem::new(m, draft("b", 1))).await.unwrap();

        assert_eq!(a.id(), Some(ItemId::new(1)));
        assert_eq!(b.id(), Some(ItemId::new(2)));
    }

    #[tokio::test]
    async fn invalid_item_is_not_persisted() {
        let repo = InMemoryInventoryItemRepository::new();
        let m = ManagerId::new(1);

        let err = repo.save(InventoryItem::new(m, draft("bad", -1))).await.unwrap_err();
        match err {
            RepositoryError::Invalid(v) => assert!(v.contains("quantity")),
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert!(repo.find_by_manager_id(m).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_refreshes_updated_at() {
        let repo = InMemoryInventoryItemRepository::new();
        let m = ManagerId::new(1);
        let saved = repo.save(InventoryItem::new(m, draft("a", 1))).await.unwrap();
        let before = saved.updated_at();

        let updated = repo.save(saved).await.unwrap();
        assert!(updated.updated_at() > before);
    }

    #[tokio::test]
    async fn cannot_update_or_delete_another_managers_item() {
        let repo = InMemoryInventoryItemRepository::new();
        let owner = ManagerId::new(1);
        let intruder = ManagerId::new(2);
        let saved = repo.save(InventoryItem::new(owner, draft("a", 1))).await.unwrap();
        let id = saved.id().unwrap();

        let hijacked = InventoryItem::new(intruder, draft("stolen", 1)).with_id(id);
        assert_eq!(repo.save(hijacked).await.unwrap_err(), RepositoryError::NotFound);
        assert_eq!(repo.delete(intruder, id).await.unwrap_err(), RepositoryError::NotFound);
        assert_eq!(repo.find_by_id(intruder, id).await.unwrap(), None);
        assert_eq!(repo.find_by_id(owner, id).await.unwrap().unwrap().name(), "a");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let repo = InMemoryStoreManagerRepository::new();
        repo.save(StoreManager::new("A", "a@example.com", "h")).await.unwrap();

        let err = repo
            .save(StoreManager::new("B", "a@example.com", "h"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn manager_update_keeps_id() {
        let repo = InMemoryStoreManagerRepository::new();
        let saved = repo.save(StoreManager::new("A", "a@example.com", "h")).await.unwrap();
        let id = saved.id().unwrap();

        let renamed = StoreManager::new("A. Person", "a@example.com", "h").with_id(id);
        repo.save(renamed.clone()).await.unwrap();

        assert_eq!(repo.find_by_id(id).await.unwrap(), Some(renamed));
        assert_eq!(
            repo.find_by_email("a@example.com").await.unwrap().unwrap().name(),
            "A. Person"
        );
    }

    #[tokio::test]
    async fn persisted_logs_cannot_be_appended_again() {
        let repo = InMemoryActivityLogRepository::new();
        let log = ActivityLog::new(ManagerId::new(1), "Created Item: a", "a", ItemId::new(1), Utc::now());

        let saved = repo.append(log).await.unwrap();
        assert!(matches!(repo.append(saved).await, Err(RepositoryError::Conflict(_))));
        assert_eq!(repo.len().unwrap(), 1);
    }

    #[test]
    fn poisoned_log_table_is_a_storage_error() {
        let repo = std::sync::Arc::new(InMemoryActivityLogRepository::new());
        let writer = repo.clone();
        let _ = std::thread::spawn(move || {
            let _guard = writer.table.rows.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(repo.len(), Err(RepositoryError::Storage(_))));
        assert!(matches!(repo.is_empty(), Err(RepositoryError::Storage(_))));
    }

    #[tokio::test]
    async fn recent_logs_for_unknown_manager_are_empty() {
        let repo = InMemoryActivityLogRepository::new();
        repo.append(ActivityLog::new(
            ManagerId::new(1),
            "Created Item: a",
            "a",
            ItemId::new(1),
            Utc::now() - Duration::minutes(1),
        ))
        .await
        .unwrap();

        let logs = repo
            .find_top10_by_manager_id_order_by_timestamp_desc(ManagerId::new(99))
            .await
            .unwrap();
        assert!(logs.is_empty());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn seed_strategy() -> impl Strategy<Value = Vec<(i64, String, String, i32)>> {
            prop::collection::vec((1i64..4, "[A-Za-z]{1,8}", "[A-Za-z]{1,6}", 0i32..30), 0..40)
        }

        fn load(seeds: &[(i64, String, String, i32)]) -> (InMemoryInventoryItemRepository, Vec<InventoryItem>) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let repo = InMemoryInventoryItemRepository::new();
            let saved = rt.block_on(async {
                let mut saved = Vec::new();
                for (manager, name, category, quantity) in seeds {
                    let mut d = draft(name, *quantity);
                    d.category = category.clone();
                    saved.push(repo.save(InventoryItem::new(ManagerId::new(*manager), d)).await.unwrap());
                }
                saved
            });
            (repo, saved)
        }

        fn expected(saved: &[InventoryItem], manager: ManagerId, keep: impl Fn(&InventoryItem) -> bool) -> Vec<InventoryItem> {
            saved
                .iter()
                .filter(|i| i.manager_id() == manager && keep(*i))
                .cloned()
                .collect()
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: search returns exactly the manager's items the predicate matches, in id order.
            #[test]
            fn search_agrees_with_matches_term(seeds in seed_strategy(), manager in 1i64..4, term in "[A-Za-z]{0,3}") {
                let (repo, saved) = load(&seeds);
                let manager = ManagerId::new(manager);
                let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

                let found = rt.block_on(repo.search_items(&term, manager)).unwrap();
                prop_assert_eq!(found, expected(&saved, manager, |i| i.matches_term(&term)));
            }

            /// Property: stock queries return exactly the items the stock predicates select.
            #[test]
            fn stock_queries_agree_with_predicates(seeds in seed_strategy(), manager in 1i64..4) {
                let (repo, saved) = load(&seeds);
                let manager = ManagerId::new(manager);
                let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

                let low = rt.block_on(repo.find_low_stock_items(manager)).unwrap();
                prop_assert_eq!(low, expected(&saved, manager, InventoryItem::is_low_stock));

                let out = rt.block_on(repo.find_out_of_stock_items(manager)).unwrap();
                prop_assert_eq!(out, expected(&saved, manager, InventoryItem::is_out_of_stock));

                let all = rt.block_on(repo.find_by_manager_id(manager)).unwrap();
                prop_assert_eq!(all, expected(&saved, manager, |_| true));
            }
        }
    }
}
