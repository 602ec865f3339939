//! Inventory service: item mutations with activity logging, plus the dashboard read.
//!
//! Every successful create/update/delete appends exactly one activity log for the
//! item's manager. Reads delegate to the repositories unchanged.
//!
//! The item write and the log append are separate repository calls, not one
//! transaction. If the append fails, the item change stays committed and the append
//! error is returned to the caller (and logged at error level with the item id).

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use stockroom_core::{Entity, ItemId, ManagerId};
use stockroom_inventory::{ActivityLog, InventoryItem, ItemAction, ItemDraft};

use crate::repository::{ActivityLogRepository, InventoryItemRepository, RepositoryError, RepositoryResult};

/// Per-manager summary backing the dashboard view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_items: usize,
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
    /// Σ price × quantity over all items.
    pub total_value: Decimal,
    /// Item count per category.
    pub categories: BTreeMap<String, usize>,
    pub items: Vec<InventoryItem>,
    pub recent_activities: Vec<ActivityLog>,
}

impl DashboardStats {
    /// Fails with `Rejected` when the total stock value does not fit in a `Decimal`.
    fn summarize(items: Vec<InventoryItem>, recent_activities: Vec<ActivityLog>) -> RepositoryResult<Self> {
        let mut categories = BTreeMap::new();
        for item in &items {
            *categories.entry(item.category().to_string()).or_insert(0) += 1;
        }

        let total_value = items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.stock_value()?))
            .ok_or_else(|| RepositoryError::Rejected("total stock value overflows".to_string()))?;

        Ok(Self {
            total_items: items.len(),
            low_stock_items: items.iter().filter(|i| i.is_low_stock()).count(),
            out_of_stock_items: items.iter().filter(|i| i.is_out_of_stock()).count(),
            total_value,
            categories,
            items,
            recent_activities,
        })
    }
}

#[derive(Debug, Clone)]
pub struct InventoryService<I, L> {
    items: I,
    logs: L,
}

impl<I, L> InventoryService<I, L>
where
    I: InventoryItemRepository,
    L: ActivityLogRepository,
{
    pub fn new(items: I, logs: L) -> Self {
        Self { items, logs }
    }

    #[instrument(skip(self, draft), fields(manager_id = %manager_id), err)]
    pub async fn create_item(&self, manager_id: ManagerId, draft: ItemDraft) -> RepositoryResult<InventoryItem> {
        let saved = self.items.save(InventoryItem::new(manager_id, draft)).await?;
        self.log(ItemAction::Created, &saved).await?;
        Ok(saved)
    }

    #[instrument(skip(self, draft), fields(manager_id = %manager_id, item_id = %item_id), err)]
    pub async fn update_item(
        &self,
        manager_id: ManagerId,
        item_id: ItemId,
        draft: ItemDraft,
    ) -> RepositoryResult<InventoryItem> {
        let mut item = self
            .items
            .find_by_id(manager_id, item_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        item.apply(draft);

        let saved = self.items.save(item).await?;
        self.log(ItemAction::Updated, &saved).await?;
        Ok(saved)
    }

    #[instrument(skip(self), fields(manager_id = %manager_id, item_id = %item_id), err)]
    pub async fn delete_item(&self, manager_id: ManagerId, item_id: ItemId) -> RepositoryResult<()> {
        let removed = self.items.delete(manager_id, item_id).await?;
        self.log(ItemAction::Deleted, &removed).await?;
        Ok(())
    }

    pub async fn get_item(&self, manager_id: ManagerId, item_id: ItemId) -> RepositoryResult<InventoryItem> {
        self.items
            .find_by_id(manager_id, item_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    pub async fn list_items(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        self.items.find_by_manager_id(manager_id).await
    }

    pub async fn search_items(&self, manager_id: ManagerId, term: &str) -> RepositoryResult<Vec<InventoryItem>> {
        self.items.search_items(term, manager_id).await
    }

    pub async fn low_stock_items(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        self.items.find_low_stock_items(manager_id).await
    }

    pub async fn out_of_stock_items(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        self.items.find_out_of_stock_items(manager_id).await
    }

    pub async fn recent_activity(&self, manager_id: ManagerId) -> RepositoryResult<Vec<ActivityLog>> {
        self.logs
            .find_top10_by_manager_id_order_by_timestamp_desc(manager_id)
            .await
    }

    #[instrument(skip(self), fields(manager_id = %manager_id), err)]
    pub async fn dashboard(&self, manager_id: ManagerId) -> RepositoryResult<DashboardStats> {
        let (items, recent) = tokio::try_join!(
            self.items.find_by_manager_id(manager_id),
            self.logs.find_top10_by_manager_id_order_by_timestamp_desc(manager_id),
        )?;
        DashboardStats::summarize(items, recent)
    }

    async fn log(&self, action: ItemAction, item: &InventoryItem) -> RepositoryResult<ActivityLog> {
        let entry = ActivityLog::record(action, item, Utc::now())?;
        let saved = self.logs.append(entry).await.inspect_err(|e| {
            tracing::error!(action = %action, item_id = ?item.id(), error = %e, "activity log append failed after item write");
        })?;
        tracing::info!(action = %saved.action(), item_id = %saved.item_id(), "inventory activity recorded");
        Ok(saved)
    }
}
