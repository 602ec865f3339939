use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{ActivityLogId, DomainError, DomainResult, Entity, ItemId, ManagerId, ManagerScoped};

use crate::item::InventoryItem;

/// Maximum number of entries in a manager's recent-activity feed.
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Kind of inventory mutation that produced an activity log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemAction {
    Created,
    Updated,
    Deleted,
}

impl ItemAction {
    pub fn label(self) -> &'static str {
        match self {
            ItemAction::Created => "Created Item",
            ItemAction::Updated => "Updated Item",
            ItemAction::Deleted => "Deleted Item",
        }
    }

    /// Human-readable action text, e.g. `"Created Item: Laptop"`.
    pub fn describe(self, item_name: &str) -> String {
        format!("{}: {}", self.label(), item_name)
    }
}

impl core::fmt::Display for ItemAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable record of one inventory mutation.
///
/// `item_id` is a snapshot reference: the log outlives the item it describes, so
/// nothing guarantees the item still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    id: Option<ActivityLogId>,
    manager_id: ManagerId,
    action: String,
    item_name: String,
    item_id: ItemId,
    timestamp: DateTime<Utc>,
}

impl ActivityLog {
    pub fn new(
        manager_id: ManagerId,
        action: impl Into<String>,
        item_name: impl Into<String>,
        item_id: ItemId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            manager_id,
            action: action.into(),
            item_name: item_name.into(),
            item_id,
            timestamp,
        }
    }

    /// Log `action` against a persisted item, attributed to the item's manager.
    pub fn record(action: ItemAction, item: &InventoryItem, timestamp: DateTime<Utc>) -> DomainResult<Self> {
        let item_id = item
            .id()
            .ok_or_else(|| DomainError::validation("cannot log activity for an unsaved item"))?;
        Ok(Self::new(
            item.manager_id(),
            action.describe(item.name()),
            item.name(),
            item_id,
            timestamp,
        ))
    }

    pub fn with_id(mut self, id: ActivityLogId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Entity for ActivityLog {
    type Id = ActivityLogId;

    fn id(&self) -> Option<ActivityLogId> {
        self.id
    }
}

impl ManagerScoped for ActivityLog {
    fn manager_id(&self) -> ManagerId {
        self.manager_id
    }
}

/// Most recent first; ties broken by id (later inserts first), then capped at `limit`.
pub fn most_recent_first(mut logs: Vec<ActivityLog>, limit: usize) -> Vec<ActivityLog> {
    logs.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
    logs.truncate(limit);
    logs
}
