//! `stockroom-inventory`: store managers, inventory items and activity logs.
//!
//! Entities here are plain records with explicit validation and query predicates.
//! Persistence lives in `stockroom-infra`.

pub mod activity;
pub mod item;
pub mod manager;

pub use activity::{most_recent_first, ActivityLog, ItemAction, RECENT_ACTIVITY_LIMIT};
pub use item::{InventoryItem, ItemDraft, LOW_STOCK_THRESHOLD, PRICE_SCALE};
pub use manager::StoreManager;
