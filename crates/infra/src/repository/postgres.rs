//! Postgres-backed repositories.
//!
//! ## Manager Isolation
//!
//! Every item/log query includes `manager_id` in the WHERE clause, and updates/deletes
//! match on `(id, manager_id)`. A row owned by another manager is indistinguishable from
//! a missing row.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | RepositoryError |
//! |------------|-----------------|-----------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Storage` |
//! | Database (check constraint violation) | `23514` | `Storage` |
//! | Database (other) | any | `Storage` |
//! | PoolClosed / RowNotFound / other | n/a | `Storage` |
//!
//! ## Activity log references
//!
//! `activity_logs.item_id` has no foreign key: logs outlive the items
//! they describe.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Row};
use tracing::{instrument, Span};

use stockroom_core::{ActivityLogId, Entity, ItemId, ManagerId, ManagerScoped, Validate};
use stockroom_inventory::{ActivityLog, InventoryItem, ItemDraft, StoreManager, LOW_STOCK_THRESHOLD, RECENT_ACTIVITY_LIMIT};

use super::{
    ActivityLogRepository, InventoryItemRepository, RepositoryError, RepositoryResult,
    StoreManagerRepository,
};

/// Schema statements, applied in order by [`migrate`]. Idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS store_managers (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory_items (
        id BIGSERIAL PRIMARY KEY,
        manager_id BIGINT NOT NULL REFERENCES store_managers(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        sku TEXT NOT NULL,
        category TEXT NOT NULL,
        price NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
        quantity INTEGER NOT NULL CHECK (quantity >= 0),
        image_url TEXT,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS inventory_items_manager_idx ON inventory_items (manager_id)",
    r#"
    CREATE TABLE IF NOT EXISTS activity_logs (
        id BIGSERIAL PRIMARY KEY,
        manager_id BIGINT NOT NULL REFERENCES store_managers(id) ON DELETE CASCADE,
        action TEXT NOT NULL,
        item_name TEXT NOT NULL,
        item_id BIGINT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS activity_logs_manager_ts_idx ON activity_logs (manager_id, timestamp DESC)",
];

// Writes return these columns so callers get the stored (rounded, truncated) values.
const MANAGER_COLUMNS: &str = "id, name, email, password_hash, created_at";
const ITEM_COLUMNS: &str = "id, manager_id, name, sku, category, price, quantity, image_url, updated_at";
const LOG_COLUMNS: &str = "id, manager_id, action, item_name, item_id, timestamp";

/// Create tables and indexes if they do not exist.
#[instrument(skip(pool), err)]
pub async fn migrate(pool: &PgPool) -> RepositoryResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
    }
    Ok(())
}

/// Postgres-backed store manager repository.
#[derive(Debug, Clone)]
pub struct PostgresStoreManagerRepository {
    pool: Arc<PgPool>,
}

impl PostgresStoreManagerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl StoreManagerRepository for PostgresStoreManagerRepository {
    #[instrument(skip(self, manager), fields(email = %manager.email()), err)]
    async fn save(&self, manager: StoreManager) -> RepositoryResult<StoreManager> {
        manager.ensure_valid()?;

        match manager.id() {
            None => {
                let sql = format!(
                    "INSERT INTO store_managers (name, email, password_hash, created_at) \
                     VALUES ($1, $2, $3, $4) RETURNING {MANAGER_COLUMNS}"
                );
                let row = sqlx::query(&sql)
                    .bind(manager.name())
                    .bind(manager.email())
                    .bind(manager.password_hash())
                    .bind(manager.created_at())
                    .fetch_one(&*self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("insert_manager", e))?;

                decode::<ManagerRow>("insert_manager", &row).map(Into::into)
            }
            Some(id) => {
                let sql = format!(
                    "UPDATE store_managers SET name = $2, email = $3, password_hash = $4 \
                     WHERE id = $1 RETURNING {MANAGER_COLUMNS}"
                );
                let row = sqlx::query(&sql)
                    .bind(id.get())
                    .bind(manager.name())
                    .bind(manager.email())
                    .bind(manager.password_hash())
                    .fetch_optional(&*self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("update_manager", e))?
                    .ok_or(RepositoryError::NotFound)?;

                decode::<ManagerRow>("update_manager", &row).map(Into::into)
            }
        }
    }

    #[instrument(skip(self), fields(manager_id = %id), err)]
    async fn find_by_id(&self, id: ManagerId) -> RepositoryResult<Option<StoreManager>> {
        let sql = format!("SELECT {MANAGER_COLUMNS} FROM store_managers WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_manager_by_id", e))?;

        row.map(|r| decode::<ManagerRow>("find_manager_by_id", &r).map(Into::into))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<StoreManager>> {
        let sql = format!("SELECT {MANAGER_COLUMNS} FROM store_managers WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_manager_by_email", e))?;

        row.map(|r| decode::<ManagerRow>("find_manager_by_email", &r).map(Into::into))
            .transpose()
    }
}

/// Postgres-backed inventory item repository.
#[derive(Debug, Clone)]
pub struct PostgresInventoryItemRepository {
    pool: Arc<PgPool>,
}

impl PostgresInventoryItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn fetch_items(
        &self,
        operation: &str,
        sql: &str,
        manager_id: ManagerId,
        term: Option<&str>,
    ) -> RepositoryResult<Vec<InventoryItem>> {
        let mut query = sqlx::query(sql).bind(manager_id.get());
        if let Some(term) = term {
            query = query.bind(term);
        }

        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        Span::current().record("row_count", rows.len());

        rows.iter()
            .map(|r| decode::<ItemRow>(operation, r).map(Into::into))
            .collect()
    }
}

#[async_trait]
impl InventoryItemRepository for PostgresInventoryItemRepository {
    #[instrument(skip(self, item), fields(manager_id = %item.manager_id()), err)]
    async fn save(&self, mut item: InventoryItem) -> RepositoryResult<InventoryItem> {
        item.ensure_valid()?;
        item.on_update();

        match item.id() {
            None => {
                let sql = format!(
                    "INSERT INTO inventory_items \
                         (manager_id, name, sku, category, price, quantity, image_url, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                     RETURNING {ITEM_COLUMNS}"
                );
                let row = sqlx::query(&sql)
                    .bind(item.manager_id().get())
                    .bind(item.name())
                    .bind(item.sku())
                    .bind(item.category())
                    .bind(item.price())
                    .bind(item.quantity())
                    .bind(item.image_url())
                    .bind(item.updated_at())
                    .fetch_one(&*self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("insert_item", e))?;

                decode::<ItemRow>("insert_item", &row).map(Into::into)
            }
            Some(id) => {
                let sql = format!(
                    "UPDATE inventory_items \
                     SET name = $3, sku = $4, category = $5, price = $6, \
                         quantity = $7, image_url = $8, updated_at = $9 \
                     WHERE id = $1 AND manager_id = $2 \
                     RETURNING {ITEM_COLUMNS}"
                );
                let row = sqlx::query(&sql)
                    .bind(id.get())
                    .bind(item.manager_id().get())
                    .bind(item.name())
                    .bind(item.sku())
                    .bind(item.category())
                    .bind(item.price())
                    .bind(item.quantity())
                    .bind(item.image_url())
                    .bind(item.updated_at())
                    .fetch_optional(&*self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("update_item", e))?
                    .ok_or(RepositoryError::NotFound)?;

                decode::<ItemRow>("update_item", &row).map(Into::into)
            }
        }
    }

    #[instrument(skip(self), fields(manager_id = %manager_id, item_id = %id), err)]
    async fn find_by_id(&self, manager_id: ManagerId, id: ItemId) -> RepositoryResult<Option<InventoryItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 AND manager_id = $2");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(manager_id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_item_by_id", e))?;

        row.map(|r| decode::<ItemRow>("find_item_by_id", &r).map(Into::into))
            .transpose()
    }

    #[instrument(skip(self), fields(manager_id = %manager_id, item_id = %id), err)]
    async fn delete(&self, manager_id: ManagerId, id: ItemId) -> RepositoryResult<InventoryItem> {
        let sql = format!("DELETE FROM inventory_items WHERE id = $1 AND manager_id = $2 RETURNING {ITEM_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(manager_id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?
            .ok_or(RepositoryError::NotFound)?;

        decode::<ItemRow>("delete_item", &row).map(Into::into)
    }

    #[instrument(skip(self), fields(manager_id = %manager_id, row_count), err)]
    async fn find_by_manager_id(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE manager_id = $1 ORDER BY id");
        self.fetch_items("find_by_manager_id", &sql, manager_id, None).await
    }

    #[instrument(skip(self), fields(manager_id = %manager_id, row_count), err)]
    async fn find_low_stock_items(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items \
             WHERE manager_id = $1 AND quantity > 0 AND quantity < {LOW_STOCK_THRESHOLD} \
             ORDER BY id"
        );
        self.fetch_items("find_low_stock_items", &sql, manager_id, None).await
    }

    #[instrument(skip(self), fields(manager_id = %manager_id, row_count), err)]
    async fn find_out_of_stock_items(&self, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE manager_id = $1 AND quantity = 0 ORDER BY id"
        );
        self.fetch_items("find_out_of_stock_items", &sql, manager_id, None).await
    }

    #[instrument(skip(self), fields(manager_id = %manager_id, row_count), err)]
    async fn search_items(&self, term: &str, manager_id: ManagerId) -> RepositoryResult<Vec<InventoryItem>> {
        // strpos keeps `%` and `_` in the term literal.
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items \
             WHERE manager_id = $1 \
               AND (strpos(lower(name), lower($2)) > 0 \
                 OR strpos(lower(category), lower($2)) > 0 \
                 OR strpos(lower(sku), lower($2)) > 0) \
             ORDER BY id"
        );
        self.fetch_items("search_items", &sql, manager_id, Some(term)).await
    }
}

/// Postgres-backed activity log repository (append-only).
#[derive(Debug, Clone)]
pub struct PostgresActivityLogRepository {
    pool: Arc<PgPool>,
}

impl PostgresActivityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl ActivityLogRepository for PostgresActivityLogRepository {
    #[instrument(skip(self, log), fields(manager_id = %log.manager_id()), err)]
    async fn append(&self, log: ActivityLog) -> RepositoryResult<ActivityLog> {
        if let Some(id) = log.id() {
            return Err(RepositoryError::Conflict(format!(
                "activity log {id} is already persisted and cannot be rewritten"
            )));
        }

        let sql = format!(
            "INSERT INTO activity_logs (manager_id, action, item_name, item_id, timestamp) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {LOG_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(log.manager_id().get())
            .bind(log.action())
            .bind(log.item_name())
            .bind(log.item_id().get())
            .bind(log.timestamp())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("append_activity_log", e))?;

        decode::<ActivityLogRow>("append_activity_log", &row).map(Into::into)
    }

    #[instrument(skip(self), fields(manager_id = %manager_id), err)]
    async fn find_top10_by_manager_id_order_by_timestamp_desc(
        &self,
        manager_id: ManagerId,
    ) -> RepositoryResult<Vec<ActivityLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM activity_logs \
             WHERE manager_id = $1 \
             ORDER BY timestamp DESC, id DESC \
             LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(manager_id.get())
            .bind(RECENT_ACTIVITY_LIMIT as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_recent_activity", e))?;

        rows.iter()
            .map(|r| decode::<ActivityLogRow>("find_recent_activity", r).map(Into::into))
            .collect()
    }
}

/// Map SQLx errors to RepositoryError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Conflict(msg),
                Some("23503") | Some("23514") => RepositoryError::Storage(format!(
                    "{} (constraint: {})",
                    msg,
                    db_err.constraint().unwrap_or("unknown")
                )),
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => {
            RepositoryError::Storage(format!("unexpected row not found in {}", operation))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode<'r, T>(operation: &str, row: &'r sqlx::postgres::PgRow) -> RepositoryResult<T>
where
    T: FromRow<'r, sqlx::postgres::PgRow>,
{
    T::from_row(row).map_err(|e| RepositoryError::Storage(format!("failed to decode row in {}: {}", operation, e)))
}

// SQLx row types

#[derive(Debug)]
struct ManagerRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for ManagerRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ManagerRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<ManagerRow> for StoreManager {
    fn from(row: ManagerRow) -> Self {
        StoreManager::new(row.name, row.email, row.password_hash)
            .with_id(ManagerId::new(row.id))
            .with_created_at(row.created_at)
    }
}

#[derive(Debug)]
struct ItemRow {
    id: i64,
    manager_id: i64,
    name: String,
    sku: String,
    category: String,
    price: Decimal,
    quantity: i32,
    image_url: Option<String>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for ItemRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            manager_id: row.try_get("manager_id")?,
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            category: row.try_get("category")?,
            price: row.try_get("price")?,
            quantity: row.try_get("quantity")?,
            image_url: row.try_get("image_url")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ItemRow> for InventoryItem {
    fn from(row: ItemRow) -> Self {
        let draft = ItemDraft {
            name: row.name,
            sku: row.sku,
            category: row.category,
            price: row.price,
            quantity: row.quantity,
            image_url: row.image_url,
        };
        InventoryItem::new(ManagerId::new(row.manager_id), draft)
            .with_id(ItemId::new(row.id))
            .with_updated_at(row.updated_at)
    }
}

#[derive(Debug)]
struct ActivityLogRow {
    id: i64,
    manager_id: i64,
    action: String,
    item_name: String,
    item_id: i64,
    timestamp: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for ActivityLogRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ActivityLogRow {
            id: row.try_get("id")?,
            manager_id: row.try_get("manager_id")?,
            action: row.try_get("action")?,
            item_name: row.try_get("item_name")?,
            item_id: row.try_get("item_id")?,
            timestamp: row.try_get("timestamp")?,
        })
    }
}

impl From<ActivityLogRow> for ActivityLog {
    fn from(row: ActivityLogRow) -> Self {
        ActivityLog::new(
            ManagerId::new(row.manager_id),
            row.action,
            row.item_name,
            ItemId::new(row.item_id),
            row.timestamp,
        )
        .with_id(ActivityLogId::new(row.id))
    }
}
