//! Infrastructure layer: repositories, config, inventory service.

/// Configuration loading and representation.
pub mod config;

/// Persistence adapters (in-memory and Postgres) behind the repository traits.
pub mod repository;

/// Item mutations with activity logging, dashboard reads.
pub mod service;

pub use config::{ConfigError, DatabaseConfig};
pub use repository::{
    ActivityLogRepository, InventoryItemRepository, RepositoryError, RepositoryResult, StoreManagerRepository,
};
pub use service::{DashboardStats, InventoryService};
