use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Entity, ManagerId, Validate, Violations};

/// A store manager: the owner (tenant) of inventory items and activity logs.
///
/// Equality and hashing are by value over `id`, `name`, `email` and `password_hash`.
/// `created_at` is bookkeeping and does not participate.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreManager {
    id: Option<ManagerId>,
    name: String,
    email: String,
    #[serde(skip_serializing, default)]
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl StoreManager {
    /// Construct an unsaved manager. `created_at` is set to now.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: ManagerId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for StoreManager {
    type Id = ManagerId;

    fn id(&self) -> Option<ManagerId> {
        self.id
    }
}

impl Validate for StoreManager {
    fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.require_not_blank("name", &self.name)
            .require_email("email", &self.email)
            .require_not_blank("passwordHash", &self.password_hash);
        v
    }
}

impl PartialEq for StoreManager {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.email == other.email
            && self.password_hash == other.password_hash
    }
}

impl Eq for StoreManager {}

impl core::hash::Hash for StoreManager {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.name.hash(state);
        self.email.hash(state);
        self.password_hash.hash(state);
    }
}

impl core::fmt::Debug for StoreManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoreManager")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl core::fmt::Display for StoreManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.id {
            Some(id) => write!(f, "StoreManager(id={id}, name={}, email={})", self.name, self.email),
            None => write!(f, "StoreManager(unsaved, name={}, email={})", self.name, self.email),
        }
    }
}
