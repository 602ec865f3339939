use chrono::{DateTime, Duration, SubsecRound, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use stockroom_core::{Entity, ItemId, ManagerId, ManagerScoped, Validate, Violations};

/// Quantities strictly below this (and above zero) count as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// Fractional digits kept for prices (`NUMERIC(12, 2)` in Postgres).
pub const PRICE_SCALE: u32 = 2;

/// Fractional-second digits kept for `updated_at` (Postgres `TIMESTAMPTZ` is microseconds).
const TIMESTAMP_DIGITS: u16 = 6;

fn normalize_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(TIMESTAMP_DIGITS)
}

/// Caller-supplied item fields, used for both creation and full updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub name: String,
    pub sku: String,
    pub category: String,
    pub price: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// An inventory item owned by exactly one store manager.
///
/// `price` and `quantity` are signed so that invalid input can be represented and
/// reported by [`Validate`]; repositories refuse to persist an item with violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    id: Option<ItemId>,
    manager_id: ManagerId,
    name: String,
    sku: String,
    category: String,
    price: Decimal,
    quantity: i32,
    image_url: Option<String>,
    updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Construct an unsaved item for `manager_id`. `updated_at` is set to now.
    ///
    /// Prices are rounded half away from zero to [`PRICE_SCALE`] digits, like the column.
    pub fn new(manager_id: ManagerId, draft: ItemDraft) -> Self {
        Self {
            id: None,
            manager_id,
            name: draft.name,
            sku: draft.sku,
            category: draft.category,
            price: normalize_price(draft.price),
            quantity: draft.quantity,
            image_url: draft.image_url,
            updated_at: current_timestamp(),
        }
    }

    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Replace every caller-editable field. Identity and ownership are kept.
    pub fn apply(&mut self, draft: ItemDraft) {
        self.name = draft.name;
        self.sku = draft.sku;
        self.category = draft.category;
        self.price = normalize_price(draft.price);
        self.quantity = draft.quantity;
        self.image_url = draft.image_url;
    }

    /// Refresh `updated_at`. Must run before every persisted mutation.
    ///
    /// The new value is truncated to microseconds and is strictly later than the old
    /// one even if the clock has not advanced.
    pub fn on_update(&mut self) {
        let now = current_timestamp();
        let previous = self.updated_at.trunc_subsecs(TIMESTAMP_DIGITS);
        self.updated_at = if now > previous {
            now
        } else {
            previous + Duration::microseconds(1)
        };
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// `0 < quantity < LOW_STOCK_THRESHOLD`. Out-of-stock items are not low stock.
    pub fn is_low_stock(&self) -> bool {
        self.quantity > 0 && self.quantity < LOW_STOCK_THRESHOLD
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    /// Case-insensitive substring match against name, category and sku.
    pub fn matches_term(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        [&self.name, &self.category, &self.sku]
            .into_iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// `price × quantity`, or `None` when the product does not fit in a `Decimal`.
    pub fn stock_value(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

impl Entity for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> Option<ItemId> {
        self.id
    }
}

impl ManagerScoped for InventoryItem {
    fn manager_id(&self) -> ManagerId {
        self.manager_id
    }
}

impl Validate for InventoryItem {
    fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.require_not_blank("name", &self.name)
            .require_not_blank("category", &self.category)
            .require_non_negative("price", self.price)
            .require_non_negative("quantity", self.quantity);
        v
    }
}
