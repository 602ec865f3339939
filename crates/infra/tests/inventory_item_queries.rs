//! Item queries over a seeded two-manager inventory.
//!
//! Manager A owns Laptop (15), Mouse (8), Keyboard (0) and T-Shirt (25).
//! Manager B owns Tablet (5), which must never leak into A's results.

use rust_decimal::Decimal;
use stockroom_core::{Entity, ItemId, ManagerId, ManagerScoped};
use stockroom_infra::repository::{
    InMemoryInventoryItemRepository, InMemoryStoreManagerRepository, InventoryItemRepository,
    RepositoryError, StoreManagerRepository,
};
use stockroom_inventory::{InventoryItem, ItemDraft, StoreManager};

struct Fixture {
    items: InMemoryInventoryItemRepository,
    manager_a: ManagerId,
    manager_b: ManagerId,
}

fn draft(name: &str, sku: &str, category: &str, price_cents: i64, quantity: i32) -> ItemDraft {
    ItemDraft {
        name: name.to_string(),
        sku: sku.to_string(),
        category: category.to_string(),
        price: Decimal::new(price_cents, 2),
        quantity,
        image_url: None,
    }
}

async fn seed() -> Fixture {
    stockroom_observability::init_for_tests();

    let managers = InMemoryStoreManagerRepository::new();
    let manager_a = managers
        .save(StoreManager::new("Test Manager", "test@example.com", "hashedpassword"))
        .await
        .unwrap()
        .id()
        .unwrap();
    let manager_b = managers
        .save(StoreManager::new("Other Manager", "other@example.com", "hashedpassword"))
        .await
        .unwrap()
        .id()
        .unwrap();

    let items = InMemoryInventoryItemRepository::new();
    for d in [
        draft("Laptop", "TECH-001", "Electronics", 99999, 15),
        draft("Mouse", "TECH-002", "Electronics", 2999, 8),
        draft("Keyboard", "TECH-003", "Electronics", 5999, 0),
        draft("T-Shirt", "CLOTH-001", "Clothing", 1999, 25),
    ] {
        items.save(InventoryItem::new(manager_a, d)).await.unwrap();
    }
    items
        .save(InventoryItem::new(manager_b, draft("Tablet", "TECH-004", "Electronics", 49999, 5)))
        .await
        .unwrap();

    Fixture { items, manager_a, manager_b }
}

fn names(items: &[InventoryItem]) -> Vec<&str> {
    items.iter().map(InventoryItem::name).collect()
}

#[tokio::test]
async fn find_by_manager_id_returns_only_owned_items() {
    let f = seed().await;

    let a = f.items.find_by_manager_id(f.manager_a).await.unwrap();
    assert_eq!(names(&a), ["Laptop", "Mouse", "Keyboard", "T-Shirt"]);
    assert!(a.iter().all(|i| i.manager_id() == f.manager_a));

    let b = f.items.find_by_manager_id(f.manager_b).await.unwrap();
    assert_eq!(names(&b), ["Tablet"]);
}

#[tokio::test]
async fn find_by_manager_id_for_unknown_manager_is_empty() {
    let f = seed().await;
    assert!(f.items.find_by_manager_id(ManagerId::new(999)).await.unwrap().is_empty());
}

#[tokio::test]
async fn low_stock_excludes_zero_and_threshold() {
    let f = seed().await;

    let low = f.items.find_low_stock_items(f.manager_a).await.unwrap();
    assert_eq!(names(&low), ["Mouse"]);

    let low_b = f.items.find_low_stock_items(f.manager_b).await.unwrap();
    assert_eq!(names(&low_b), ["Tablet"]);
}

#[tokio::test]
async fn quantity_of_exactly_ten_is_not_low_stock() {
    let f = seed().await;
    f.items
        .save(InventoryItem::new(f.manager_a, draft("Monitor", "TECH-010", "Electronics", 19999, 10)))
        .await
        .unwrap();

    let low = f.items.find_low_stock_items(f.manager_a).await.unwrap();
    assert_eq!(names(&low), ["Mouse"]);
}

#[tokio::test]
async fn out_of_stock_is_exactly_zero() {
    let f = seed().await;

    let out = f.items.find_out_of_stock_items(f.manager_a).await.unwrap();
    assert_eq!(names(&out), ["Keyboard"]);
    assert!(f.items.find_out_of_stock_items(f.manager_b).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_matches_name() {
    let f = seed().await;
    let hits = f.items.search_items("Laptop", f.manager_a).await.unwrap();
    assert_eq!(names(&hits), ["Laptop"]);
}

#[tokio::test]
async fn search_matches_category() {
    let f = seed().await;
    let hits = f.items.search_items("Electronics", f.manager_a).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(!names(&hits).contains(&"Tablet"));
}

#[tokio::test]
async fn search_matches_sku_case_insensitively() {
    let f = seed().await;
    let hits = f.items.search_items("cloth", f.manager_a).await.unwrap();
    assert_eq!(names(&hits), ["T-Shirt"]);

    let hits = f.items.search_items("CLOTH", f.manager_a).await.unwrap();
    assert_eq!(names(&hits), ["T-Shirt"]);
}

#[tokio::test]
async fn search_is_case_insensitive_on_name() {
    let f = seed().await;
    let hits = f.items.search_items("laptop", f.manager_a).await.unwrap();
    assert_eq!(names(&hits), ["Laptop"]);
}

#[tokio::test]
async fn search_without_matches_is_empty() {
    let f = seed().await;
    assert!(f.items.search_items("nonexistent", f.manager_a).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_never_crosses_managers() {
    let f = seed().await;
    assert!(f.items.search_items("Tablet", f.manager_a).await.unwrap().is_empty());
    assert_eq!(names(&f.items.search_items("tab", f.manager_b).await.unwrap()), ["Tablet"]);
}

#[tokio::test]
async fn empty_term_matches_every_owned_item() {
    let f = seed().await;
    assert_eq!(f.items.search_items("", f.manager_a).await.unwrap().len(), 4);
}

#[tokio::test]
async fn items_of_another_manager_are_invisible_to_find_and_delete() {
    let f = seed().await;
    let tablet = f.items.find_by_manager_id(f.manager_b).await.unwrap().remove(0);
    let tablet_id: ItemId = tablet.id().unwrap();

    assert_eq!(f.items.find_by_id(f.manager_a, tablet_id).await.unwrap(), None);
    assert_eq!(f.items.delete(f.manager_a, tablet_id).await, Err(RepositoryError::NotFound));
    assert!(f.items.find_by_id(f.manager_b, tablet_id).await.unwrap().is_some());
}

#[tokio::test]
async fn invalid_items_are_rejected_with_field_messages() {
    let f = seed().await;
    let err = f
        .items
        .save(InventoryItem::new(f.manager_a, draft("", "X-1", "Misc", -100, -1)))
        .await
        .unwrap_err();

    let RepositoryError::Invalid(violations) = err else {
        panic!("expected validation failure, got {err:?}");
    };
    assert_eq!(violations.get("name"), Some("must not be blank"));
    assert!(violations.contains("price"));
    assert!(violations.contains("quantity"));
}
