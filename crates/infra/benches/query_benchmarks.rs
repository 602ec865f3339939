use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use stockroom_core::{ItemId, ManagerId};
use stockroom_infra::repository::{
    ActivityLogRepository, InMemoryActivityLogRepository, InMemoryInventoryItemRepository,
    InventoryItemRepository,
};
use stockroom_inventory::{ActivityLog, InventoryItem, ItemDraft};
use tokio::runtime::Runtime;

const CATEGORIES: [&str; 4] = ["Electronics", "Clothing", "Furniture", "Grocery"];

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

/// `size` items per manager, spread across two managers.
fn seeded_items(rt: &Runtime, size: usize) -> InMemoryInventoryItemRepository {
    let repo = InMemoryInventoryItemRepository::new();
    rt.block_on(async {
        for manager in [1, 2] {
            for i in 0..size {
                let draft = ItemDraft {
                    name: format!("Item {i}"),
                    sku: format!("SKU-{manager}-{i:05}"),
                    category: CATEGORIES[i % CATEGORIES.len()].to_string(),
                    price: Decimal::new(1999, 2),
                    quantity: (i % 30) as i32,
                    image_url: None,
                };
                repo.save(InventoryItem::new(ManagerId::new(manager), draft))
                    .await
                    .unwrap();
            }
        }
    });
    repo
}

fn bench_item_queries(c: &mut Criterion) {
    let rt = runtime();
    let manager = ManagerId::new(1);
    let mut group = c.benchmark_group("item_queries");

    for size in [100usize, 1_000, 10_000] {
        let repo = seeded_items(&rt, size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("search_items", size), &size, |b, _| {
            b.iter(|| black_box(rt.block_on(repo.search_items(black_box("electro"), manager)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("find_low_stock_items", size), &size, |b, _| {
            b.iter(|| black_box(rt.block_on(repo.find_low_stock_items(manager)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("find_by_manager_id", size), &size, |b, _| {
            b.iter(|| black_box(rt.block_on(repo.find_by_manager_id(manager)).unwrap()));
        });
    }

    group.finish();
}

fn bench_recent_activity(c: &mut Criterion) {
    let rt = runtime();
    let manager = ManagerId::new(1);
    let mut group = c.benchmark_group("recent_activity");

    for size in [100i64, 1_000, 10_000] {
        let repo = InMemoryActivityLogRepository::new();
        let now = Utc::now();
        rt.block_on(async {
            for i in 0..size {
                let log = ActivityLog::new(
                    ManagerId::new(1 + i % 2),
                    "Updated Item: Widget",
                    "Widget",
                    ItemId::new(i),
                    now - Duration::seconds(i),
                );
                repo.append(log).await.unwrap();
            }
        });

        group.bench_with_input(BenchmarkId::new("top10", size), &size, |b, _| {
            b.iter(|| {
                black_box(
                    rt.block_on(repo.find_top10_by_manager_id_order_by_timestamp_desc(manager))
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_item_queries, bench_recent_activity);
criterion_main!(benches);
