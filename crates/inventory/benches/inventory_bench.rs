use common::{ProductId, StreamId};
use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{EventKind, EventRecord, EventStore, InMemoryEventStore, Version};
use inventory::{InventoryHandler, StockLevel};

fn bench_fold(c: &mut Criterion) {
    let stream = StreamId::product(&ProductId::new("SKU-BENCH"));
    let events: Vec<_> = (1..=1000)
        .map(|v| {
            let kind = if v % 3 == 0 {
                EventKind::StockReserved
            } else {
                EventKind::StockAdded
            };
            EventRecord::new(stream.clone(), kind, 2, Version::new(v))
        })
        .collect();

    c.bench_function("inventory/fold_1000", |b| {
        b.iter(|| {
            let level = StockLevel::rebuild(ProductId::new("SKU-BENCH"), &events);
            assert_eq!(level.last_version(), Version::new(1000));
        });
    });
}

fn bench_reserve(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let handler = InventoryHandler::new(store.clone());
    let product = ProductId::new("SKU-BENCH");

    rt.block_on(async {
        handler.add_stock(&product, i64::MAX / 2, None).await.unwrap();
    });

    c.bench_function("inventory/reserve", |b| {
        b.iter(|| {
            rt.block_on(async {
                handler.reserve(&product, 1, None).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_fold, bench_reserve);
criterion_main!(benches);
