use common::{ProductId, StreamId};
use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{EventKind, EventRecord, EventStore, InMemoryEventStore, Version};

fn bench_append(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                let stream = StreamId::product(&ProductId::new("SKU-BENCH"));
                for v in 1..=100 {
                    store
                        .append(EventRecord::new(
                            stream.clone(),
                            EventKind::StockAdded,
                            1,
                            Version::new(v),
                        ))
                        .await
                        .unwrap();
                }
            });
        });
    });
}

fn bench_read_stream(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let stream = StreamId::product(&ProductId::new("SKU-BENCH"));

    rt.block_on(async {
        for v in 1..=1000 {
            store
                .append(EventRecord::new(
                    stream.clone(),
                    EventKind::StockAdded,
                    1,
                    Version::new(v),
                ))
                .await
                .unwrap();
        }
    });

    c.bench_function("event_store/read_stream_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                let events = store.read_stream(&stream).await.unwrap();
                assert_eq!(events.len(), 1000);
            });
        });
    });
}

criterion_group!(benches, bench_append, bench_read_stream);
criterion_main!(benches);
