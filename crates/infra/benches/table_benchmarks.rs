use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal_macros::dec;
use stockbook_core::{Money, OrderNumber};
use stockbook_events::InMemoryEventBus;
use stockbook_infra::queries;
use stockbook_infra::{InventoryService, RecordRow, TableStore};
use stockbook_inventory::{InboundRegistration, InventoryRecord, Register, apply_withdrawal};

fn bench_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn registration(i: usize) -> InboundRegistration {
    InboundRegistration {
        supplier: format!("Supplier{}", i % 17),
        product: format!("Product{}", i % 101),
        buy_price: Money::new(dec!(90)),
        commission: Money::new(dec!(10)),
        quantity: 1_000_000,
        ..InboundRegistration::default()
    }
}

fn rows(count: usize) -> Vec<RecordRow> {
    (0..count)
        .map(|i| {
            let order = OrderNumber::from(1_700_000_000_000 + i as u64);
            let mut record = InventoryRecord::empty(order.clone());
            stockbook_events::execute(
                &mut record,
                &stockbook_inventory::InventoryCommand::Register(Register {
                    order_number: order,
                    registration: registration(i),
                    occurred_at: bench_time(),
                }),
            )
            .unwrap();
            RecordRow::from_record(&record)
        })
        .collect()
}

fn bench_apply_withdrawal(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_withdrawal");
    let record = rows(1)[0].to_record().unwrap();

    group.bench_function("single_record", |b| {
        b.iter(|| apply_withdrawal(black_box(&record), 3, "SF1", "Stall 1", bench_time()).unwrap())
    });
    group.finish();
}

fn bench_withdraw_and_rewrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("withdraw_and_rewrite");
    group.sample_size(20);

    for row_count in [100usize, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*row_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(row_count), row_count, |b, &n| {
            let dir = tempfile::tempdir().unwrap();
            let store = TableStore::open(dir.path().join("bench.csv")).unwrap();
            let table = rows(n);
            store.rewrite(&table).unwrap();
            let target: OrderNumber = table[n / 2].order_number.parse().unwrap();
            let service = InventoryService::open(store, InMemoryEventBus::new()).unwrap();

            b.iter(|| {
                service
                    .withdraw(black_box(&target), 1, "SF1", "Stall 1", bench_time())
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");
    for row_count in [1_000usize, 10_000].iter() {
        let table = rows(*row_count);
        group.throughput(Throughput::Elements(*row_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(row_count), &table, |b, table| {
            b.iter(|| queries::metrics(black_box(table)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_apply_withdrawal,
    bench_withdraw_and_rewrite,
    bench_metrics
);
criterion_main!(benches);
