use criterion::{criterion_group, criterion_main, Criterion};
use memdb_storage::{row, ColumnSpec, Order, Predicate, Table, Value};
use std::hint::black_box;

fn bench_table(rows: i64) -> Table {
    let mut table = Table::new("id").expect("bench table");
    table
        .create_column("bucket", ColumnSpec::new().with_default(0))
        .expect("create column");
    for i in 0..rows {
        let mut r = row! { "id" => i, "name" => format!("row-{i}") };
        if i % 3 != 0 {
            r.insert("bucket".to_string(), Value::Int(i % 17));
        }
        table.insert(r).expect("insert row");
    }
    table
}

fn bench_find(c: &mut Criterion) {
    let mut table = bench_table(10_000);

    c.bench_function("find/indexed_eq", |b| {
        let predicate = Predicate::eq("bucket", 5);
        b.iter(|| {
            let rows = table.find(black_box(&predicate)).expect("find");
            black_box(rows.count());
        });
    });

    c.bench_function("find/default_value", |b| {
        let predicate = Predicate::eq("bucket", 0);
        b.iter(|| {
            let rows = table.find(black_box(&predicate)).expect("find");
            black_box(rows.count());
        });
    });

    c.bench_function("find/intersection", |b| {
        let predicate = Predicate::is_in("bucket", [1, 2, 3]).and_eq("name", "row-4");
        b.iter(|| {
            let rows = table.find(black_box(&predicate)).expect("find");
            black_box(rows.count());
        });
    });

    c.bench_function("all/full_scan", |b| {
        b.iter(|| black_box(table.all(Order::Ascending).count()));
    });
}

criterion_group!(benches, bench_find);
criterion_main!(benches);
