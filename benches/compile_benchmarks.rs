//! Criterion benchmarks for query compilation and DDL rendering

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use worksonmydb::core::schema::{bool, int, json, table, text, varchar, ColumnDefinition, Schema};
use worksonmydb::prelude::*;

fn dialects() -> [&'static dyn Dialect; 3] {
    [&MYSQL, &POSTGRES, &SQLITE]
}

// ============================================================================
// Query Compilation Benchmarks
// ============================================================================

fn bench_compile_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_select");
    group.throughput(Throughput::Elements(1));

    let node = QueryNode::select("users")
        .columns(&["id", "email", "created_at"])
        .filter(Condition::eq("active", true))
        .filter(Condition::in_list("role", vec!["admin", "owner", "member"]))
        .order_by_desc("created_at")
        .limit(50)
        .build();

    for dialect in dialects() {
        group.bench_with_input(BenchmarkId::from_parameter(dialect.name()), &node, |b, node| {
            b.iter(|| black_box(dialect.compile(black_box(node))))
        });
    }

    group.finish();
}

fn bench_compile_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_insert");

    // Benchmark inserts with different column counts
    for size in [4, 16, 64].iter() {
        let mut builder = QueryNode::insert("wide");
        for i in 0..*size {
            builder = builder.value(&format!("col_{}", i), i64::from(i));
        }
        let node = builder.build();

        group.throughput(Throughput::Elements(*size as u64));

        for dialect in dialects() {
            group.bench_with_input(
                BenchmarkId::new(dialect.name(), size),
                &node,
                |b, node| b.iter(|| black_box(dialect.compile(black_box(node)))),
            );
        }
    }

    group.finish();
}

fn bench_compile_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_update");
    group.throughput(Throughput::Elements(1));

    let node = QueryNode::update("posts")
        .set("title", "Renamed")
        .set("published", true)
        .where_eq("id", 42)
        .returning(&["id"])
        .build();

    // MySQL rejects RETURNING, so only the dialects that accept it
    for dialect in [&POSTGRES as &dyn Dialect, &SQLITE] {
        group.bench_with_input(BenchmarkId::from_parameter(dialect.name()), &node, |b, node| {
            b.iter(|| black_box(dialect.compile(black_box(node))))
        });
    }

    group.finish();
}

// ============================================================================
// Identifier Escaping Benchmarks
// ============================================================================

fn bench_escape_identifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("escape_identifier");
    group.throughput(Throughput::Elements(1));

    group.bench_function("plain", |b| {
        b.iter(|| black_box(POSTGRES.escape_identifier(black_box("created_at"))))
    });

    group.bench_function("embedded_quotes", |b| {
        b.iter(|| black_box(POSTGRES.escape_identifier(black_box("we\"ird\"name"))))
    });

    group.finish();
}

// ============================================================================
// DDL Rendering Benchmarks
// ============================================================================

fn bench_schema_ddl(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema_ddl");

    let schema = Schema::new(vec![
        table(
            "users",
            vec![
                ColumnDefinition::new("id", int()).primary_key().auto_increment(),
                ColumnDefinition::new("email", varchar(255)).not_null().unique(),
            ],
        ),
        table(
            "posts",
            vec![
                ColumnDefinition::new("id", int()).primary_key().auto_increment(),
                ColumnDefinition::new("body", text()).not_null(),
                ColumnDefinition::new("published", bool()).default_value(false),
                ColumnDefinition::new("metadata", json()),
            ],
        ),
    ]);

    for dialect in dialects() {
        group.bench_with_input(
            BenchmarkId::from_parameter(dialect.name()),
            &schema,
            |b, schema| b.iter(|| black_box(schema.create_statements(dialect))),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compile_select,
    bench_compile_insert,
    bench_compile_update,
    bench_escape_identifier,
    bench_schema_ddl
);

criterion_main!(benches);
