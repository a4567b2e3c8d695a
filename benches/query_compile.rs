use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mysql_middleware::prelude::*;
use mysql_middleware::test_utils::Script;
use std::hint::black_box;
use tokio::runtime::Runtime;

fn build_select(prefix: &str, ids: &[i64]) -> Result<QueryAndParams, SqlMiddlewareDbError> {
    let mut qb = QueryBuilder::new(prefix);
    qb.table("users u")
        .fields(&["u.id", "u.name", "o.total"])
        .and_where("u.active", "=", true)
        .where_in("u.id", ids.to_vec())
        .limit_offset(0, 50);
    qb.join("orders o", "o.uid = u.id", "left")?
        .order_by("u.name", "asc")?;
    qb.compile_select()
}

fn compile_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_select");
    for size in [1usize, 16, 256] {
        let ids: Vec<i64> = (0..i64::try_from(size).unwrap_or(i64::MAX)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &ids, |b, ids| {
            b.iter(|| build_select(black_box("p_"), black_box(ids)));
        });
    }
    group.finish();

    c.bench_function("reify", |b| {
        let params = vec![
            RowValues::Int(7),
            RowValues::Text("o'neil".into()),
            RowValues::Bool(true),
        ];
        b.iter(|| {
            reify(
                black_box("SELECT * FROM t WHERE id = ? AND name = ? AND '?' <> flag AND ok = ?"),
                black_box(&params),
            )
        });
    });
}

fn scripted_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let script = Script::new();
    script.respond(
        "SELECT",
        ResultSet::from_rows(vec!["id"], vec![vec![RowValues::Int(1)]]),
    );
    let mut conn = script.connection(PoolConfig {
        table_prefix: "p_".into(),
        ..PoolConfig::default()
    });

    c.bench_function("query_select_scripted", |b| {
        b.iter(|| {
            rt.block_on(async {
                let rows = conn
                    .query()
                    .table("users")
                    .and_where("id", "=", 1)
                    .select()
                    .await
                    .expect("scripted select");
                script.clear_log();
                black_box(rows)
            })
        });
    });
}

criterion_group!(benches, compile_benchmark, scripted_round_trip);
criterion_main!(benches);
