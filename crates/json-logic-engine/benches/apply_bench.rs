//! 规则求值性能基准测试
//!
//! 针对 apply 的各类操作进行细粒度的性能测试：
//! - 标量与算术操作
//! - 路径取值
//! - 嵌套逻辑规则（含短路）
//! - 不同数据量下的数组组合子

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use json_logic::Evaluator;
use serde_json::{Value, json};
use std::hint::black_box;

fn create_context() -> Value {
    json!({
        "event": {"type": "PURCHASE"},
        "order": {"amount": 1500},
        "user": {"is_vip": true, "tags": ["vip", "frequent"]}
    })
}

/// 创建嵌套规则（AND 包含多个 OR 组）
fn create_nested_rule(breadth: usize) -> Value {
    let or_groups: Vec<Value> = (0..breadth)
        .map(|i| {
            json!({"or": [
                {">=": [{"var": "order.amount"}, 2000 + i]},
                {"==": [{"var": "user.is_vip"}, true]}
            ]})
        })
        .collect();
    json!({"and": or_groups})
}

fn bench_scalar_operations(c: &mut Criterion) {
    let evaluator = Evaluator::new();
    let data = json!(null);
    let mut group = c.benchmark_group("scalar_operations");

    let eq_rule = json!({"==": [1000, 500]});
    group.bench_function("eq", |b| {
        b.iter(|| evaluator.apply(black_box(&eq_rule), black_box(&data)))
    });

    let add_rule = json!({"+": [1, 2, 3, 4, 5]});
    group.bench_function("add_chain", |b| {
        b.iter(|| evaluator.apply(black_box(&add_rule), black_box(&data)))
    });

    let cmp_rule = json!({"<": [1, 2, 3]});
    group.bench_function("chained_lt", |b| {
        b.iter(|| evaluator.apply(black_box(&cmp_rule), black_box(&data)))
    });

    group.finish();
}

fn bench_var_lookup(c: &mut Criterion) {
    let evaluator = Evaluator::new();
    let data = create_context();
    let mut group = c.benchmark_group("var_lookup");

    let shallow = json!({"var": "event"});
    group.bench_function("shallow", |b| {
        b.iter(|| evaluator.apply(black_box(&shallow), black_box(&data)))
    });

    let nested = json!({"var": "order.amount"});
    group.bench_function("nested", |b| {
        b.iter(|| evaluator.apply(black_box(&nested), black_box(&data)))
    });

    let with_default = json!({"var": ["missing.path", "fallback"]});
    group.bench_function("missing_with_default", |b| {
        b.iter(|| evaluator.apply(black_box(&with_default), black_box(&data)))
    });

    group.finish();
}

fn bench_nested_rules(c: &mut Criterion) {
    let evaluator = Evaluator::new();
    let data = create_context();
    let mut group = c.benchmark_group("nested_rules");

    for breadth in [2, 8, 32] {
        let rule = create_nested_rule(breadth);
        group.bench_with_input(BenchmarkId::from_parameter(breadth), &rule, |b, rule| {
            b.iter(|| evaluator.apply(black_box(rule), black_box(&data)))
        });
    }

    group.finish();
}

fn bench_array_combinators(c: &mut Criterion) {
    let evaluator = Evaluator::new();
    let mut group = c.benchmark_group("array_combinators");

    for size in [10, 100, 1000] {
        let items: Vec<i64> = (0..size).collect();
        let data = json!({"items": items});

        let map_rule = json!({"map": [{"var": "items"}, {"*": [{"var": ""}, 2]}]});
        group.bench_with_input(BenchmarkId::new("map", size), &data, |b, data| {
            b.iter(|| evaluator.apply(black_box(&map_rule), black_box(data)))
        });

        let reduce_rule = json!({"reduce": [
            {"var": "items"},
            {"+": [{"var": "current"}, {"var": "accumulator"}]},
            0
        ]});
        group.bench_with_input(BenchmarkId::new("reduce", size), &data, |b, data| {
            b.iter(|| evaluator.apply(black_box(&reduce_rule), black_box(data)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_scalar_operations,
    bench_var_lookup,
    bench_nested_rules,
    bench_array_combinators
);
criterion_main!(benches);
