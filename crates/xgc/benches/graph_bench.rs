//! XGC Benchmarks
//!
//! Edge-graph builders and manager cycles on chain-shaped heaps.
//! Run with: `cargo bench --package xgc`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use xgc::bridge::Runtime;
use xgc::graph::BuildOptions;
use xgc::marker::BloomFilter64;
use xgc::object::Value;
use xgc::remote::CollectionManager;
use xgc::tables::ImportIndex;
use xgc::GraphMode;

/// `count` export slots, each heading a chain of `len` wrappers that ends
/// in its own import proxy; every tenth chain is rooted halfway down
fn chains(count: usize, len: usize) -> Runtime {
    let mut runtime = Runtime::new("bench");
    for i in 0..count {
        let mut obj = runtime.import(ImportIndex(i as u32)).unwrap();
        let mut middle = obj;
        for k in 0..len {
            obj = runtime.heap_mut().alloc_plain(vec![Value::Ref(obj)]);
            if k == len / 2 {
                middle = obj;
            }
        }
        if i % 10 == 0 {
            runtime.heap_mut().add_root(middle);
        }
        runtime.export(obj).unwrap();
    }
    runtime
}

fn bench_builders(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_graph");
    let options = BuildOptions::default();

    for &count in &[100usize, 1_000, 5_000] {
        let runtime = chains(count, 20);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("exact", count), &runtime, |b, rt| {
            b.iter(|| black_box(rt.build_edge_graph(GraphMode::Exact, &options).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("approximate", count), &runtime, |b, rt| {
            b.iter(|| black_box(rt.build_edge_graph(GraphMode::Approximate, &options).unwrap()))
        });
    }

    group.finish();
}

fn bench_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_graph_json");
    let graph = chains(5_000, 4)
        .build_edge_graph(GraphMode::Exact, &BuildOptions::default())
        .unwrap();
    let json = graph.to_json().unwrap();

    group.bench_function("serialize", |b| b.iter(|| black_box(graph.to_json().unwrap())));
    group.bench_function("parse", |b| {
        b.iter(|| black_box(xgc::EdgeGraph::from_json(&json).unwrap()))
    });

    group.finish();
}

fn bench_manager(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager");

    for &count in &[1_000usize, 10_000] {
        let mut remote = Runtime::new("remote");
        for i in 0..count {
            let obj = remote.heap_mut().alloc_plain(vec![]);
            remote.export(obj).unwrap();
            let proxy = remote.import(ImportIndex(i as u32)).unwrap();
            remote.heap_mut().add_root(proxy);
        }
        // every slot kept alive by the proxy of its neighbour
        let mut json = String::from(r#"{"root":[0]"#);
        for i in 1..count {
            json.push_str(&format!(r#","{}":[{}]"#, i, i - 1));
        }
        json.push('}');

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("collect", count), &json, |b, json| {
            let mut manager = CollectionManager::new();
            b.iter(|| black_box(manager.collect(&mut remote, json).unwrap()))
        });
    }

    group.finish();
}

fn bench_bloom(c: &mut Criterion) {
    c.bench_function("bloom_singleton", |b| {
        let mut x = 0u64;
        b.iter(|| {
            x = x.wrapping_add(1);
            black_box(BloomFilter64::singleton(x, 0x5eed))
        })
    });
}

criterion_group!(benches, bench_builders, bench_json, bench_manager, bench_bloom);
criterion_main!(benches);
