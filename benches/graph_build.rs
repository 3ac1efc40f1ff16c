//! Performance benchmarks for profile graph construction
//!
//! Measures a full build (scan, resolve, type, link) over generated profiles:
//! - a single large document
//! - a root document fanning out to many referenced documents
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use asd_core::{codec::MemoryLoader, graph::ProfileGraph};
use serde_json::{json, Value};

/// One document with `states` semantic descriptors, each nesting a transition to the next.
fn single_document(states: usize) -> MemoryLoader {
    let descriptors: Vec<Value> = (0..states)
        .map(|i| {
            let tag = if i % 2 == 0 { "even" } else { "odd" };
            json!({
                "id": format!("state{i}"),
                "tag": tag,
                "descriptor": [
                    {"id": format!("next{i}"), "type": "safe", "rt": format!("#state{}", (i + 1) % states)}
                ]
            })
        })
        .collect();
    let doc = json!({"alps": {"descriptor": descriptors}}).to_string();
    MemoryLoader::new().with_document("index.json", doc)
}

/// A root document aliasing one descriptor from each of `files` shared documents.
fn fan_out(files: usize) -> MemoryLoader {
    let aliases: Vec<Value> = (0..files)
        .map(|i| json!({"href": format!("shared/part{i}.json#part{i}")}))
        .collect();
    let root = json!({"alps": {"descriptor": [{"id": "home", "descriptor": aliases}]}});
    let mut loader = MemoryLoader::new().with_document("index.json", root.to_string());
    for i in 0..files {
        let part = json!({"alps": {"descriptor": [
            {"id": format!("part{i}"), "descriptor": [
                {"id": format!("item{i}")},
                {"id": format!("goItem{i}"), "type": "safe", "rt": format!("#item{i}")}
            ]}
        ]}});
        loader.insert(format!("shared/part{i}.json"), part.to_string());
    }
    loader
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    for size in [10usize, 100, 1000] {
        let loader = single_document(size);
        group.bench_with_input(BenchmarkId::new("single_document", size), &loader, |b, loader| {
            b.iter(|| ProfileGraph::build(black_box("index.json"), loader).unwrap())
        });
    }
    for files in [10usize, 100] {
        let loader = fan_out(files);
        group.bench_with_input(BenchmarkId::new("fan_out", files), &loader, |b, loader| {
            b.iter(|| ProfileGraph::build(black_box("index.json"), loader).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
