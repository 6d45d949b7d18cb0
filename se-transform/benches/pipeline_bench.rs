//! Benchmarks for task invocation and graph inference.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use se_transform::context::{with_context, RunContext};
use se_transform::execution::{GraphInference, Pipeline, PipelineGraph, Task};
use se_transform::lineage::NoOpLineageSink;
use se_transform::params::Params;
use se_transform::registry::{PipelineSpec, Registry, TaskSpec};
use se_transform::testing::MemoryStorage;
use std::sync::Arc;

fn context() -> RunContext {
    RunContext::new(
        Params::new(),
        Arc::new(MemoryStorage::new()),
        Arc::new(NoOpLineageSink),
    )
}

fn task_invocation_benchmark(c: &mut Criterion) {
    let registry = Registry::new();
    let task: Task<u64, u64> = Task::register(
        &registry,
        TaskSpec::new("bench", "double").with_retries(1),
        |x| Ok(x * 2),
    );

    c.bench_function("invoke_task", |b| {
        with_context(context(), || {
            b.iter(|| task.call(black_box(21)));
        });
    });
}

fn graph_inference_benchmark(c: &mut Criterion) {
    let registry = Registry::new();
    let tasks: Vec<Task<(), ()>> = (0..10)
        .map(|i| Task::register(&registry, TaskSpec::new("bench", format!("t{i}")), |()| Ok(())))
        .collect();
    let pipeline = Pipeline::register(
        &registry,
        PipelineSpec::new("bench", "bench", "run", move |_| {
            for task in &tasks {
                task.call(())?;
            }
            Ok(serde_json::Value::Null)
        }),
    );
    let spec = pipeline.spec().unwrap();
    let inference = GraphInference::new(registry).with_storage(Arc::new(MemoryStorage::new()));

    c.bench_function("infer_graph_10_tasks", |b| {
        b.iter(|| black_box(inference.infer(&spec)));
    });

    let calls: Vec<String> = (0..1000).map(|i| format!("bench.t{}", i % 25)).collect();
    c.bench_function("graph_from_1000_calls", |b| {
        b.iter(|| PipelineGraph::from_calls(black_box(&calls), str::to_string));
    });
}

criterion_group!(benches, task_invocation_benchmark, graph_inference_benchmark);
criterion_main!(benches);
