use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pipewright_sdk::builtin::{HeaderSpecification, LogSpecification, RetrySpecification};
use pipewright_sdk::{EndpointConfiguration, MessageType, PipeTargets, StaticTopology};

fn endpoint(spec_count: usize) -> EndpointConfiguration {
    let topology = StaticTopology::new().entity(MessageType::named("orders"), "queue:orders");
    let mut endpoint = EndpointConfiguration::new(Arc::new(topology));

    for i in 0..spec_count {
        let name = format!("x-header-{}", i);
        endpoint
            .add_pipe_specification(HeaderSpecification::new(name, "1"))
            .unwrap();
        endpoint
            .add_pre_pipe_specification(LogSpecification::new("bench"))
            .unwrap();
        endpoint
            .add_pipe_specification(RetrySpecification::immediate(3))
            .unwrap();
    }
    endpoint
}

/// Benchmark the aggregated validation pass with varying specification counts
fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_endpoint");

    for spec_count in [1, 10, 50, 100].iter() {
        let endpoint = endpoint(*spec_count);

        group.bench_with_input(
            BenchmarkId::from_parameter(spec_count),
            spec_count,
            |b, _| {
                b.iter(|| {
                    black_box(endpoint.validation_report());
                });
            },
        );
    }
    group.finish();
}

/// Benchmark forking a configured endpoint and building the child
fn bench_fork_and_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("fork_and_build");

    for spec_count in [1, 10, 50].iter() {
        let parent = endpoint(*spec_count);

        group.bench_with_input(
            BenchmarkId::from_parameter(spec_count),
            spec_count,
            |b, _| {
                b.iter(|| {
                    let mut child = parent.fork();
                    black_box(child.build(PipeTargets::default()).unwrap());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_validate, bench_fork_and_build);
criterion_main!(benches);
