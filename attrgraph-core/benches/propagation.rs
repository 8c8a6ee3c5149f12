use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use attrgraph_core::{Graph, Node};

/// A chain of `len` rules, each adding one to the previous.
fn chain(graph: &Graph, len: usize) -> (Node<u64>, Node<u64>) {
    let input = graph.input("input", 0_u64);
    let mut last = input.clone();
    for i in 0..len {
        let prev = last.clone();
        last = graph.rule(format!("r{i}"), move || prev.read() + 1);
    }
    (input, last)
}

fn write_then_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_then_read");
    for len in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            let graph = Graph::new();
            let (input, output) = chain(&graph, len);
            output.read();
            let mut value = 0;
            b.iter(|| {
                value += 1;
                input.write(value);
                black_box(output.read())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, write_then_read);
criterion_main!(benches);
