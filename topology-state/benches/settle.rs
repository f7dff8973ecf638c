use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;
use topology_state::model::{Edge, Edges, Node, Nodes, Point};
use topology_state::{Configs, Emitter, GraphInputs, States};

fn build_states(node_count: usize) -> States {
    let nodes: Nodes = (0..node_count)
        .map(|i| (format!("n{i}"), Node::new().with("name", format!("Node {i}"))))
        .collect();

    // A ring plus a parallel edge every third node.
    let mut edges = Edges::new();
    for i in 0..node_count {
        let (s, t) = (format!("n{i}"), format!("n{}", (i + 1) % node_count));
        edges.insert(format!("e{i}"), Edge::new(s.clone(), t.clone()));
        if i % 3 == 0 {
            edges.insert(format!("p{i}"), Edge::new(t, s));
        }
    }

    let layouts = (0..node_count)
        .map(|i| {
            let angle = i as f64 / node_count as f64 * std::f64::consts::TAU;
            (format!("n{i}"), Point::new(angle.cos() * 500.0, angle.sin() * 500.0))
        })
        .collect();

    let inputs = GraphInputs::new(nodes, edges).with_layouts(layouts);
    States::provide(inputs, Configs::default(), Emitter::new()).expect("valid inputs")
}

fn bench_settle(c: &mut Criterion) {
    let mut group = c.benchmark_group("settle");
    group.measurement_time(Duration::from_secs(5));

    for &size in &[100usize, 1_000] {
        group.bench_with_input(BenchmarkId::new("select_all", size), &size, |b, &size| {
            b.iter_batched(
                || build_states(size),
                |states| {
                    states.batch(|| {
                        for i in 0..size {
                            states.selected_nodes().update(|set| set.insert(format!("n{i}")));
                        }
                    });
                    black_box(states.node_states().len())
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("grow", size), &size, |b, &size| {
            b.iter_batched(
                || build_states(size),
                |states| {
                    states.batch(|| {
                        states.nodes().update(|nodes| {
                            for i in size..size + 100 {
                                nodes.insert(format!("n{i}"), Node::new());
                            }
                        });
                        states.edges().update(|edges| {
                            for i in size..size + 100 {
                                edges.insert(format!("x{i}"), Edge::new("n0", format!("n{i}")));
                            }
                        });
                    });
                    black_box(states.edge_states().len())
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("move_and_read", size), &size, |b, &size| {
            let states = build_states(size);
            let mut step = 0.0;
            b.iter(|| {
                step += 1.0;
                states.layouts().update(|layouts| {
                    if let Some(point) = layouts.get_mut("n0") {
                        point.x = step;
                    }
                });
                black_box(states.edge_state("e0").map(|edge| edge.position()))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_settle);
criterion_main!(benches);
