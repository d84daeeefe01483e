use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use neun_core::{
    models::hodgkin_huxley as hh, run_fixed_step, IntegratorKind, ModelRegistry, Network,
    Precision,
};

fn build_chain(neurons: usize, integrator: IntegratorKind) -> Network {
    let registry = ModelRegistry::builtin();
    let mut network = Network::new();
    let ids: Vec<_> = (0..neurons)
        .map(|_| {
            network.add_neuron(
                registry
                    .create_neuron("HH", Precision::Double, integrator)
                    .expect("builtin model"),
            )
        })
        .collect();
    for pair in ids.windows(2) {
        network
            .add_electrical_synapse(pair[0], hh::V, pair[1], hh::V, -0.002, -0.002)
            .expect("bench synapse");
    }
    for id in ids.iter().step_by(2) {
        network.set(*id, hh::V, -75.0).expect("bench init");
    }
    network
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("network_tick");
    // 200 ticks of 0.01 ms keeps CI runs short
    let dt = 0.01;
    let ticks = 200;

    for &n in &[8usize, 32, 128] {
        group.throughput(Throughput::Elements((n * ticks) as u64));
        for integrator in IntegratorKind::ALL {
            group.bench_with_input(
                BenchmarkId::new(format!("hh_chain_{}", integrator.short_name()), n),
                &n,
                |b, &n| {
                    b.iter_batched(
                        || build_chain(n, integrator),
                        |mut net| run_fixed_step(&mut net, dt, ticks).unwrap(),
                        BatchSize::SmallInput,
                    );
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
