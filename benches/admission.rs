//! Cost of getting in and out when nobody else is around

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strum::IntoEnumIterator;

use fair_readers_writers::{coordinator::Coordinator, sync::GatePolicy};

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended");

    for gate in GatePolicy::iter() {
        let coordinator = Coordinator::new(0, gate);

        group.bench_function(format!("read_session/{gate}"), |b| {
            b.iter(|| {
                let session = coordinator.enter_read();
                black_box(session.read())
            });
        });

        group.bench_function(format!("write_session/{gate}"), |b| {
            b.iter(|| {
                let mut session = coordinator.enter_write();
                black_box(session.write(1))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended);
criterion_main!(benches);
