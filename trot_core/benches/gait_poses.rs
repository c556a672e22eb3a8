use std::time::{Duration, Instant};

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use trot_core::conversions::calibration_from_config;
use trot_core::{GaitSequencer, GaitState, GaitTiming, LegSet, PoseMapper, PoseParams};
use trot_hardware::SimulatedBus;
use trot_traits::Clock;

/// Clock that never waits, so the bench measures pose work only.
struct NoWait(Instant);

impl Clock for NoWait {
    fn now(&self) -> Instant {
        self.0
    }
    fn sleep(&self, _d: Duration) {}
}

pub fn bench_poses(c: &mut Criterion) {
    let mut g = c.benchmark_group("gait");
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(10));
        }
    }

    let seq = GaitSequencer::new(LegSet::default(), PoseParams::default(), GaitTiming::default());
    g.bench_function("poses_full_cycle", |b| {
        b.iter(|| {
            let mut s = GaitState::Neutral;
            for _ in 0..8 {
                s = s.next();
                black_box(seq.poses(black_box(s)));
            }
        })
    });

    let table = calibration_from_config(&trot_config::Config::default()).unwrap();
    let mut mapper = PoseMapper::new(table);
    let mut bus = SimulatedBus::reference();
    let mut seq = seq.clone();
    let clock = NoWait(Instant::now());
    g.bench_function("advance_on_sim_bus", |b| {
        b.iter(|| {
            seq.advance(&mut bus, &mut mapper, &clock).unwrap();
            bus.clear_calls();
        })
    });
    g.finish();
}

criterion_group!(benches, bench_poses);
criterion_main!(benches);
