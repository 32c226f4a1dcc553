use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use honey_core::{
    DosingMachine, DosingParams, Gains, PidController, PidLimits, ViscosityProfile, WeightSampler,
};

// Weight ratio approaching the setpoint with a little ripple
fn ratio_trace(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            t + 0.01 * (i as f32 * 0.7).sin()
        })
        .collect()
}

fn bench_pid(c: &mut Criterion) {
    let trace = ratio_trace(1_000);
    for profile in [ViscosityProfile::Low, ViscosityProfile::High] {
        let gains = profile.factory_gains().unwrap_or_default();
        c.bench_function(&format!("pid_step_{}", profile.name()), |b| {
            b.iter_batched(
                || {
                    let mut pid = PidController::new(gains, 0.02, PidLimits::default());
                    pid.start();
                    pid
                },
                |mut pid| {
                    for &r in &trace {
                        black_box(pid.compute(black_box(r)));
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }
}

fn bench_fill_tick(c: &mut Criterion) {
    let params = DosingParams {
        glass_debounce_ticks: 1,
        ..DosingParams::default()
    };
    c.bench_function("sampler_and_dosing_tick", |b| {
        b.iter_batched(
            || {
                let mut m = DosingMachine::new(PidController::new(
                    Gains::new(1.0, 6.0, 0.05),
                    0.02,
                    PidLimits::default(),
                ));
                m.start();
                (m, WeightSampler::<5>::new())
            },
            |(mut m, mut s)| {
                for g in 50..300 {
                    let stable = s.sample(g);
                    black_box(m.tick(stable, 500.0, &params));
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_pid, bench_fill_tick);
criterion_main!(benches);
