//! Criterion benchmarks for fieldjudge hot paths.
//!
//! Benchmarks:
//! 1. Full simulated competition (record, schedule, auto-advance)
//! 2. Scheduler lookup on a large field
//! 3. Standings over a finished competition
//! 4. Rehydration from persisted rows

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fieldjudge_core::domain::{AthleteId, AttemptOutcome, EventId, Height};
use fieldjudge_core::engine::{next_athlete, CompetitionState, VerticalConfig};
use fieldjudge_core::persistence::{AttemptStore, InMemoryAttemptStore, WriteSet};
use fieldjudge_core::simulate::{self, synthetic_roster, SimulationConfig};
use fieldjudge_core::standings::rank;

// ── Helpers ──────────────────────────────────────────────────────────

fn sim_config(athletes: usize) -> SimulationConfig {
    SimulationConfig {
        athletes,
        ..SimulationConfig::default()
    }
}

fn finished(athletes: usize) -> CompetitionState {
    simulate::run(&sim_config(athletes)).unwrap().state
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    for athletes in [12usize, 40, 120] {
        group.bench_with_input(
            BenchmarkId::new("full_competition", athletes),
            &athletes,
            |b, &n| {
                let config = sim_config(n);
                b.iter(|| simulate::run(black_box(&config)).unwrap());
            },
        );
    }
    group.finish();
}

fn bench_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler");
    let roster = synthetic_roster(EventId::from("bench"), 120).unwrap();
    let mut state = CompetitionState::new(&roster, VerticalConfig::new(Height(150), 5)).unwrap();
    // Half the field has already failed once.
    for entry in roster.athletes.iter().step_by(2) {
        state.record(&entry.id, AttemptOutcome::Fail).unwrap();
    }
    let last = AthleteId::new("A59");
    group.bench_function("next_athlete_120", |b| {
        b.iter(|| next_athlete(black_box(&state), Some(&last)).unwrap());
    });
    group.finish();
}

fn bench_standings(c: &mut Criterion) {
    let mut group = c.benchmark_group("standings");
    for athletes in [12usize, 120] {
        let state = finished(athletes);
        group.bench_with_input(BenchmarkId::new("rank", athletes), &state, |b, s| {
            b.iter(|| rank(black_box(s)));
        });
    }
    group.finish();
}

fn bench_rehydrate(c: &mut Criterion) {
    let state = finished(40);
    let mut store = InMemoryAttemptStore::new();
    for athlete in state.athletes() {
        for (height, _) in athlete.records() {
            WriteSet::for_height(state.event_id(), athlete, height)
                .apply_to(&mut store)
                .unwrap();
        }
    }
    let rows = store.load_attempts(state.event_id()).unwrap();
    let roster = synthetic_roster(EventId::from("sim"), 40).unwrap();
    let config = state.config().clone();

    c.bench_function("rehydrate_40", |b| {
        b.iter(|| CompetitionState::rehydrate(&roster, config.clone(), black_box(&rows)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_simulation,
    bench_scheduler,
    bench_standings,
    bench_rehydrate,
);
criterion_main!(benches);
