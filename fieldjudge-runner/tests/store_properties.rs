//! Property tests for the JSONL attempt store.
//!
//! Over random save/clear sequences, spread across two events:
//! 1. Replaying the file gives the same rows as an in-memory upsert map
//! 2. Compaction changes nothing a reader can observe

use fieldjudge_core::domain::{AthleteId, AttemptOutcome, EventId, Height};
use fieldjudge_core::persistence::{
    AttemptKey, AttemptRow, AttemptSlot, AttemptStore, InMemoryAttemptStore, RecordedOutcome,
};
use fieldjudge_runner::JsonlAttemptStore;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Save(AttemptRow),
    Clear(AttemptKey),
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_key() -> impl Strategy<Value = AttemptKey> {
    (
        prop::sample::select(vec!["hj", "pv"]),
        prop::sample::select(vec!["a", "b", "c"]),
        prop::sample::select(vec![120u32, 125, 130]),
        1..=3u8,
    )
        .prop_map(|(event, athlete, height, n)| AttemptKey {
            event_id: EventId::from(event),
            athlete_id: AthleteId::from(athlete),
            slot: AttemptSlot::Height(Height(height)),
            attempt_number: n,
        })
}

fn arb_outcome() -> impl Strategy<Value = AttemptOutcome> {
    prop_oneof![
        Just(AttemptOutcome::Clear),
        Just(AttemptOutcome::Fail),
        Just(AttemptOutcome::Pass),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (arb_key(), arb_outcome()).prop_map(|(key, outcome)| Op::Save(AttemptRow {
            key,
            outcome: RecordedOutcome::Vertical(outcome),
        })),
        1 => arb_key().prop_map(Op::Clear),
    ]
}

fn apply(store: &mut dyn AttemptStore, op: &Op) {
    match op {
        Op::Save(row) => store.save_attempt(row).unwrap(),
        Op::Clear(key) => store.clear_attempt(key).unwrap(),
    }
}

// ── 1-2. Replay and compaction ───────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn replay_matches_upsert_map(ops in prop::collection::vec(arb_op(), 0..40)) {
        let dir = tempfile::tempdir().unwrap();
        let mut jsonl = JsonlAttemptStore::new(dir.path().join("attempts.jsonl"));
        let mut memory = InMemoryAttemptStore::new();
        for op in &ops {
            apply(&mut jsonl, op);
            apply(&mut memory, op);
        }

        for event in ["hj", "pv"] {
            let event = EventId::from(event);
            prop_assert_eq!(
                jsonl.load_attempts(&event).unwrap(),
                memory.load_attempts(&event).unwrap()
            );
        }

        let before = jsonl.load_attempts(&EventId::from("hj")).unwrap();
        jsonl.compact().unwrap();
        prop_assert_eq!(jsonl.load_attempts(&EventId::from("hj")).unwrap(), before);
    }
}
