//! Property tests over arbitrary event sequences.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use configurator_relay::{
    Aggregator, EventSink, EventStore, ItemResult, Outcome, RunSummary, StatsStore, TaskRef,
    TaskResult, TaskStatus,
};

#[derive(Debug, Clone)]
enum Step {
    Start(u8),
    Result(u8, Outcome),
    Item(u8, Outcome),
    Drain,
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Ok),
        Just(Outcome::Failed),
        Just(Outcome::Skipped)
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u8..6).prop_map(Step::Start),
        (0u8..6, outcome()).prop_map(|(t, o)| Step::Result(t, o)),
        (0u8..6, outcome()).prop_map(|(t, o)| Step::Item(t, o)),
        Just(Step::Drain),
    ]
}

fn task(id: u8) -> TaskRef {
    TaskRef::new(format!("task {id}"), format!("u{id}"))
}

struct Run {
    events: Arc<EventStore>,
    stats: Arc<StatsStore>,
    drained: Vec<String>,
    failures: usize,
}

fn play(steps: &[Step]) -> Run {
    let events = Arc::new(EventStore::new());
    let stats = Arc::new(StatsStore::new());
    let mut aggregator = Aggregator::new(events.clone(), stats.clone());
    let mut drained = Vec::new();
    let mut failures = 0;

    for step in steps {
        match step {
            Step::Start(id) => aggregator.on_task_start(&task(*id)),
            Step::Result(id, outcome) => {
                failures += usize::from(*outcome == Outcome::Failed);
                aggregator.on_result(&TaskResult {
                    task: task(*id),
                    outcome: *outcome,
                    changed: false,
                    node: "n1".to_string(),
                });
            }
            Step::Item(id, outcome) => {
                failures += usize::from(*outcome == Outcome::Failed);
                aggregator.on_item_result(&ItemResult {
                    task: task(*id),
                    item: format!("item {id}"),
                    outcome: *outcome,
                    changed: false,
                    node: "n1".to_string(),
                });
            }
            Step::Drain => drained.extend(events.drain_delta().into_iter().map(|r| r.uuid)),
        }
    }
    aggregator.on_run_end(&RunSummary::default());
    drained.extend(events.drain_delta().into_iter().map(|r| r.uuid));

    Run {
        events,
        stats,
        drained,
        failures,
    }
}

proptest! {
    /// Property: every finalized record is delivered by exactly one drain
    #[test]
    fn prop_drains_partition_all_records(steps in prop::collection::vec(step(), 0..60)) {
        let run = play(&steps);
        let all: Vec<String> = run.events.snapshot_all().into_iter().map(|r| r.uuid).collect();
        prop_assert_eq!(run.drained, all);
        prop_assert!(run.events.drain_delta().is_empty());
    }

    /// Property: the run fails exactly when some result or item failed
    #[test]
    fn prop_run_status_tracks_failures(steps in prop::collection::vec(step(), 0..60)) {
        let run = play(&steps);
        let snapshot = run.stats.get().expect("run_end publishes stats");
        let expected = if run.failures == 0 { TaskStatus::Ok } else { TaskStatus::Failed };
        prop_assert_eq!(snapshot.status, expected);
    }

    /// Property: a record holding a failed item is itself failed
    #[test]
    fn prop_failed_item_fails_its_record(steps in prop::collection::vec(step(), 0..60)) {
        let run = play(&steps);
        for record in run.events.snapshot_all() {
            let any_failed = record
                .items
                .iter()
                .flatten()
                .any(|item| item.status == TaskStatus::Failed);
            if any_failed {
                prop_assert_eq!(record.status, TaskStatus::Failed);
            }
        }
    }

    /// Property: a stream of distinct tasks yields one record per task, in order
    ///
    /// Each task is started and may report a result, which finalizes the
    /// record before the next start does.
    #[test]
    fn prop_distinct_tasks_keep_start_order(
        ids in prop::collection::hash_set(0u8..200, 0..40),
        results in prop::collection::vec(prop::option::of(outcome()), 40),
    ) {
        let ids: Vec<u8> = ids.into_iter().collect();
        let steps: Vec<Step> = ids
            .iter()
            .zip(&results)
            .flat_map(|(id, result)| {
                std::iter::once(Step::Start(*id))
                    .chain(result.map(|outcome| Step::Result(*id, outcome)))
            })
            .collect();
        let run = play(&steps);

        let records = run.events.snapshot_all();
        let uuids: Vec<String> = records.iter().map(|r| r.uuid.clone()).collect();
        let expected: Vec<String> = ids.iter().map(|id| format!("u{id}")).collect();
        prop_assert_eq!(&uuids, &expected);
        let unique: HashSet<_> = uuids.iter().collect();
        prop_assert_eq!(unique.len(), uuids.len());

        for (record, result) in records.iter().zip(&results) {
            let expected = result.map_or(TaskStatus::Ok, Outcome::status);
            prop_assert_eq!(record.status, expected);
            prop_assert_eq!(&record.node, if result.is_some() { "n1" } else { "" });
        }
    }
}
