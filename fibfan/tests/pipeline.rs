//! Round-trip properties of the fan-out/fan-in phases.

use std::collections::BTreeSet;
use std::fs;
use std::num::NonZeroUsize;

use proptest::prelude::*;
use tempfile::TempDir;

use fibfan::{fibonacci, run_fanin, run_fanout, write_table, ArtifactStore, DirStore, Error, WorkKey};

fn workers(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Whatever the keys and pool sizes, fan-in returns exactly the fanned-out keys, in ascending order.
    #[test]
    fn round_trip(
        keys in proptest::collection::vec(1u64..50, 0..40),
        fan_out_workers in 1usize..9,
        fan_in_workers in 1usize..65,
    ) {
        let dir = TempDir::new().unwrap();
        let store = DirStore::open(dir.path()).unwrap();

        run_fanout(&store, &keys, workers(fan_out_workers)).unwrap();
        let rows = run_fanin(&store, keys.iter().copied(), workers(fan_in_workers)).unwrap();

        let expected: BTreeSet<WorkKey> = keys.iter().copied().collect();
        prop_assert!(rows.iter().map(|row| row.key).eq(expected.iter().copied()));

        for row in &rows {
            prop_assert_eq!(&row.value, &fibonacci(row.key).unwrap());
        }
    }
}

#[test]
fn worker_count_invariance() {
    let keys: Vec<WorkKey> = (1..=200).step_by(7).collect();

    let tables: Vec<String> = [1, 8, 64]
        .into_iter()
        .map(|n| {
            let dir = TempDir::new().unwrap();
            let store = DirStore::open(dir.path()).unwrap();
            let output = dir.path().join("result.csv");

            run_fanout(&store, &keys, workers(n)).unwrap();
            let rows = run_fanin(&store, store.list_keys().unwrap(), workers(n)).unwrap();
            write_table(&rows, &output).unwrap();

            fs::read_to_string(output).unwrap()
        })
        .collect();

    assert_eq!(tables[0].lines().count(), keys.len());
    assert_eq!(tables[0], tables[1]);
    assert_eq!(tables[0], tables[2]);
}

#[test]
fn missing_artifact_aborts_fan_in() {
    let dir = TempDir::new().unwrap();
    let store = DirStore::open(dir.path()).unwrap();
    let keys: Vec<WorkKey> = (1..=30).collect();

    run_fanout(&store, &keys, workers(4)).unwrap();
    fs::remove_file(store.artifact_path(17)).unwrap();

    let err = run_fanin(&store, keys, workers(8)).unwrap_err();

    assert!(matches!(err, Error::NotFound { key: 17 }), "{err:?}");
    assert_eq!(err.key(), Some(17));
}

#[test]
fn empty_batch() {
    let dir = TempDir::new().unwrap();
    let store = DirStore::open(dir.path()).unwrap();
    let output = dir.path().join("result.csv");

    run_fanout(&store, &[], workers(2)).unwrap();
    let rows = run_fanin(&store, store.list_keys().unwrap(), workers(2)).unwrap();
    write_table(&rows, &output).unwrap();

    assert!(rows.is_empty());
    assert_eq!(fs::read_to_string(output).unwrap(), "");
}
