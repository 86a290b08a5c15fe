mod common;

use std::fs;

use common::{TestWorkspace, columns};
use csv_ingest::checkpoint::{CheckpointRecord, CheckpointStore};
use csv_ingest::error::IngestError;

fn orders_checkpoint(last_index: i64) -> CheckpointRecord {
    CheckpointRecord {
        last_index,
        schema: "sales".into(),
        table: "orders".into(),
        columns: columns(&[("ref_per", "character varying"), ("ent_id", "bigint")]),
    }
}

#[test]
fn saved_checkpoint_loads_back_unchanged() {
    let workspace = TestWorkspace::new();
    let store = CheckpointStore::new(workspace.file("orders_checkpoint.txt"));
    let record = orders_checkpoint(1999);

    store.save(&record).expect("save checkpoint");

    assert_eq!(store.load().expect("load checkpoint"), Some(record));
}

#[test]
fn checkpoint_file_is_one_json_line() {
    let workspace = TestWorkspace::new();
    let store = CheckpointStore::new(workspace.file("orders_checkpoint.txt"));
    store.save(&orders_checkpoint(1999)).unwrap();

    let contents = fs::read_to_string(store.path()).unwrap();
    assert_eq!(
        contents,
        "{\"checkpoint\":1999,\"schema\":\"sales\",\"table\":\"orders\",\
         \"columns\":[[\"ref_per\",\"character varying\"],[\"ent_id\",\"bigint\"]]}\n"
    );
    assert!(!workspace.file("orders_checkpoint.txt.tmp").exists());
}

#[test]
fn later_save_replaces_earlier_one() {
    let workspace = TestWorkspace::new();
    let store = CheckpointStore::new(workspace.file("orders_checkpoint.txt"));
    store.save(&orders_checkpoint(9)).unwrap();
    store.save(&orders_checkpoint(19)).unwrap();

    let loaded = store.load().unwrap().expect("checkpoint present");
    assert_eq!(loaded.last_index, 19);
    assert_eq!(loaded.resume_at(), 20);
}

#[test]
fn missing_checkpoint_loads_as_none() {
    let workspace = TestWorkspace::new();
    let store = CheckpointStore::new(workspace.file("absent.txt"));
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn unreadable_contents_are_reported_as_corrupt() {
    let workspace = TestWorkspace::new();
    for (name, contents) in [
        ("empty.txt", ""),
        ("garbage.txt", "checkpoint=12"),
        ("partial.txt", "{\"checkpoint\":12,\"schema\":\"sales\"}"),
        (
            "negative.txt",
            "{\"checkpoint\":-5,\"schema\":\"s\",\"table\":\"t\",\"columns\":[]}",
        ),
    ] {
        let store = CheckpointStore::new(workspace.write(name, contents));
        match store.load() {
            Err(IngestError::CheckpointCorruption { path, .. }) => {
                assert_eq!(path, workspace.file(name));
            }
            other => panic!("{name}: expected corruption, got {other:?}"),
        }
    }
}

#[test]
fn clear_removes_the_file_once() {
    let workspace = TestWorkspace::new();
    let store = CheckpointStore::new(workspace.file("orders_checkpoint.txt"));
    store.save(&orders_checkpoint(3)).unwrap();

    assert!(store.clear().unwrap());
    assert!(!store.path().exists());
    assert!(!store.clear().unwrap());
}
