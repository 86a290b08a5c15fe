mod common;

use std::fs;
use std::rc::Rc;

use common::TestWorkspace;
use csv_ingest::coerce::RawValue;
use csv_ingest::error::IngestError;
use csv_ingest::error_sink::ErrorSink;
use csv_ingest::source::{CsvRowSource, RowSource};
use csv_ingest::transform::SourceRow;
use encoding_rs::{UTF_8, WINDOWS_1252};

fn value<'a>(row: &'a SourceRow, name: &str) -> Option<&'a RawValue> {
    row.get(name).map(|field| field.value())
}

fn collect(source: CsvRowSource) -> Vec<SourceRow> {
    source
        .collect::<Result<Vec<_>, _>>()
        .expect("rows readable")
}

#[test]
fn fields_are_inferred_per_value() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "mixed.csv",
        " id ,amount,note\n7,2.50,hello\n8,,NULL\n9,1e3,\"a, b\"\n",
    );

    let source = CsvRowSource::open(&path, None, UTF_8).expect("open source");
    assert_eq!(source.fields(), ["id", "amount", "note"]);
    assert_eq!(source.total_rows(), Some(3));
    let rows = collect(source);

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].index(), 0);
    let first: Vec<&RawValue> = rows[0].fields().iter().map(|f| f.value()).collect();
    assert_eq!(
        first,
        [
            &RawValue::Integer(7),
            &RawValue::Float(2.5),
            &RawValue::Text("hello".into())
        ]
    );
    assert_eq!(rows[0].get("amount").map(|f| f.text()), Some("2.50"));
    assert_eq!(value(&rows[1], "amount"), Some(&RawValue::Null));
    assert!(rows[1].get("note").is_some_and(|f| f.is_null()));
    assert_eq!(value(&rows[2], "amount"), Some(&RawValue::Float(1000.0)));
    assert_eq!(rows[2].get("amount").map(|f| f.text()), Some("1e3"));
    assert_eq!(value(&rows[2], "note"), Some(&RawValue::Text("a, b".into())));
    assert_eq!(rows[2].index(), 2);
}

#[test]
fn tsv_extension_switches_to_tabs() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("people.tsv", "id\tname\n1\tann, jr\n");

    let rows = collect(CsvRowSource::open(&path, None, UTF_8).unwrap());
    assert_eq!(value(&rows[0], "name"), Some(&RawValue::Text("ann, jr".into())));
}

#[test]
fn explicit_delimiter_wins() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("people.csv", "id;name\n1;ann\n");

    let rows = collect(CsvRowSource::open(&path, Some(b';'), UTF_8).unwrap());
    assert_eq!(value(&rows[0], "id"), Some(&RawValue::Integer(1)));
    assert_eq!(value(&rows[0], "name"), Some(&RawValue::Text("ann".into())));
}

#[test]
fn short_records_expose_missing_fields_as_absent() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("short.csv", "a,b,c\n1,2\n");

    let rows = collect(CsvRowSource::open(&path, None, UTF_8).unwrap());
    assert_eq!(value(&rows[0], "b"), Some(&RawValue::Integer(2)));
    assert!(rows[0].get("c").is_none());
}

#[test]
fn legacy_encodings_are_decoded() {
    let workspace = TestWorkspace::new();
    let path = workspace.file("latin.csv");
    fs::write(&path, b"name\ncaf\xe9\n").unwrap();

    let rows = collect(CsvRowSource::open(&path, None, WINDOWS_1252).unwrap());
    assert_eq!(value(&rows[0], "name"), Some(&RawValue::Text("café".into())));
}

#[test]
fn missing_source_is_reported_by_path() {
    let workspace = TestWorkspace::new();
    let path = workspace.file("nope.csv");

    match CsvRowSource::open(&path, None, UTF_8) {
        Err(IngestError::SourceNotFound(reported)) => assert_eq!(reported, path),
        Err(other) => panic!("expected missing source, got {other:?}"),
        Ok(_) => panic!("expected missing source"),
    }
}

#[test]
fn error_sink_appends_source_text_without_header() {
    let workspace = TestWorkspace::new();
    let log_path = workspace.file("people.csv_errors.csv");
    let fields: Rc<[String]> = ["id", "name", "note"].map(String::from).into();
    let mut sink = ErrorSink::new(&log_path);
    assert!(!log_path.exists());

    sink.record(&SourceRow::new(4, Rc::clone(&fields), ["007", "O'Hara, Jr", ""]))
        .unwrap();
    sink.record(&SourceRow::new(9, fields, ["45.50", "say \"hi\"", "NULL"]))
        .unwrap();

    assert_eq!(sink.written(), 2);
    assert_eq!(
        fs::read_to_string(&log_path).unwrap(),
        "007,\"O'Hara, Jr\",\n45.50,\"say \"\"hi\"\"\",NULL\n"
    );
    drop(sink);

    let mut reopened = ErrorSink::new(&log_path);
    reopened
        .record(&SourceRow::new(11, Rc::from(vec!["id".to_string()]), ["1e3"]))
        .unwrap();
    assert!(fs::read_to_string(&log_path).unwrap().ends_with("NULL\n1e3\n"));
}
