//! CSV row source tests against files on disk

use engstat_io::{
    open_source, ColumnType, CsvOptions, CsvRowSource, IoError, Row, RowSource, Value,
};
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

const ENGINE_CSV: &str = "\
Engine rpm,Lub oil pressure,Fuel pressure,Coolant pressure,lub oil temp,Coolant temp,Engine Condition
700,2.49,11.79,3.17,84.14,81.63,1
876,2.94,16.19,2.46,77.64,82.44,0
520,2.96,6.55,1.06,77.75,79.64,1
";

fn write_fixture(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn drain(source: &mut dyn RowSource) -> Vec<Result<Row, IoError>> {
    std::iter::from_fn(|| source.next_row()).collect()
}

// === Schema ===

#[test]
fn test_headers_are_normalized() {
    let file = write_fixture(ENGINE_CSV, ".csv");
    let source = CsvRowSource::open(file.path().to_str().unwrap()).unwrap();

    assert_eq!(
        source.schema().column_names(),
        vec![
            "engine_rpm",
            "lub_oil_pressure",
            "fuel_pressure",
            "coolant_pressure",
            "lub_oil_temp",
            "coolant_temp",
            "engine_condition",
        ]
    );
    assert_eq!(source.schema().num_records, Some(3));
    assert_eq!(source.format_name(), "CSV");
}

#[test]
fn test_types_are_inferred() {
    let file = write_fixture(ENGINE_CSV, ".csv");
    let source = CsvRowSource::open(file.path().to_str().unwrap()).unwrap();
    let schema = source.schema();

    assert_eq!(schema.column("engine_rpm").unwrap().dtype, ColumnType::Integer);
    assert_eq!(schema.column("fuel_pressure").unwrap().dtype, ColumnType::Float);
    assert_eq!(
        schema.column("engine_condition").unwrap().dtype,
        ColumnType::Integer
    );
}

#[test]
fn test_raw_headers_kept_when_not_normalized() {
    let file = write_fixture(ENGINE_CSV, ".csv");
    let options = CsvOptions {
        normalize_headers: false,
        ..CsvOptions::default()
    };
    let source = CsvRowSource::open_with_options(file.path().to_str().unwrap(), options).unwrap();
    assert_eq!(source.schema().column_names()[0], "Engine rpm");
}

#[test]
fn test_text_column_rejected_unless_skipped() {
    let contents = "Time,Engine rpm\n2024-01-01T00:00,700\n2024-01-01T00:01,710\n";
    let file = write_fixture(contents, ".csv");
    let path = file.path().to_str().unwrap();

    assert!(matches!(
        CsvRowSource::open(path),
        Err(IoError::InvalidFormat(_))
    ));

    let options = CsvOptions {
        skip_columns: vec!["time".to_string()],
        ..CsvOptions::default()
    };
    let mut source = CsvRowSource::open_with_options(path, options).unwrap();
    assert_eq!(source.schema().column_names(), vec!["engine_rpm"]);
    let rows = drain(&mut source);
    assert_eq!(rows[1].as_ref().unwrap().get(0), Some(Value::Integer(710)));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        CsvRowSource::open("/nonexistent/engine.csv"),
        Err(IoError::FileNotFound(_))
    ));
}

// === Streaming ===

#[test]
fn test_rows_stream_and_rewind() {
    let file = write_fixture(ENGINE_CSV, ".csv");
    let mut source = CsvRowSource::open(file.path().to_str().unwrap()).unwrap();

    let rows = drain(&mut source);
    assert_eq!(rows.len(), 3);
    let first = rows[0].as_ref().unwrap();
    assert_eq!(first.get(0), Some(Value::Integer(700)));
    assert_eq!(first.get_f64(2), Some(11.79));

    source.rewind().unwrap();
    let again = drain(&mut source);
    assert_eq!(again.len(), 3);
    assert_eq!(again[0].as_ref().unwrap(), first);
}

#[test]
fn test_malformed_rows_are_recoverable() {
    let contents = "a,b\n1,2.0\n2,oops\n3\n4,5.5\n";
    let file = write_fixture(contents, ".csv");
    let mut source = CsvRowSource::open(file.path().to_str().unwrap()).unwrap();

    let rows = drain(&mut source);
    assert_eq!(rows.len(), 4);
    assert!(rows[0].is_ok());
    assert!(matches!(rows[1], Err(IoError::MalformedRow { row: 2, .. })));
    assert!(rows[2].as_ref().unwrap_err().is_recoverable());
    assert_eq!(rows[3].as_ref().unwrap().get_f64(1), Some(5.5));
}

// === Dispatch ===

#[rstest]
#[case(".csv", "a,b\n1,2\n")]
#[case(".tsv", "a\tb\n1\t2\n")]
fn test_open_source_by_extension(#[case] suffix: &str, #[case] contents: &str) {
    let file = write_fixture(contents, suffix);
    let mut source = open_source(file.path().to_str().unwrap()).unwrap();
    assert_eq!(source.schema().column_names(), vec!["a", "b"]);
    let row = source.next_row().unwrap().unwrap();
    assert_eq!(row.get_f64(1), Some(2.0));
}
