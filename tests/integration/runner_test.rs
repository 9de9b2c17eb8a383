//! End-to-end runner behaviour against the in-memory engine.
//!
//! Covers the output contract: result tables on success, the
//! `Error`/`Details` table with the right category on every failure path.

use harvest_query::engine::{FailingConnector, FailureMode, MockConnector, MockEngine};
use harvest_query::query::ParameterType;
use harvest_query::table::{ColumnInfo, Value};
use harvest_query::{ErrorKind, QueryInputs, QueryRunner, RunOutcome, RunnerConfig, Table};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

/// Writes a placeholder key file; the mock connector never reads it.
fn key_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("service-account.json");
    std::fs::write(&path, r#"{"type": "service_account"}"#).unwrap();
    path
}

fn harvest_table() -> Table {
    let row = |crop: &str, region: &str, date: &str, yield_t: f64| {
        vec![
            Value::from(crop),
            Value::from(region),
            Value::Date(date.to_string()),
            Value::Float(yield_t),
        ]
    };

    Table::with_data(
        vec![
            ColumnInfo::new("crop", "STRING"),
            ColumnInfo::new("region", "STRING"),
            ColumnInfo::new("date", "DATE"),
            ColumnInfo::new("yield_t", "FLOAT"),
        ],
        vec![
            row("wheat", "north", "2024-04-02", 3.4),
            row("wheat", "north", "2024-01-10", 2.8),
            row("wheat", "north", "2023-12-31", 2.2),
            row("wheat", "south", "2024-02-14", 4.1),
            row("maize", "north", "2024-02-01", 6.0),
            row("wheat", "north", "2024-03-31", 3.0),
            row("wheat", "north", "2024-01-01", 2.6),
            row("x' OR '1'='1", "elsewhere", "2024-02-01", 0.0),
        ],
    )
}

fn mock_runner(dir: &TempDir) -> QueryRunner<MockConnector> {
    let config = RunnerConfig::default()
        .with_credential_path(key_file(dir))
        .with_table("agri-prod", "harvest", "yields");
    QueryRunner::with_connector(config, MockConnector::new(MockEngine::with_data(harvest_table())))
}

fn failing_runner(dir: &TempDir, mode: FailureMode) -> QueryRunner<FailingConnector> {
    let config = RunnerConfig::default().with_credential_path(key_file(dir));
    QueryRunner::with_connector(config, FailingConnector::new(mode))
}

fn wheat_north() -> QueryInputs {
    QueryInputs::new("wheat", "north", "2024-01-01", "2024-03-31")
}

fn error_cell(table: &Table, column: &str) -> String {
    table
        .value(0, column)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_success_rows_match_filter_and_are_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let runner = mock_runner(&dir);

    let table = runner.run(&wheat_north()).await;

    assert!(!table.is_error_table());
    assert_eq!(table.column_names(), vec!["crop", "region", "date", "yield_t"]);

    let dates: Vec<String> = (0..table.row_count())
        .map(|i| table.value(i, "date").unwrap().to_display_string())
        .collect();
    assert_eq!(dates, vec!["2024-01-01", "2024-01-10", "2024-03-31"]);

    for i in 0..table.row_count() {
        assert_eq!(table.value(i, "crop"), Some(&Value::from("wheat")));
        assert_eq!(table.value(i, "region"), Some(&Value::from("north")));
    }
}

#[tokio::test]
async fn test_inputs_are_trimmed_before_binding() {
    let dir = tempfile::tempdir().unwrap();
    let runner = mock_runner(&dir);

    let table = runner
        .run(&QueryInputs::new(" wheat ", "north\t", " 2024-01-01", "2024-03-31 "))
        .await;
    assert_eq!(table.row_count(), 3);

    let executed = runner.connector().engine().executed_queries();
    let query = executed.last().unwrap();
    assert_eq!(query.parameter("crop").unwrap().value, "wheat");
    assert_eq!(query.parameter("start_date").unwrap().param_type, ParameterType::Date);
    assert_eq!(query.parameter("end_date").unwrap().value, "2024-03-31");
    assert!(query.sql.contains("FROM `agri-prod.harvest.yields`"));
}

#[tokio::test]
async fn test_unset_credentials_yield_auth_error_table() {
    let runner = QueryRunner::with_connector(RunnerConfig::default(), MockConnector::default());

    let table = runner.run(&wheat_north()).await;

    assert_eq!(table.column_names(), vec!["Error", "Details"]);
    assert_eq!(table.row_count(), 1);
    assert_eq!(error_cell(&table, "Error"), "Authentication configuration error");
    assert!(error_cell(&table, "Details").contains("BQ_SERVICE_ACCOUNT_JSON"));
}

#[tokio::test]
async fn test_nonexistent_key_file_yields_auth_error_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunnerConfig::default().with_credential_path(dir.path().join("missing.json"));
    let runner = QueryRunner::with_connector(config, MockConnector::default());

    let table = runner.run(&wheat_north()).await;

    assert_eq!(table.column_names(), vec!["Error", "Details"]);
    assert_eq!(error_cell(&table, "Error"), "Authentication configuration error");
    assert!(error_cell(&table, "Details").contains("missing.json"));
}

#[tokio::test]
async fn test_blank_inputs_yield_missing_input_table() {
    let dir = tempfile::tempdir().unwrap();
    let runner = mock_runner(&dir);

    let cases = [
        (QueryInputs::new("", "north", "2024-01-01", "2024-03-31"), "crop"),
        (QueryInputs::new("wheat", "  ", "2024-01-01", "2024-03-31"), "region"),
        (QueryInputs::new("wheat", "north", "\t", "2024-03-31"), "start_date"),
        (QueryInputs::new("wheat", "north", "2024-01-01", ""), "end_date"),
    ];

    for (inputs, blank) in cases {
        let table = runner.run(&inputs).await;
        assert_eq!(error_cell(&table, "Error"), "Missing input parameters");
        assert!(
            error_cell(&table, "Details").ends_with(blank),
            "details should name {blank}"
        );
    }

    assert!(runner.connector().engine().executed_queries().is_empty());
}

#[tokio::test]
async fn test_auth_error_wins_over_blank_inputs() {
    let runner = QueryRunner::with_connector(RunnerConfig::default(), MockConnector::default());
    let outcome = runner.run_outcome(&QueryInputs::default()).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::AuthenticationConfig));
}

#[tokio::test]
async fn test_api_error_on_execute() {
    let dir = tempfile::tempdir().unwrap();
    let runner = failing_runner(
        &dir,
        FailureMode::ExecuteApi("Access Denied: User does not have permission".to_string()),
    );

    let table = runner.run(&wheat_north()).await;

    assert_eq!(error_cell(&table, "Error"), "BigQuery API error");
    assert!(error_cell(&table, "Details").contains("does not have permission"));
}

#[tokio::test]
async fn test_api_error_on_connect() {
    let dir = tempfile::tempdir().unwrap();
    let runner = failing_runner(&dir, FailureMode::ConnectApi("invalid_grant".to_string()));

    let outcome = runner.run_outcome(&wheat_north()).await;

    assert_eq!(
        outcome,
        RunOutcome::Failure {
            kind: ErrorKind::BigQueryApi,
            details: "invalid_grant".to_string(),
        }
    );
}

#[tokio::test]
async fn test_non_api_error_is_unexpected() {
    let dir = tempfile::tempdir().unwrap();
    let runner = failing_runner(&dir, FailureMode::ExecuteUnexpected("bad cell".to_string()));

    let table = runner.run(&wheat_north()).await;

    assert_eq!(error_cell(&table, "Error"), "Unexpected error");
    assert_eq!(error_cell(&table, "Details"), "bad cell");
}

#[tokio::test]
async fn test_panic_is_contained() {
    let dir = tempfile::tempdir().unwrap();
    let runner = failing_runner(&dir, FailureMode::ExecutePanic("attempt to divide by zero".into()));

    let table = runner.run(&wheat_north()).await;

    assert!(table.is_error_table());
    assert_eq!(error_cell(&table, "Error"), "Unexpected error");
    assert_eq!(error_cell(&table, "Details"), "attempt to divide by zero");
}

#[tokio::test]
async fn test_identical_inputs_give_identical_tables() {
    let dir = tempfile::tempdir().unwrap();
    let runner = mock_runner(&dir);

    let first = runner.run(&wheat_north()).await;
    let second = runner.run(&wheat_north()).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_sql_metacharacters_bound_as_literal() {
    let dir = tempfile::tempdir().unwrap();
    let runner = mock_runner(&dir);
    let hostile = "x' OR '1'='1";

    let table = runner
        .run(&QueryInputs::new(hostile, "north", "2024-01-01", "2024-03-31"))
        .await;

    assert!(!table.is_error_table());
    assert!(table.is_empty());

    let executed = runner.connector().engine().executed_queries();
    let query = executed.last().unwrap();
    assert!(!query.sql.contains(hostile));
    assert!(query.sql.contains("WHERE crop   = @crop"));
    assert_eq!(query.parameter("crop").unwrap().value, hostile);
}

#[test]
fn test_run_blocking_matches_async_run() {
    let dir = tempfile::tempdir().unwrap();
    let runner = mock_runner(&dir);

    let table = runner.run_blocking(&wheat_north());
    assert_eq!(table.row_count(), 3);
}

#[tokio::test]
async fn test_run_blocking_from_async_host() {
    let dir = tempfile::tempdir().unwrap();
    let runner = mock_runner(&dir);

    let table = runner.run_blocking(&wheat_north());

    assert!(!table.is_error_table());
    assert_eq!(table.row_count(), 3);
}

#[tokio::test]
async fn test_malformed_key_file_is_api_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunnerConfig::default().with_credential_path(key_file(&dir));

    let table = QueryRunner::new(config).run(&wheat_north()).await;

    assert_eq!(error_cell(&table, "Error"), "BigQuery API error");
    assert!(error_cell(&table, "Details").contains("Invalid service account key"));
}

#[tokio::test]
async fn test_unparseable_key_file_is_api_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service-account.json");
    std::fs::write(&path, "not json at all").unwrap();
    let config = RunnerConfig::default().with_credential_path(path);

    let outcome = QueryRunner::new(config).run_outcome(&wheat_north()).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::BigQueryApi));
}
