//! Live BigQuery tests.
//!
//! Need HARVEST_LIVE_TEST=1 plus BQ_SERVICE_ACCOUNT_JSON (and usually
//! BQ_PROJECT / BQ_DATASET / BQ_TABLE) pointing at a real table with
//! `crop`, `region` and `date` columns. Optional HARVEST_LIVE_CROP,
//! HARVEST_LIVE_REGION, HARVEST_LIVE_START and HARVEST_LIVE_END pick the
//! filter values.

use harvest_query::table::Value;
use harvest_query::{QueryInputs, QueryRunner, RunnerConfig};

fn live_config() -> Option<RunnerConfig> {
    if std::env::var("HARVEST_LIVE_TEST").ok().as_deref() != Some("1") {
        return None;
    }
    let config = RunnerConfig::from_env();
    config.credential_path.as_ref()?;
    Some(config)
}

fn live_inputs() -> QueryInputs {
    let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
    QueryInputs::new(
        var("HARVEST_LIVE_CROP", "wheat"),
        var("HARVEST_LIVE_REGION", "north"),
        var("HARVEST_LIVE_START", "2024-01-01"),
        var("HARVEST_LIVE_END", "2024-12-31"),
    )
}

#[tokio::test]
async fn test_live_query_is_filtered_and_ordered() {
    let Some(config) = live_config() else {
        eprintln!("Skipping test: HARVEST_LIVE_TEST not enabled");
        return;
    };
    let inputs = live_inputs();
    let runner = QueryRunner::new(config);

    let table = runner.run(&inputs).await;
    assert!(
        !table.is_error_table(),
        "live query failed: {:?}",
        table.value(0, "Details")
    );

    let dates: Vec<String> = (0..table.row_count())
        .filter_map(|i| table.value(i, "date").map(Value::to_display_string))
        .collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted);

    for i in 0..table.row_count() {
        assert_eq!(table.value(i, "crop").and_then(Value::as_str), Some(inputs.crop.as_str()));
        assert_eq!(
            table.value(i, "region").and_then(Value::as_str),
            Some(inputs.region.as_str())
        );
    }
}

#[tokio::test]
async fn test_live_missing_table_is_api_error() {
    let Some(config) = live_config() else {
        eprintln!("Skipping test: HARVEST_LIVE_TEST not enabled");
        return;
    };
    let config = RunnerConfig {
        table: "harvest_query_table_that_does_not_exist".to_string(),
        ..config
    };

    let table = QueryRunner::new(config).run(&live_inputs()).await;

    assert_eq!(
        table.value(0, "Error").and_then(Value::as_str),
        Some("BigQuery API error")
    );
}
