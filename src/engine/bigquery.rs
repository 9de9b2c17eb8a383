//! BigQuery implementation of the query engine.
//!
//! Runs the statement through `jobs.query`, then keeps calling
//! `jobs.getQueryResults` until the job reports completion and no page token
//! is left. Cells are converted from BigQuery's wire format using the result
//! schema, nested `RECORD`/`REPEATED` cells included.

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use gcp_bigquery_client::client_builder::ClientBuilder;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::field_type::FieldType;
use gcp_bigquery_client::model::get_query_results_parameters::GetQueryResultsParameters;
use gcp_bigquery_client::model::get_query_results_response::GetQueryResultsResponse;
use gcp_bigquery_client::model::query_parameter::QueryParameter;
use gcp_bigquery_client::model::query_parameter_type::QueryParameterType;
use gcp_bigquery_client::model::query_parameter_value::QueryParameterValue;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::query_response::QueryResponse;
use gcp_bigquery_client::model::table_field_schema::TableFieldSchema;
use gcp_bigquery_client::model::table_row::TableRow;
use gcp_bigquery_client::model::table_schema::TableSchema;
use gcp_bigquery_client::yup_oauth2::read_service_account_key;
use gcp_bigquery_client::Client;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use super::{EngineConnector, QueryEngine};
use crate::credentials::Credentials;
use crate::error::{HarvestError, Result};
use crate::query::{ParameterizedQuery, ScalarParameter};
use crate::table::{ColumnInfo, Row, Table, Value};

/// Connector that authenticates with a service-account key file.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigQueryConnector;

impl BigQueryConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EngineConnector for BigQueryConnector {
    async fn connect(
        &self,
        credentials: &Credentials,
        project: &str,
    ) -> Result<Box<dyn QueryEngine>> {
        let engine = BigQueryEngine::from_key_file(credentials, project).await?;
        Ok(Box::new(engine))
    }
}

/// Authenticated BigQuery client bound to a project.
pub struct BigQueryEngine {
    client: Client,
    project_id: String,
}

impl BigQueryEngine {
    /// Creates a read-only client from the service-account key at `credentials`.
    pub async fn from_key_file(credentials: &Credentials, project: &str) -> Result<Self> {
        let key_path = credentials.key_path();
        debug!("Authenticating with service-account key {}", key_path.display());

        let key = read_service_account_key(key_path)
            .await
            .map_err(BQError::from)?;
        let client = ClientBuilder::new()
            .build_from_service_account_key(key, true)
            .await?;

        Ok(Self {
            client,
            project_id: project.to_string(),
        })
    }

    fn build_request(query: &ParameterizedQuery) -> QueryRequest {
        let mut request = QueryRequest::new(query.sql.clone());
        request.parameter_mode = Some("NAMED".to_string());
        request.query_parameters = Some(query.parameters.iter().map(to_query_parameter).collect());
        request
    }
}

#[async_trait]
impl QueryEngine for BigQueryEngine {
    async fn execute(&self, query: &ParameterizedQuery) -> Result<Table> {
        let request = Self::build_request(query);
        let response = self.client.job().query(&self.project_id, request).await?;

        let job_reference = response.job_reference.clone();
        let reference = job_reference.as_ref();
        let jobs = self.client.job();
        let default_project = self.project_id.as_str();

        let collected = collect_pages(ResultPage::from(response), move |page_token| async move {
            let reference = reference.ok_or_else(|| {
                HarvestError::unexpected("BigQuery response is missing a job reference")
            })?;
            let job_id = reference.job_id.as_deref().ok_or_else(|| {
                HarvestError::unexpected("BigQuery job reference is missing a job id")
            })?;
            let project_id = reference.project_id.as_deref().unwrap_or(default_project);

            let parameters = GetQueryResultsParameters {
                page_token,
                location: reference.location.clone(),
                ..Default::default()
            };
            let response = jobs.get_query_results(project_id, job_id, parameters).await?;
            Ok::<_, HarvestError>(ResultPage::from(response))
        })
        .await?;

        let fields = collected.schema.and_then(|s| s.fields).unwrap_or_default();
        let table = materialize(&fields, collected.rows)?;
        info!(
            "BigQuery returned {} rows across {} page(s)",
            table.row_count(),
            collected.pages
        );
        Ok(table)
    }
}

fn to_query_parameter(parameter: &ScalarParameter) -> QueryParameter {
    QueryParameter {
        name: Some(parameter.name.clone()),
        parameter_type: Some(QueryParameterType {
            r#type: parameter.param_type.as_str().to_string(),
            ..Default::default()
        }),
        parameter_value: Some(QueryParameterValue {
            value: Some(parameter.value.clone()),
            ..Default::default()
        }),
    }
}

/// One page of a query or getQueryResults response.
#[derive(Debug, Default)]
struct ResultPage {
    complete: bool,
    page_token: Option<String>,
    schema: Option<TableSchema>,
    rows: Vec<TableRow>,
}

impl ResultPage {
    fn new(
        job_complete: Option<bool>,
        page_token: Option<String>,
        schema: Option<TableSchema>,
        rows: Option<Vec<TableRow>>,
    ) -> Self {
        Self {
            complete: job_complete.unwrap_or(true),
            page_token: page_token.filter(|t| !t.is_empty()),
            schema,
            rows: rows.unwrap_or_default(),
        }
    }

    fn has_more(&self) -> bool {
        !self.complete || self.page_token.is_some()
    }
}

impl From<QueryResponse> for ResultPage {
    fn from(response: QueryResponse) -> Self {
        Self::new(
            response.job_complete,
            response.page_token,
            response.schema,
            response.rows,
        )
    }
}

impl From<GetQueryResultsResponse> for ResultPage {
    fn from(response: GetQueryResultsResponse) -> Self {
        Self::new(
            response.job_complete,
            response.page_token,
            response.schema,
            response.rows,
        )
    }
}

/// Schema and rows gathered from every page of a job.
#[derive(Debug)]
struct CollectedRows {
    schema: Option<TableSchema>,
    rows: Vec<TableRow>,
    pages: usize,
}

/// Drains a job's result pages, asking `fetch_next` for each following page.
///
/// The schema is taken from the first page that carries one.
async fn collect_pages<F, Fut>(first: ResultPage, mut fetch_next: F) -> Result<CollectedRows>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<ResultPage>>,
{
    let mut page = first;
    let mut collected = CollectedRows {
        schema: page.schema.take(),
        rows: std::mem::take(&mut page.rows),
        pages: 1,
    };

    while page.has_more() {
        page = fetch_next(page.page_token.take()).await?;
        if collected.schema.is_none() {
            collected.schema = page.schema.take();
        }
        collected.rows.append(&mut page.rows);
        collected.pages += 1;
    }

    Ok(collected)
}

fn materialize(fields: &[TableFieldSchema], rows: Vec<TableRow>) -> Result<Table> {
    let columns = fields
        .iter()
        .map(|f| ColumnInfo::new(&f.name, column_type(f)))
        .collect();

    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| convert_row(fields, row, index))
        .collect::<Result<Vec<_>>>()?;

    Ok(Table::with_data(columns, rows))
}

fn column_type(field: &TableFieldSchema) -> String {
    let name = type_name(&field.r#type);
    if is_repeated(field) {
        format!("ARRAY<{name}>")
    } else {
        name.to_string()
    }
}

fn type_name(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::String => "STRING",
        FieldType::Bytes => "BYTES",
        FieldType::Integer => "INTEGER",
        FieldType::Int64 => "INT64",
        FieldType::Float => "FLOAT",
        FieldType::Float64 => "FLOAT64",
        FieldType::Numeric => "NUMERIC",
        FieldType::Bignumeric => "BIGNUMERIC",
        FieldType::Boolean => "BOOLEAN",
        FieldType::Bool => "BOOL",
        FieldType::Timestamp => "TIMESTAMP",
        FieldType::Date => "DATE",
        FieldType::Time => "TIME",
        FieldType::Datetime => "DATETIME",
        FieldType::Record => "RECORD",
        FieldType::Struct => "STRUCT",
        FieldType::Geography => "GEOGRAPHY",
        FieldType::Json => "JSON",
        FieldType::Interval => "INTERVAL",
    }
}

fn is_repeated(field: &TableFieldSchema) -> bool {
    field.mode.as_deref() == Some("REPEATED")
}

fn is_record(field: &TableFieldSchema) -> bool {
    matches!(field.r#type, FieldType::Record | FieldType::Struct)
}

fn convert_row(fields: &[TableFieldSchema], row: TableRow, index: usize) -> Result<Row> {
    let cells = row.columns.unwrap_or_default();
    if cells.len() != fields.len() {
        return Err(HarvestError::unexpected(format!(
            "Row {} has {} cells but the schema has {} columns",
            index,
            cells.len(),
            fields.len()
        )));
    }

    fields
        .iter()
        .zip(cells)
        .map(|(field, cell)| convert_cell(field, cell.value))
        .collect()
}

fn convert_cell(field: &TableFieldSchema, raw: Option<JsonValue>) -> Result<Value> {
    let raw = match raw {
        None | Some(JsonValue::Null) => return Ok(Value::Null),
        Some(raw) => raw,
    };

    if is_repeated(field) || is_record(field) {
        return Ok(Value::Json(nested_json(field, raw)?));
    }

    match raw {
        JsonValue::String(text) => convert_scalar(field, text),
        other => Ok(Value::Json(other)),
    }
}

fn convert_scalar(field: &TableFieldSchema, text: String) -> Result<Value> {
    let value = match field.r#type {
        FieldType::Integer | FieldType::Int64 => match text.parse() {
            Ok(i) => Value::Int(i),
            Err(_) => return Err(invalid_cell(field, &text, "integer")),
        },
        FieldType::Float | FieldType::Float64 => match text.parse() {
            Ok(f) => Value::Float(f),
            Err(_) => return Err(invalid_cell(field, &text, "number")),
        },
        FieldType::Numeric | FieldType::Bignumeric => Value::Numeric(text),
        FieldType::Boolean | FieldType::Bool => match text.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(invalid_cell(field, &text, "boolean")),
        },
        FieldType::Date => Value::Date(text),
        FieldType::Timestamp => match timestamp_to_rfc3339(&text) {
            Some(ts) => Value::Timestamp(ts),
            None => return Err(invalid_cell(field, &text, "timestamp")),
        },
        _ => Value::String(text),
    };
    Ok(value)
}

/// BigQuery sends TIMESTAMP cells as epoch seconds, e.g. `1.7040672E9`.
fn timestamp_to_rfc3339(text: &str) -> Option<String> {
    let seconds: f64 = text.parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }

    let micros = (seconds * 1_000_000.0).round() as i64;
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::<Utc>::from_timestamp(micros.div_euclid(1_000_000), nanos)
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Strips the `{"v": …}` / `{"f": […]}` wire wrappers from a nested cell.
fn nested_json(field: &TableFieldSchema, raw: JsonValue) -> Result<JsonValue> {
    if raw.is_null() {
        return Ok(JsonValue::Null);
    }
    if !is_repeated(field) {
        return element_json(field, raw);
    }

    match raw {
        JsonValue::Array(items) => items
            .into_iter()
            .map(|item| element_json(field, unwrap_cell(field, item)?))
            .collect::<Result<Vec<_>>>()
            .map(JsonValue::Array),
        other => Err(unexpected_shape(field, &other)),
    }
}

fn element_json(field: &TableFieldSchema, raw: JsonValue) -> Result<JsonValue> {
    match raw {
        JsonValue::Null => Ok(JsonValue::Null),
        raw if is_record(field) => record_json(field, raw),
        JsonValue::String(text) => Ok(serde_json::to_value(convert_scalar(field, text)?)?),
        other => Ok(other),
    }
}

fn record_json(field: &TableFieldSchema, raw: JsonValue) -> Result<JsonValue> {
    let subfields = field.fields.as_deref().unwrap_or_default();
    let cells = match raw {
        JsonValue::Object(mut record) => match record.remove("f") {
            Some(JsonValue::Array(cells)) => cells,
            _ => return Err(unexpected_shape(field, &JsonValue::Object(record))),
        },
        other => return Err(unexpected_shape(field, &other)),
    };

    if cells.len() != subfields.len() {
        return Err(HarvestError::unexpected(format!(
            "Record '{}' has {} cells but its schema has {} fields",
            field.name,
            cells.len(),
            subfields.len()
        )));
    }

    let mut object = serde_json::Map::new();
    for (subfield, cell) in subfields.iter().zip(cells) {
        let value = nested_json(subfield, unwrap_cell(subfield, cell)?)?;
        object.insert(subfield.name.clone(), value);
    }
    Ok(JsonValue::Object(object))
}

fn unwrap_cell(field: &TableFieldSchema, cell: JsonValue) -> Result<JsonValue> {
    match cell {
        JsonValue::Object(mut cell) => Ok(cell.remove("v").unwrap_or(JsonValue::Null)),
        other => Err(unexpected_shape(field, &other)),
    }
}

fn invalid_cell(field: &TableFieldSchema, text: &str, expected: &str) -> HarvestError {
    HarvestError::unexpected(format!(
        "Column '{}' holds {:?}, which is not a valid {}",
        field.name, text, expected
    ))
}

fn unexpected_shape(field: &TableFieldSchema, raw: &JsonValue) -> HarvestError {
    HarvestError::unexpected(format!(
        "Column '{}' ({}) has an unexpected cell shape: {}",
        field.name,
        type_name(&field.r#type),
        raw
    ))
}
