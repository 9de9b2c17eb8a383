//! Integration tests for harvest-query.

pub mod bigquery_test;
pub mod runner_test;
