//! Query construction for harvest-query.
//!
//! Builds the one statement this crate ever runs. Filter values travel as
//! named, typed parameters; only the table reference is part of the SQL text.

mod statement;

pub use statement::{
    crop_query, ParameterType, ParameterizedQuery, ScalarParameter, TableReference,
};
