//! Output formatting for the `result_df` table.

use crate::table::Table;
use serde::Serialize;

/// Name the host knows the output table by.
pub const OUTPUT_NAME: &str = "result_df";

/// Output format for the binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned plain-text table.
    #[default]
    Text,
    /// `{"result_df": {"columns": [...], "rows": [...]}}`.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    result_df: &'a Table,
}

/// Renders a table in the given format. The result ends with a newline.
pub fn render(table: &Table, format: OutputFormat) -> crate::error::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(table)),
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(&JsonOutput { result_df: table })?;
            out.push('\n');
            Ok(out)
        }
    }
}

/// Renders an aligned text table with a header rule and a row count footer.
pub fn render_text(table: &Table) -> String {
    let headers: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_display_string()).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format_line(&headers, &widths));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &cells {
        out.push_str(&format_line(row, &widths));
        out.push('\n');
    }

    let count = table.row_count();
    out.push_str(&format!(
        "({} {})\n",
        count,
        if count == 1 { "row" } else { "rows" }
    ));
    out
}

fn format_line(values: &[String], widths: &[usize]) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(v, &w)| format!("{v:<w$}"))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}
