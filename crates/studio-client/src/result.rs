use serde_json::Value;
use studio_extract::ParsedTable;

use crate::error::StudioError;

/// A tabular query result ready for rendering or export.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueryResult {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Rows of cell values, positionally aligned to `columns`.
    pub rows: Vec<Vec<Value>>,
    /// Number of rows in `rows`.
    pub row_count: usize,
    /// Round-trip execution time in milliseconds.
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Builds a result from backend JSON rows.
    ///
    /// Accepts the two row shapes the backend family produces: an array of
    /// objects (column order taken from the first object) or an array of
    /// arrays (columns synthesized as `column_1..N`). An empty slice is a
    /// valid zero-row result.
    pub fn from_json_rows(rows: &[Value], execution_time_ms: u64) -> Result<Self, StudioError> {
        let Some(first) = rows.first() else {
            return Ok(Self {
                columns: Vec::new(),
                rows: Vec::new(),
                row_count: 0,
                execution_time_ms,
            });
        };

        match first {
            Value::Object(object) => {
                let columns: Vec<String> = object.keys().cloned().collect();
                let mut out_rows = Vec::with_capacity(rows.len());
                for row in rows {
                    let Value::Object(object) = row else {
                        return Err(StudioError::protocol(
                            "mixed result rows: expected an object for every row",
                        ));
                    };
                    out_rows.push(
                        columns
                            .iter()
                            .map(|column| object.get(column).cloned().unwrap_or(Value::Null))
                            .collect(),
                    );
                }
                Ok(Self {
                    row_count: out_rows.len(),
                    columns,
                    rows: out_rows,
                    execution_time_ms,
                })
            }
            Value::Array(first_row) => {
                let columns: Vec<String> = (1..=first_row.len())
                    .map(|n| format!("column_{n}"))
                    .collect();
                let mut out_rows = Vec::with_capacity(rows.len());
                for row in rows {
                    let Value::Array(cells) = row else {
                        return Err(StudioError::protocol(
                            "mixed result rows: expected an array for every row",
                        ));
                    };
                    out_rows.push(cells.clone());
                }
                Ok(Self {
                    row_count: out_rows.len(),
                    columns,
                    rows: out_rows,
                    execution_time_ms,
                })
            }
            _ => Err(StudioError::protocol(
                "unsupported result row shape: expected objects or arrays",
            )),
        }
    }

    /// Builds a result from a Markdown table recovered out of prose.
    ///
    /// Every cell stays a string; no type coercion happens here.
    pub fn from_table(table: ParsedTable, execution_time_ms: u64) -> Self {
        let rows: Vec<Vec<Value>> = table
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(Value::String).collect())
            .collect();
        Self {
            columns: table.headers,
            row_count: rows.len(),
            rows,
            execution_time_ms,
        }
    }
}
