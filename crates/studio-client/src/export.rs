use std::io;

use serde_json::Value;

use crate::error::StudioError;
use crate::result::QueryResult;

/// Writes `result` as CSV: one header record, then one record per row.
///
/// Cells render as `NULL` for JSON null, the raw string for JSON strings,
/// and compact JSON for everything else. Quoting follows the csv crate's
/// standard rules, so cells containing commas, quotes, or newlines survive a
/// round-trip through any CSV reader.
pub fn write_csv<W: io::Write>(result: &QueryResult, writer: W) -> Result<(), StudioError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(&result.columns)
        .map_err(|e| StudioError::protocol(format!("csv export failed: {e}")))?;
    for row in &result.rows {
        let record: Vec<String> = row.iter().map(render_cell).collect();
        csv_writer
            .write_record(&record)
            .map_err(|e| StudioError::protocol(format!("csv export failed: {e}")))?;
    }
    csv_writer
        .flush()
        .map_err(|e| StudioError::protocol(format!("csv export failed: {e}")))
}

/// Renders `result` as a CSV string.
pub fn to_csv_string(result: &QueryResult) -> Result<String, StudioError> {
    let mut buffer = Vec::new();
    write_csv(result, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| StudioError::protocol(format!("csv export produced invalid UTF-8: {e}")))
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_with_rows(columns: Vec<&str>, rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult {
            columns: columns.into_iter().map(String::from).collect(),
            row_count: rows.len(),
            rows,
            execution_time_ms: 0,
        }
    }

    #[test]
    fn renders_header_and_rows() {
        let result = result_with_rows(
            vec!["id", "name"],
            vec![
                vec![json!(1), json!("Alice")],
                vec![json!(2), Value::Null],
            ],
        );
        let csv = to_csv_string(&result).expect("csv");
        assert_eq!(csv, "id,name\n1,Alice\n2,NULL\n");
    }

    #[test]
    fn cells_with_commas_and_quotes_are_quoted() {
        let result = result_with_rows(
            vec!["note"],
            vec![vec![json!("a, b")], vec![json!("say \"hi\"")]],
        );
        let csv = to_csv_string(&result).expect("csv");
        assert_eq!(csv, "note\n\"a, b\"\n\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn non_scalar_cells_render_as_compact_json() {
        let result = result_with_rows(vec!["tags"], vec![vec![json!(["a", "b"])]]);
        let csv = to_csv_string(&result).expect("csv");
        assert_eq!(csv, "tags\n\"[\"\"a\"\",\"\"b\"\"]\"\n");
    }

    #[test]
    fn extracted_table_round_trips_through_a_csv_reader() {
        let text = "| id | name |\n| --- | --- |\n| 1 | Ann, Lee |\n| 2 | Bob |";
        let table = studio_extract::extract_table(text).expect("table");
        let result = QueryResult::from_table(table, 0);
        let csv = to_csv_string(&result).expect("csv");

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers: Vec<String> = reader
            .headers()
            .expect("headers")
            .iter()
            .map(String::from)
            .collect();
        assert_eq!(headers, vec!["id", "name"]);
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|record| record.expect("record").iter().map(String::from).collect())
            .collect();
        assert_eq!(
            rows,
            vec![
                vec!["1".to_string(), "Ann, Lee".to_string()],
                vec!["2".to_string(), "Bob".to_string()],
            ]
        );
    }
}
