use once_cell::sync::Lazy;
use regex::Regex;

/// A Markdown table recovered from free text.
///
/// Headers and rows preserve the order they appear in; cells stay aligned to
/// headers positionally. All values remain strings, numeric or date
/// interpretation is left to the consumer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParsedTable {
    /// Column headers in table order.
    pub headers: Vec<String>,
    /// Data rows in table order, each a list of cell strings.
    pub rows: Vec<Vec<String>>,
}

static SEPARATOR_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\|(?:\s*:?-+:?\s*\|)+$").expect("separator row pattern is valid")
});

/// Recovers the first GitHub-style Markdown table from `text`.
///
/// The first `|...|` line is the candidate header; the line after it must be
/// a separator row (every cell dashes, optionally colon-bounded for
/// alignment), otherwise there is no table. Data rows are the consecutive
/// `|...|` lines after the separator, ending at the first line that breaks
/// the pattern. Succeeds only with at least one header and one row.
pub fn extract_table(text: &str) -> Option<ParsedTable> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    let header_idx = lines.iter().position(|line| is_pipe_row(line))?;
    let separator = lines.get(header_idx + 1)?;
    if !SEPARATOR_ROW.is_match(separator) {
        return None;
    }

    let headers: Vec<String> = split_cells(lines[header_idx])
        .into_iter()
        .filter(|header| !header.is_empty())
        .collect();

    let mut rows = Vec::new();
    for line in &lines[header_idx + 2..] {
        if !is_pipe_row(line) {
            break;
        }
        // Empty cells are kept here, unlike headers.
        rows.push(split_cells(line));
    }

    if headers.is_empty() || rows.is_empty() {
        return None;
    }
    Some(ParsedTable { headers, rows })
}

fn is_pipe_row(line: &str) -> bool {
    line.len() >= 3 && line.starts_with('|') && line.ends_with('|')
}

fn split_cells(line: &str) -> Vec<String> {
    line.trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_a_simple_table() {
        let text = "| id | name |\n| --- | --- |\n| 1 | Alice |\n| 2 | Bob |";
        let table = extract_table(text).expect("table");
        assert_eq!(table.headers, vec!["id", "name"]);
        assert_eq!(
            table.rows,
            vec![vec!["1", "Alice"], vec!["2", "Bob"]]
        );
    }

    #[test]
    fn table_embedded_in_prose_is_found() {
        let text = "Here are the first rows:\n\n| a | b |\n|---|---|\n| x | y |\n\nAnything else?";
        let table = extract_table(text).expect("table");
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec!["x", "y"]]);
    }

    #[test]
    fn alignment_colons_are_accepted_in_the_separator() {
        let text = "| left | right | center |\n| :--- | ---: | :---: |\n| 1 | 2 | 3 |";
        let table = extract_table(text).expect("table");
        assert_eq!(table.headers, vec!["left", "right", "center"]);
    }

    #[test]
    fn malformed_separator_means_no_table() {
        let text = "| foo | bar |\nnot a separator\n| 1 | 2 |";
        assert_eq!(extract_table(text), None);
    }

    #[test]
    fn text_without_pipe_lines_means_no_table() {
        assert_eq!(extract_table("Query affected 3 rows."), None);
    }

    #[test]
    fn header_with_no_rows_means_no_table() {
        let text = "| id | name |\n| --- | --- |\n\ndone";
        assert_eq!(extract_table(text), None);
    }

    #[test]
    fn rows_stop_at_the_first_non_pipe_line() {
        let text = "| n |\n| --- |\n| 1 |\n| 2 |\nthat is all\n| 3 |";
        let table = extract_table(text).expect("table");
        assert_eq!(table.rows, vec![vec!["1"], vec!["2"]]);
    }

    #[test]
    fn empty_cells_are_preserved_in_rows() {
        let text = "| a | b |\n| --- | --- |\n| 1 |  |";
        let table = extract_table(text).expect("table");
        assert_eq!(table.rows, vec![vec!["1".to_string(), String::new()]]);
    }

    #[test]
    fn empty_header_cells_are_dropped() {
        let text = "| a |  | b |\n| --- | --- | --- |\n| 1 | 2 | 3 |";
        let table = extract_table(text).expect("table");
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec!["1", "2", "3"]]);
    }

    #[test]
    fn indented_table_lines_are_trimmed_before_matching() {
        let text = "  | id |\n  | --- |\n  | 7 |";
        let table = extract_table(text).expect("table");
        assert_eq!(table.headers, vec!["id"]);
        assert_eq!(table.rows, vec![vec!["7"]]);
    }

    #[test]
    fn separator_line_as_first_pipe_line_is_not_a_table() {
        // A stray separator with no header above it: the separator itself
        // becomes the candidate header and the row after it must separate.
        let text = "| --- |\n| 1 |";
        assert_eq!(extract_table(text), None);
    }
}
