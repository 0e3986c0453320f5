use once_cell::sync::Lazy;
use regex::Regex;

static SQL_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```sql[ \t]*\r?\n(.*?)```").expect("sql fence pattern is valid")
});

static STATEMENT_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:select|with|insert|update|delete)\b")
        .expect("statement keyword pattern is valid")
});

/// Finds an embedded SQL statement in assistant reply text.
///
/// A fenced code block tagged `sql` wins; its inner content is returned
/// trimmed. Without a fence, the text from the first statement-leading
/// keyword (`SELECT`, `WITH`, `INSERT`, `UPDATE`, `DELETE`, matched as a
/// whole word, any case) to the end of the text is returned trimmed.
/// Returns `None` when neither form is present so callers can leave any
/// previously shown SQL untouched.
pub fn extract_sql(text: &str) -> Option<String> {
    if let Some(captures) = SQL_FENCE.captures(text) {
        let inner = captures
            .get(1)
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if !inner.is_empty() {
            return Some(inner.to_string());
        }
    }

    let start = STATEMENT_KEYWORD.find(text)?.start();
    let statement = text[start..].trim();
    if statement.is_empty() {
        return None;
    }
    Some(statement.to_string())
}
