//! Text recovery for assistant replies.
//!
//! The studio backend answers in prose. Two pieces of structure regularly
//! hide inside that prose and are worth pulling back out:
//!
//! - an embedded SQL statement (fenced code block or a bare trailing
//!   statement), recovered by [`extract_sql`];
//! - a GitHub-flavored Markdown table encoding a result set, recovered by
//!   [`extract_table`].
//!
//! Both extractors are total: they never fail, they just return `None` when
//! the text carries no recognizable structure.

/// SQL statement recovery from free text.
pub mod sql;
/// Markdown table recovery from free text.
pub mod table;

pub use sql::extract_sql;
pub use table::{ParsedTable, extract_table};
