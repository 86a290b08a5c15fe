//! Multi-row `INSERT` rendering with SQL string-literal escaping.
//!
//! Values are rendered inline rather than bound as parameters so that a whole
//! batch travels to the store as a single statement.

use std::fmt::Write as _;

use itertools::Itertools;

use crate::{
    coerce::SqlValue, error::IngestError, schema::ColumnDescriptor, transform::TransformedRow,
};

/// Renders one statement for `rows`, or `None` when there is nothing to insert.
pub fn build_insert(
    rows: &[TransformedRow],
    columns: &[ColumnDescriptor],
    table: &str,
    schema: &str,
) -> Result<Option<String>, IngestError> {
    if rows.is_empty() {
        return Ok(None);
    }
    let mut sql = format!(
        "INSERT INTO {schema}.{table} ({}) VALUES ",
        columns.iter().map(|c| c.name.as_str()).join(",")
    );
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(IngestError::RowShape {
                expected: columns.len(),
                actual: row.len(),
            });
        }
        if idx > 0 {
            sql.push(',');
        }
        sql.push('(');
        for (pos, value) in row.values().iter().enumerate() {
            if pos > 0 {
                sql.push(',');
            }
            render_literal(value, &mut sql);
        }
        sql.push(')');
    }
    sql.push(';');
    Ok(Some(sql))
}

pub fn render_literal(value: &SqlValue, out: &mut String) {
    match value {
        SqlValue::Null => out.push_str("NULL"),
        SqlValue::Integer(value) => {
            let _ = write!(out, "{value}");
        }
        SqlValue::Text(text) => {
            out.push('\'');
            out.push_str(&escape_text(strip_quotes(text)));
            out.push('\'');
        }
    }
}

/// Doubles every single quote.
pub fn escape_text(text: &str) -> String {
    text.replace('\'', "''")
}

// Text already wrapped as a literal upstream is unwrapped so it is quoted once.
fn strip_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(value: SqlValue) -> String {
        let mut out = String::new();
        render_literal(&value, &mut out);
        out
    }

    #[test]
    fn literals_by_kind() {
        assert_eq!(literal(SqlValue::Null), "NULL");
        assert_eq!(literal(SqlValue::Integer(-12)), "-12");
        assert_eq!(literal(SqlValue::Text("plain".into())), "'plain'");
        assert_eq!(literal(SqlValue::Text(String::new())), "''");
    }

    #[test]
    fn pre_quoted_text_is_quoted_once() {
        assert_eq!(literal(SqlValue::Text("'value1'".into())), "'value1'");
        assert_eq!(literal(SqlValue::Text("'What's up?'".into())), "'What''s up?'");
        assert_eq!(literal(SqlValue::Text("'".into())), "''''");
    }

    #[test]
    fn mismatched_row_width_is_rejected() {
        let rows = vec![TransformedRow::new(vec![SqlValue::Integer(1)])];
        let columns = vec![
            ColumnDescriptor::new("a", "integer"),
            ColumnDescriptor::new("b", "integer"),
        ];
        assert!(matches!(
            build_insert(&rows, &columns, "t", "s"),
            Err(IngestError::RowShape {
                expected: 2,
                actual: 1
            })
        ));
    }
}
