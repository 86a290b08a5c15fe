//! Plain-text rendering of checkpoint state for operators.

use std::fmt::Write as _;

use crate::checkpoint::CheckpointRecord;

pub fn render_checkpoint(record: &CheckpointRecord) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Target: {}.{}", record.schema, record.table);
    if record.last_index < 0 {
        let _ = writeln!(output, "Last committed row: none");
    } else {
        let _ = writeln!(output, "Last committed row: {}", record.last_index);
    }
    let _ = writeln!(output, "Next row to load: {}", record.resume_at());

    let headers = ["#", "column", "type"].map(String::from);
    let rows = record
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            [
                (idx + 1).to_string(),
                column.name.clone(),
                column.declared_type.clone(),
            ]
        })
        .collect::<Vec<_>>();
    output.push_str(&render_grid(&headers, &rows));
    output
}

fn render_grid<const N: usize>(headers: &[String; N], rows: &[[String; N]]) -> String {
    let mut widths = headers.clone().map(|h| h.chars().count().max(3));
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let rule = widths.map(|w| "-".repeat(w));

    let mut output = String::new();
    for line in std::iter::once(headers).chain(std::iter::once(&rule)).chain(rows) {
        let cells = line
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>();
        let _ = writeln!(output, "{}", cells.join("  ").trim_end());
    }
    output
}
