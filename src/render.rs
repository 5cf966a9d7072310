//! Terminal rendering
//!
//! Turns the selector's choice into plain text. The classifier decides
//! the shape; this module only prints it (no chart drawing).

use crate::selector::DisplaySelection;
use crate::table::{cell_to_string, ExecutionStep, Table};
use crate::viz::{classify, DisplayShape};
use itertools::Itertools;

pub fn render(selection: Option<DisplaySelection<'_>>) -> String {
    match selection {
        None => "No table output to visualise.".to_string(),
        Some(DisplaySelection::Error(e)) => format!("Query failed: {}", e.error),
        Some(DisplaySelection::Table(table)) => match classify(table) {
            DisplayShape::Empty => "[empty] the query returned no rows".to_string(),
            DisplayShape::Scalar => {
                let label = table
                    .columns
                    .first()
                    .map(|c| c.name.as_str())
                    .unwrap_or("Result");
                let value = table
                    .rows
                    .first()
                    .and_then(|row| row.first())
                    .map(cell_to_string)
                    .unwrap_or_default();
                format!("{}: {}", label, value)
            }
            shape => format!("[{}]\n{}", shape.label(), render_table(table)),
        },
    }
}

/// Space-padded column layout with a dashed header rule.
fn render_table(table: &Table) -> String {
    let headers: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| row.get(i).map(String::len).unwrap_or(0))
                .chain(std::iter::once(header.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![
        format_row(&headers),
        widths.iter().map(|w| "-".repeat(*w)).join("  "),
    ];
    lines.extend(rows.iter().map(|row| format_row(row)));
    lines.join("\n")
}

/// Numbered diagnostic trace of every tool invocation.
pub fn render_trace(steps: &[ExecutionStep]) -> String {
    if steps.is_empty() {
        return "(no tool calls)".to_string();
    }
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            format!(
                "{}. {}({})\n   {}",
                i + 1,
                step.tool_name,
                step.tool_input,
                step.observation.preview(5).replace('\n', "\n   ")
            )
        })
        .join("\n")
}
