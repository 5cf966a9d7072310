//! Result Selector
//!
//! Picks the one tabular result out of a trace that should be shown to
//! the user. The oracle may retry a failed query several times before it
//! succeeds; the user should see the most recent success, or failing
//! that, the most recent failure. Pure function, no side effects.

use crate::table::{ErrorResult, ExecutionStep, Observation, Table};
use crate::tools::RUN_QUERY;

#[derive(Debug, Clone, PartialEq)]
pub enum DisplaySelection<'a> {
    Table(&'a Table),
    Error(&'a ErrorResult),
}

/// Select the display table from a trace.
///
/// Only `run_query` steps with table-shaped observations are considered.
/// Scanning in reverse chronological order, the first genuine `Table`
/// without an `error` column wins; if no success exists, the most recent
/// `ErrorResult` is surfaced instead; with no table-shaped output at all
/// the answer stands alone.
pub fn select_display_table(steps: &[ExecutionStep]) -> Option<DisplaySelection<'_>> {
    let shaped: Vec<&Observation> = steps
        .iter()
        .filter(|step| step.tool_name == RUN_QUERY)
        .filter_map(|step| match &step.observation {
            obs @ (Observation::Table(_) | Observation::Error(_)) => Some(obs),
            Observation::Text(_) => None,
        })
        .collect();

    if shaped.is_empty() {
        return None;
    }

    for observation in shaped.iter().rev() {
        if let Observation::Table(table) = observation {
            if !table.has_column("error") {
                return Some(DisplaySelection::Table(table));
            }
        }
    }

    // No clean success anywhere; surface the latest failure reason.
    // A data table that merely carries an `error` column is neither a
    // success nor an error sentinel, so it never reaches the user here.
    for observation in shaped.iter().rev() {
        if let Observation::Error(error) = observation {
            return Some(DisplaySelection::Error(error));
        }
    }
    None
}
