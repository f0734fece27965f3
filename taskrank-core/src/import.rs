//! Parse task CSV exports into drafts.
//!
//! Expected header (column order is free, extra columns are ignored):
//! title,due,importance,estimate,category,recurrence,memo
//!
//! Only `title` and `due` are required per row. Rows that fail to parse are
//! skipped with a warning; the file as a whole only fails on I/O or a broken
//! header.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::task::{Category, NewTask, Recurrence};
use crate::time::{parse_due, parse_minutes};

#[derive(Debug, Deserialize)]
struct CsvRow {
    title: String,
    due: String,
    #[serde(default)]
    importance: Option<u8>,
    #[serde(default)]
    estimate: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    recurrence: Option<String>,
    #[serde(default)]
    memo: Option<String>,
}

/// Parse a task CSV file for `owner`. Naive due dates are read in `tz`
/// (UTC when `None`).
pub fn parse_tasks_csv(path: impl AsRef<Path>, owner: &str, tz: Option<&str>) -> Result<Vec<NewTask>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;

    let mut out = Vec::new();
    for (i, result) in rdr.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(line, error = %e, "skipping unreadable row");
                continue;
            }
        };
        match row_to_task(row, owner, tz) {
            Ok(task) => out.push(task),
            Err(e) => tracing::warn!(line, error = %e, "skipping invalid row"),
        }
    }

    Ok(out)
}

fn row_to_task(row: CsvRow, owner: &str, tz: Option<&str>) -> Result<NewTask> {
    let due = parse_due(&row.due, tz)?;
    let mut task = NewTask::new(owner, row.title, due);

    if let Some(importance) = row.importance {
        task.importance = importance;
    }
    if let Some(estimate) = non_empty(row.estimate) {
        task.estimated_minutes = Some(parse_minutes(&estimate)?);
    }
    if let Some(category) = non_empty(row.category) {
        task.category = Some(category.parse::<Category>()?);
    }
    task.recurrence = non_empty(row.recurrence).and_then(|r| Recurrence::parse(&r));
    task.memo = non_empty(row.memo);

    Ok(task)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}
