//! Recurrence projection: where the next occurrence of a completed task lands.

use chrono::{DateTime, Duration, Months, Utc};

use crate::task::{NewTask, Recurrence, Task};

/// Next due instant for `rule`. `None` leaves `due` unchanged, which callers
/// read as "do not reschedule".
///
/// Monthly keeps the day-of-month, clamped to the last day of a shorter month
/// (Jan 31 -> Feb 28/29). Time of day is preserved.
pub fn next_due(due: DateTime<Utc>, rule: Option<Recurrence>) -> DateTime<Utc> {
    match rule {
        Some(Recurrence::Daily) => due + Duration::days(1),
        Some(Recurrence::Weekly) => due + Duration::days(7),
        Some(Recurrence::Monthly) => due.checked_add_months(Months::new(1)).unwrap_or(due),
        None => due,
    }
}

/// Draft of the successor for a recurring task that was just completed.
/// Returns `None` for non-recurring tasks.
pub fn successor(task: &Task) -> Option<NewTask> {
    let rule = task.recurrence?;

    Some(NewTask {
        owner: task.owner.clone(),
        title: task.title.clone(),
        due: next_due(task.due, Some(rule)),
        importance: task.importance,
        estimated_minutes: task.estimated_minutes,
        depends_on: None,
        parent_id: task.parent_id,
        category: task.category,
        memo: task.memo.clone(),
        recurrence: Some(rule),
    })
}
