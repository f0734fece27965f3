//! Due-date alert projection.
//!
//! Looks at an owner's open tasks and produces at most one alert, the most
//! pressing of: something overdue, something due today, something due
//! tomorrow. Calendar days are taken in the caller's zone.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueAlertKind {
    Overdue,
    DueToday,
    DueTomorrow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueAlert {
    pub kind: DueAlertKind,
    pub count: usize,
}

impl DueAlert {
    pub fn title(&self) -> &'static str {
        match self.kind {
            DueAlertKind::Overdue => "Overdue tasks",
            DueAlertKind::DueToday => "Tasks due today",
            DueAlertKind::DueTomorrow => "Tasks due tomorrow",
        }
    }

    pub fn body(&self) -> String {
        let noun = if self.count == 1 { "task" } else { "tasks" };
        match self.kind {
            DueAlertKind::Overdue => format!("{} {noun} past due", self.count),
            DueAlertKind::DueToday => format!("{} {noun} due today", self.count),
            DueAlertKind::DueTomorrow => format!("{} {noun} due tomorrow", self.count),
        }
    }
}

/// [`due_alert_in`] with UTC calendar days.
pub fn due_alert<'a>(tasks: impl IntoIterator<Item = &'a Task>, now: DateTime<Utc>) -> Option<DueAlert> {
    due_alert_in(tasks, now, &Utc)
}

/// Deterministically project open tasks into a single alert, with "today"
/// and "tomorrow" being calendar days in `tz`.
pub fn due_alert_in<'a, Z: TimeZone>(
    tasks: impl IntoIterator<Item = &'a Task>,
    now: DateTime<Utc>,
    tz: &Z,
) -> Option<DueAlert> {
    let today = now.with_timezone(tz).date_naive();
    let tomorrow = today + Duration::days(1);

    let (mut overdue, mut due_today, mut due_tomorrow) = (0, 0, 0);
    for t in tasks.into_iter().filter(|t| t.is_active()) {
        let day = t.due.with_timezone(tz).date_naive();
        if day == today {
            due_today += 1;
        } else if day == tomorrow {
            due_tomorrow += 1;
        } else if t.due < now {
            overdue += 1;
        }
    }

    let (kind, count) = if overdue > 0 {
        (DueAlertKind::Overdue, overdue)
    } else if due_today > 0 {
        (DueAlertKind::DueToday, due_today)
    } else if due_tomorrow > 0 {
        (DueAlertKind::DueTomorrow, due_tomorrow)
    } else {
        return None;
    };

    Some(DueAlert { kind, count })
}
