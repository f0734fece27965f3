//! taskrank-core: priority scoring and daily focus selection for tasks

pub mod alerts;
pub mod clock;
pub mod focus;
pub mod import;
pub mod recurrence;
pub mod scoring;
pub mod task;
pub mod task_book;
pub mod time;

pub use alerts::{due_alert, due_alert_in, DueAlert, DueAlertKind};
pub use clock::{Clock, FixedClock, SystemClock};
pub use focus::{approve_today_focus, select_today_focus, TodayFocus, FOCUS_SIZE};
pub use import::parse_tasks_csv;
pub use recurrence::next_due;
pub use scoring::{
    calculate_priority_score, calculate_priority_score_at, dependency_score, duration_score,
    importance_score, priority_level, urgency_score, urgency_score_at, PriorityLevel,
    ScoreBreakdown,
};
pub use task::{Category, NewTask, Recurrence, Task, TaskId, TaskPatch, TaskStatus};
pub use task_book::{ListFilter, SortKey, TaskBook};
pub use time::{parse_due, parse_minutes, to_rfc3339_utc};
