//! Task model consumed by the priority engine.
//!
//! Storage is the caller's concern; the engine only reads these fields and
//! writes back the cached score and the focus flags.

use anyhow::{anyhow, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TaskId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Done,
    /// Soft-deleted. Invisible to listing and focus selection.
    Deleted,
}

impl TaskStatus {
    /// Not done and not soft-deleted.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::NotStarted | TaskStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "not_started" | "pending" | "todo" => Ok(TaskStatus::NotStarted),
            "in_progress" | "doing" => Ok(TaskStatus::InProgress),
            "done" | "completed" => Ok(TaskStatus::Done),
            "deleted" => Ok(TaskStatus::Deleted),
            other => Err(anyhow!("unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    /// Lenient parse used for stored/imported rule text.
    /// Anything unrecognised means "do not reschedule".
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "daily" => Some(Recurrence::Daily),
            "weekly" => Some(Recurrence::Weekly),
            "monthly" => Some(Recurrence::Monthly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Legal,
    Accounting,
    GeneralAffairs,
    Hr,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Legal => "legal",
            Category::Accounting => "accounting",
            Category::GeneralAffairs => "general_affairs",
            Category::Hr => "hr",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "legal" => Ok(Category::Legal),
            "accounting" => Ok(Category::Accounting),
            "general_affairs" => Ok(Category::GeneralAffairs),
            "hr" => Ok(Category::Hr),
            "other" => Ok(Category::Other),
            other => Err(anyhow!("unknown category: {other}")),
        }
    }
}

/// A task record as seen by the priority engine.
///
/// Preconditions (checked by [`crate::TaskBook`], never by the scoring curves):
/// - `importance` in 1..=5
/// - `estimated_minutes`, if present, > 0
/// - `depends_on` never points at the task itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner: String,
    pub title: String,

    /// Due instant (UTC).
    pub due: DateTime<Utc>,

    /// 1-5.
    pub importance: u8,

    /// Minutes.
    pub estimated_minutes: Option<u32>,
    pub actual_minutes: Option<u32>,

    /// At most one blocking task.
    pub depends_on: Option<TaskId>,
    pub parent_id: Option<TaskId>,

    pub category: Option<Category>,
    pub memo: Option<String>,
    pub recurrence: Option<Recurrence>,

    pub status: TaskStatus,

    /// Cached composite score. Advisory; recomputed on demand.
    pub priority_score: f64,
    pub today_focus: bool,
    pub today_focus_approved: bool,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        id: TaskId,
        owner: impl Into<String>,
        title: impl Into<String>,
        due: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner: owner.into(),
            title: title.into(),
            due,
            importance: 3,
            estimated_minutes: None,
            actual_minutes: None,
            depends_on: None,
            parent_id: None,
            category: None,
            memo: None,
            recurrence: None,
            status: TaskStatus::NotStarted,
            priority_score: 0.0,
            today_focus: false,
            today_focus_approved: false,
            created_at,
            completed_at: None,
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_deleted(&self) -> bool {
        self.status == TaskStatus::Deleted
    }
}

/// Caller-supplied attributes for a task that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub owner: String,
    pub title: String,
    pub due: DateTime<Utc>,
    pub importance: u8,
    pub estimated_minutes: Option<u32>,
    pub depends_on: Option<TaskId>,
    pub parent_id: Option<TaskId>,
    pub category: Option<Category>,
    pub memo: Option<String>,
    pub recurrence: Option<Recurrence>,
}

impl NewTask {
    pub fn new(owner: impl Into<String>, title: impl Into<String>, due: DateTime<Utc>) -> Self {
        Self {
            owner: owner.into(),
            title: title.into(),
            due,
            importance: 3,
            estimated_minutes: None,
            depends_on: None,
            parent_id: None,
            category: None,
            memo: None,
            recurrence: None,
        }
    }

    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_estimate(mut self, minutes: u32) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    pub fn with_blocker(mut self, blocker: TaskId) -> Self {
        self.depends_on = Some(blocker);
        self
    }

    pub fn with_parent(mut self, parent: TaskId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_recurrence(mut self, rule: Recurrence) -> Self {
        self.recurrence = Some(rule);
        self
    }
}

/// Partial update. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub due: Option<DateTime<Utc>>,
    pub importance: Option<u8>,
    pub estimated_minutes: Option<Option<u32>>,
    pub actual_minutes: Option<Option<u32>>,
    pub depends_on: Option<Option<TaskId>>,
    pub parent_id: Option<Option<TaskId>>,
    pub category: Option<Option<Category>>,
    pub memo: Option<Option<String>>,
    pub recurrence: Option<Option<Recurrence>>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}
