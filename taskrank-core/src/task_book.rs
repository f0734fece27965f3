//! TaskBook — indexed, owner-scoped task storage.
//!
//! Purpose:
//! - Hold canonical Task copies keyed by id, so the blocker relation is a
//!   plain id lookup instead of object references.
//! - Validate caller preconditions once, at the boundary. The scoring curves
//!   never re-check them.
//! - Stay deterministic: ids are allocated monotonically, so id order is
//!   insertion order and doubles as the tie-break for equal keys.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::recurrence;
use crate::scoring::{calculate_priority_score_at, PriorityLevel, ScoreBreakdown};
use crate::task::{Category, NewTask, Task, TaskId, TaskPatch, TaskStatus};

pub const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Composite score, highest first.
    #[default]
    Score,
    /// Due instant, soonest first.
    Due,
    /// Importance, highest first.
    Importance,
    /// Creation, newest first.
    Created,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortKey::Score => "score",
            SortKey::Due => "due",
            SortKey::Importance => "importance",
            SortKey::Created => "created",
        };
        f.write_str(s)
    }
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "score" => Ok(SortKey::Score),
            "due" | "due_date" => Ok(SortKey::Due),
            "importance" => Ok(SortKey::Importance),
            "created" | "created_at" => Ok(SortKey::Created),
            other => bail!("unknown sort key: {other} (score|due|importance|created)"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<TaskStatus>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskBook {
    #[serde(default)]
    tasks: BTreeMap<TaskId, Task>,
    #[serde(default = "first_id")]
    next_id: TaskId,
}

fn first_id() -> TaskId {
    1
}

impl Default for TaskBook {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBook {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            next_id: first_id(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Any task, including soft-deleted ones.
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Owner-scoped lookup that hides soft-deleted tasks.
    pub fn get_visible(&self, owner: &str, id: TaskId) -> Option<&Task> {
        self.tasks
            .get(&id)
            .filter(|t| t.owner == owner && !t.is_deleted())
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    /// All of `owner`'s tasks in id order, deleted ones included.
    pub fn owner_tasks<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.values().filter(move |t| t.owner == owner)
    }

    /// `owner`'s not-done, not-deleted tasks in id order.
    pub fn active_tasks<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.owner_tasks(owner).filter(|t| t.is_active())
    }

    /// True when `task` names a blocker that exists and is not done.
    ///
    /// An id that does not resolve (or resolves to another owner's task) is
    /// treated as no blocker.
    pub fn has_incomplete_blocker(&self, task: &Task) -> bool {
        let Some(blocker_id) = task.depends_on else {
            return false;
        };

        match self.tasks.get(&blocker_id) {
            Some(blocker) if blocker.owner == task.owner => blocker.status != TaskStatus::Done,
            _ => {
                tracing::warn!(
                    task_id = task.id,
                    blocker_id,
                    "blocker does not resolve; scoring as unblocked"
                );
                false
            }
        }
    }

    /// Fresh breakdown for one task. Does not touch the cached score.
    pub fn breakdown(&self, id: TaskId, now: DateTime<Utc>) -> Result<(ScoreBreakdown, PriorityLevel)> {
        let Some(task) = self.tasks.get(&id) else {
            bail!("task not found: {id}");
        };
        let (_, breakdown) = self.score_of(task, now);
        Ok((breakdown, breakdown.level()))
    }

    /// Recompute and cache one task's score.
    pub fn rescore(&mut self, id: TaskId, now: DateTime<Utc>) -> Result<f64> {
        let Some(task) = self.tasks.get(&id) else {
            bail!("task not found: {id}");
        };
        let (total, _) = self.score_of(task, now);
        if let Some(t) = self.tasks.get_mut(&id) {
            t.priority_score = total;
        }
        Ok(total)
    }

    /// Recompute and cache the score of every active task of `owner`.
    /// Returns `(id, score)` in id order.
    pub fn rescore_active(&mut self, owner: &str, now: DateTime<Utc>) -> Vec<(TaskId, f64)> {
        let ids: Vec<TaskId> = self.active_tasks(owner).map(|t| t.id).collect();
        self.rescore_ids(&ids, now)
    }

    fn rescore_ids(&mut self, ids: &[TaskId], now: DateTime<Utc>) -> Vec<(TaskId, f64)> {
        // Score everything first so each lookup sees the same snapshot.
        let scored: Vec<(TaskId, f64)> = ids
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .map(|t| (t.id, self.score_of(t, now).0))
            .collect();

        for (id, total) in &scored {
            if let Some(t) = self.tasks.get_mut(id) {
                t.priority_score = *total;
            }
        }
        scored
    }

    fn score_of(&self, task: &Task, now: DateTime<Utc>) -> (f64, ScoreBreakdown) {
        calculate_priority_score_at(
            task.due,
            task.importance,
            task.estimated_minutes,
            self.has_incomplete_blocker(task),
            now,
        )
    }

    /// Validate, score and store a new task. Returns its id.
    pub fn insert(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<TaskId> {
        let title = validate_title(&new.title)?;
        validate_importance(new.importance)?;
        validate_estimate(new.estimated_minutes)?;
        if let Some(blocker) = new.depends_on {
            self.validate_reference(&new.owner, blocker, "blocking task")?;
        }
        if let Some(parent) = new.parent_id {
            self.validate_reference(&new.owner, parent, "parent task")?;
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut task = Task::new(id, new.owner, title, new.due, now);
        task.importance = new.importance;
        task.estimated_minutes = new.estimated_minutes;
        task.depends_on = new.depends_on;
        task.parent_id = new.parent_id;
        task.category = new.category;
        task.memo = new.memo;
        task.recurrence = new.recurrence;
        task.priority_score = self.score_of(&task, now).0;

        self.tasks.insert(id, task);
        Ok(id)
    }

    /// Apply a partial update to a visible task and rescore it.
    ///
    /// A transition into `Done` stamps `completed_at` and, for recurring
    /// tasks, spawns the next occurrence. Returns the successor's id.
    pub fn update(&mut self, id: TaskId, patch: TaskPatch, now: DateTime<Utc>) -> Result<Option<TaskId>> {
        let Some(current) = self.tasks.get(&id) else {
            bail!("task not found: {id}");
        };
        if current.is_deleted() {
            bail!("task not found: {id}");
        }
        let owner = current.owner.clone();
        let was_done = current.status == TaskStatus::Done;

        let title = patch.title.as_deref().map(validate_title).transpose()?;
        if let Some(importance) = patch.importance {
            validate_importance(importance)?;
        }
        if let Some(estimate) = patch.estimated_minutes {
            validate_estimate(estimate)?;
        }
        if let Some(Some(blocker)) = patch.depends_on {
            if blocker == id {
                bail!("a task cannot depend on itself");
            }
            self.validate_reference(&owner, blocker, "blocking task")?;
        }
        if let Some(Some(parent)) = patch.parent_id {
            if parent == id {
                bail!("a task cannot be its own parent");
            }
            self.validate_reference(&owner, parent, "parent task")?;
        }

        let mut task = current.clone();
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(due) = patch.due {
            task.due = due;
        }
        if let Some(importance) = patch.importance {
            task.importance = importance;
        }
        if let Some(estimate) = patch.estimated_minutes {
            task.estimated_minutes = estimate;
        }
        if let Some(actual) = patch.actual_minutes {
            task.actual_minutes = actual;
        }
        if let Some(blocker) = patch.depends_on {
            task.depends_on = blocker;
        }
        if let Some(parent) = patch.parent_id {
            task.parent_id = parent;
        }
        if let Some(category) = patch.category {
            task.category = category;
        }
        if let Some(memo) = patch.memo {
            task.memo = memo;
        }
        if let Some(rule) = patch.recurrence {
            task.recurrence = rule;
        }

        let mut completed_now = false;
        match patch.status {
            Some(TaskStatus::Deleted) => {
                task.status = TaskStatus::Deleted;
                task.deleted_at = Some(now);
            }
            Some(TaskStatus::Done) if !was_done => {
                task.status = TaskStatus::Done;
                task.completed_at = Some(now);
                completed_now = true;
            }
            Some(status) => task.status = status,
            None => {}
        }

        // Successor goes in before the task is committed: an Err leaves the
        // task unchanged.
        let next = if completed_now { recurrence::successor(&task) } else { None };
        let next_id = match next {
            Some(mut next) => {
                if let Some(parent) = next.parent_id {
                    if self.get_visible(&owner, parent).is_none() {
                        tracing::debug!(task_id = id, parent_id = parent, "parent gone, next occurrence is top level");
                        next.parent_id = None;
                    }
                }
                let next_id = self.insert(next, now)?;
                tracing::debug!(task_id = id, successor_id = next_id, "spawned next occurrence");
                Some(next_id)
            }
            None => None,
        };

        self.tasks.insert(id, task);
        self.rescore(id, now)?;
        Ok(next_id)
    }

    /// Mark done. Returns the id of the spawned occurrence, if any.
    pub fn complete(&mut self, id: TaskId, now: DateTime<Utc>) -> Result<Option<TaskId>> {
        self.update(id, TaskPatch::status(TaskStatus::Done), now)
    }

    /// Soft delete: the record stays, flagged and timestamped.
    pub fn soft_delete(&mut self, id: TaskId, now: DateTime<Utc>) -> Result<()> {
        self.update(id, TaskPatch::status(TaskStatus::Deleted), now)?;
        Ok(())
    }

    /// List `owner`'s visible tasks, rescoring each listed task first.
    ///
    /// Ties on the sort key fall back to id ascending.
    pub fn list(
        &mut self,
        owner: &str,
        filter: ListFilter,
        sort: SortKey,
        now: DateTime<Utc>,
    ) -> Vec<Task> {
        let ids: Vec<TaskId> = self
            .owner_tasks(owner)
            .filter(|t| !t.is_deleted())
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .filter(|t| filter.category.is_none_or(|c| t.category == Some(c)))
            .map(|t| t.id)
            .collect();

        self.rescore_ids(&ids, now);

        let mut out: Vec<Task> = ids
            .iter()
            .filter_map(|id| self.tasks.get(id).cloned())
            .collect();
        out.sort_by(|a, b| compare_by(sort, a, b));
        out
    }

    fn validate_reference(&self, owner: &str, id: TaskId, what: &str) -> Result<()> {
        match self.get_visible(owner, id) {
            Some(_) => Ok(()),
            None => bail!("{what} not found: {id}"),
        }
    }
}

fn compare_by(sort: SortKey, a: &Task, b: &Task) -> Ordering {
    let primary = match sort {
        SortKey::Score => b.priority_score.total_cmp(&a.priority_score),
        SortKey::Due => a.due.cmp(&b.due),
        SortKey::Importance => b.importance.cmp(&a.importance),
        SortKey::Created => return b.id.cmp(&a.id),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

fn validate_title(title: &str) -> Result<String> {
    let t = title.trim();
    if t.is_empty() {
        bail!("title must not be empty");
    }
    if t.chars().count() > MAX_TITLE_CHARS {
        bail!("title must be at most {MAX_TITLE_CHARS} characters");
    }
    Ok(t.to_string())
}

fn validate_importance(importance: u8) -> Result<()> {
    if !(1..=5).contains(&importance) {
        bail!("importance must be 1..=5 (got {importance})");
    }
    Ok(())
}

fn validate_estimate(minutes: Option<u32>) -> Result<()> {
    if minutes == Some(0) {
        bail!("estimated minutes must be positive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Recurrence;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn insert_allocates_ids_and_caches_score() {
        let now = now();
        let mut b = TaskBook::new();
        let a = b
            .insert(NewTask::new("ana", "  file report ", now + Duration::days(2)).with_importance(5).with_estimate(20), now)
            .unwrap();
        let c = b.insert(NewTask::new("ana", "later", now + Duration::days(30)), now).unwrap();

        assert_eq!((a, c), (1, 2));
        let t = b.get(a).unwrap();
        assert_eq!(t.title, "file report");
        assert!((t.priority_score - 90.5).abs() < 1e-9);
        assert_eq!(t.status, TaskStatus::NotStarted);
    }

    #[test]
    fn insert_rejects_precondition_violations() {
        let now = now();
        let mut b = TaskBook::new();
        assert!(b.insert(NewTask::new("ana", "x", now).with_importance(0), now).is_err());
        assert!(b.insert(NewTask::new("ana", "x", now).with_importance(6), now).is_err());
        assert!(b.insert(NewTask::new("ana", "x", now).with_estimate(0), now).is_err());
        assert!(b.insert(NewTask::new("ana", "   ", now), now).is_err());
        assert!(b.insert(NewTask::new("ana", "x".repeat(101), now), now).is_err());
        assert!(b.insert(NewTask::new("ana", "x", now).with_blocker(42), now).is_err());
        assert!(b.is_empty());
    }

    #[test]
    fn blocker_must_belong_to_same_owner() {
        let now = now();
        let mut b = TaskBook::new();
        let other = b.insert(NewTask::new("bo", "theirs", now), now).unwrap();
        let err = b
            .insert(NewTask::new("ana", "mine", now).with_blocker(other), now)
            .unwrap_err();
        assert!(err.to_string().contains("blocking task not found"));
    }

    #[test]
    fn incomplete_blocker_suppresses_score_until_done() {
        let now = now();
        let mut b = TaskBook::new();
        let blocker = b.insert(NewTask::new("ana", "draft", now + Duration::days(1)), now).unwrap();
        let blocked = b
            .insert(NewTask::new("ana", "review", now + Duration::days(1)).with_blocker(blocker), now)
            .unwrap();

        let (before, _) = b.breakdown(blocked, now).unwrap();
        assert_eq!(before.dependency, 10.0);

        b.complete(blocker, now).unwrap();
        let (after, _) = b.breakdown(blocked, now).unwrap();
        assert_eq!(after.dependency, 100.0);
        assert!((after.total - before.total - 9.0).abs() < 1e-9);
    }

    #[test]
    fn dangling_blocker_fails_open() {
        let now = now();
        let b = TaskBook::new();
        let mut t = Task::new(9, "ana", "orphan", now, now);
        t.depends_on = Some(1234);
        assert!(!b.has_incomplete_blocker(&t));
    }

    #[test]
    fn soft_deleted_blocker_still_blocks() {
        let now = now();
        let due = now + Duration::days(6);
        let mut b = TaskBook::new();
        let blocker = b.insert(NewTask::new("ana", "license", due), now).unwrap();
        let id = b.insert(NewTask::new("ana", "permit", due).with_blocker(blocker), now).unwrap();
        b.soft_delete(blocker, now).unwrap();

        assert!(b.has_incomplete_blocker(b.get(id).unwrap()));
        let (breakdown, _) = b.breakdown(id, now).unwrap();
        assert!((breakdown.dependency - 10.0).abs() < 1e-9);
    }

    #[test]
    fn update_rejects_self_dependency() {
        let now = now();
        let mut b = TaskBook::new();
        let id = b.insert(NewTask::new("ana", "x", now), now).unwrap();
        let patch = TaskPatch {
            depends_on: Some(Some(id)),
            ..TaskPatch::default()
        };
        assert!(b.update(id, patch, now).is_err());
    }

    #[test]
    fn completing_recurring_task_spawns_successor_once() {
        let now = now();
        let due = Utc.with_ymd_and_hms(2026, 1, 31, 18, 0, 0).unwrap();
        let mut b = TaskBook::new();
        let id = b
            .insert(
                NewTask::new("ana", "close books", due)
                    .with_importance(4)
                    .with_category(Category::Accounting)
                    .with_recurrence(Recurrence::Monthly),
                now,
            )
            .unwrap();

        let next = b.complete(id, now).unwrap().expect("successor");
        let done = b.get(id).unwrap();
        assert_eq!(done.status, TaskStatus::Done);
        assert_eq!(done.completed_at, Some(now));

        let succ = b.get(next).unwrap();
        assert_eq!(succ.due, Utc.with_ymd_and_hms(2026, 2, 28, 18, 0, 0).unwrap());
        assert_eq!(succ.status, TaskStatus::NotStarted);
        assert_eq!(succ.category, Some(Category::Accounting));
        assert_eq!(succ.completed_at, None);
        assert!(succ.priority_score > 0.0);

        // Completing again is not a transition.
        assert_eq!(b.complete(id, now).unwrap(), None);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn completing_recurring_subtask_with_deleted_parent_rolls_forward() {
        let now = now();
        let due = now + Duration::days(1);
        let mut b = TaskBook::new();
        let parent = b.insert(NewTask::new("ana", "close books", due), now).unwrap();
        let child = b
            .insert(
                NewTask::new("ana", "reconcile bank", due)
                    .with_parent(parent)
                    .with_recurrence(Recurrence::Weekly),
                now,
            )
            .unwrap();
        b.soft_delete(parent, now).unwrap();

        let next = b.complete(child, now).unwrap().expect("weekly task rolls forward");
        let t = b.get(next).unwrap();
        assert_eq!(t.parent_id, None);
        assert_eq!(t.due, due + Duration::days(7));
        assert_eq!(b.len(), 3);
        assert_eq!(b.get(child).unwrap().status, TaskStatus::Done);
        assert_eq!(b.complete(child, now).unwrap(), None);
    }

    #[test]
    fn recurring_subtask_keeps_live_parent() {
        let now = now();
        let due = now + Duration::days(1);
        let mut b = TaskBook::new();
        let parent = b.insert(NewTask::new("ana", "close books", due), now).unwrap();
        let child = b
            .insert(NewTask::new("ana", "reconcile bank", due).with_parent(parent).with_recurrence(Recurrence::Daily), now)
            .unwrap();

        let next = b.complete(child, now).unwrap().unwrap();
        assert_eq!(b.get(next).unwrap().parent_id, Some(parent));
    }

    #[test]
    fn failed_update_leaves_task_untouched() {
        let now = now();
        let mut b = TaskBook::new();
        let id = b.insert(NewTask::new("ana", "x", now + Duration::days(3)), now).unwrap();
        let before = b.get(id).unwrap().clone();
        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            depends_on: Some(Some(999)),
            ..TaskPatch::default()
        };

        assert!(b.update(id, patch, now).is_err());
        assert_eq!(b.get(id).unwrap(), &before);
    }

    #[test]
    fn soft_deleted_tasks_are_hidden() {
        let now = now();
        let mut b = TaskBook::new();
        let id = b.insert(NewTask::new("ana", "x", now), now).unwrap();
        b.soft_delete(id, now).unwrap();

        assert!(b.get_visible("ana", id).is_none());
        assert_eq!(b.get(id).unwrap().deleted_at, Some(now));
        assert!(b.list("ana", ListFilter::default(), SortKey::Score, now).is_empty());
        assert!(b.soft_delete(id, now).is_err());
    }

    #[test]
    fn list_sorts_with_id_tie_break() {
        let now = now();
        let due = now + Duration::days(5);
        let mut b = TaskBook::new();
        let a = b.insert(NewTask::new("ana", "a", due).with_importance(2), now).unwrap();
        let c = b.insert(NewTask::new("ana", "b", due).with_importance(4), now).unwrap();
        let d = b.insert(NewTask::new("ana", "c", due).with_importance(2), now).unwrap();
        b.insert(NewTask::new("bo", "not mine", due), now).unwrap();

        let ids = |v: Vec<Task>| v.into_iter().map(|t| t.id).collect::<Vec<_>>();

        assert_eq!(ids(b.list("ana", ListFilter::default(), SortKey::Score, now)), vec![c, a, d]);
        assert_eq!(ids(b.list("ana", ListFilter::default(), SortKey::Due, now)), vec![a, c, d]);
        assert_eq!(ids(b.list("ana", ListFilter::default(), SortKey::Created, now)), vec![d, c, a]);
    }

    #[test]
    fn list_filters_by_status_and_category() {
        let now = now();
        let mut b = TaskBook::new();
        let legal = b
            .insert(NewTask::new("ana", "contract", now).with_category(Category::Legal), now)
            .unwrap();
        let hr = b
            .insert(NewTask::new("ana", "onboarding", now).with_category(Category::Hr), now)
            .unwrap();
        b.complete(hr, now).unwrap();

        let only_legal = b.list(
            "ana",
            ListFilter { category: Some(Category::Legal), ..ListFilter::default() },
            SortKey::Score,
            now,
        );
        assert_eq!(only_legal.len(), 1);
        assert_eq!(only_legal[0].id, legal);

        let done = b.list(
            "ana",
            ListFilter { status: Some(TaskStatus::Done), ..ListFilter::default() },
            SortKey::Score,
            now,
        );
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, hr);
    }

    #[test]
    fn sort_key_parses() {
        assert_eq!("due_date".parse::<SortKey>().unwrap(), SortKey::Due);
        assert!("random".parse::<SortKey>().is_err());
    }

    #[test]
    fn book_round_trips_through_json() {
        let now = now();
        let mut b = TaskBook::new();
        b.insert(NewTask::new("ana", "x", now), now).unwrap();
        let json = serde_json::to_string(&b).unwrap();
        let mut back: TaskBook = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.insert(NewTask::new("ana", "y", now), now).unwrap(), 2);
    }
}
