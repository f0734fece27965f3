//! Today's focus: the top-scoring active tasks of one owner.
//!
//! `select_today_focus` is one unit of work: rescore every active task, rank,
//! clear every flag the owner has, flag the winners. It takes `&mut TaskBook`,
//! so nothing else can touch the book between the clear and the flag steps.
//! Callers sharing a book across threads must hold their lock for the whole
//! call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId};
use crate::task_book::TaskBook;

pub const FOCUS_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayFocus {
    /// Highest score first.
    pub tasks: Vec<Task>,
    /// UTC calendar date, `YYYY-MM-DD`.
    pub date: String,
}

impl TodayFocus {
    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id).collect()
    }
}

/// Rank `(id, score)` pairs: score descending, id ascending on ties.
pub fn rank(mut scored: Vec<(TaskId, f64)>) -> Vec<(TaskId, f64)> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored
}

/// Pick and flag the focus set for `owner` as of `now`.
pub fn select_today_focus(book: &mut TaskBook, owner: &str, now: DateTime<Utc>) -> TodayFocus {
    let scored = book.rescore_active(owner, now);
    let chosen: Vec<TaskId> = rank(scored)
        .into_iter()
        .take(FOCUS_SIZE)
        .map(|(id, _)| id)
        .collect();

    let owned: Vec<TaskId> = book.owner_tasks(owner).map(|t| t.id).collect();
    for id in owned {
        if let Some(t) = book.get_mut(id) {
            t.today_focus = false;
        }
    }
    for id in &chosen {
        if let Some(t) = book.get_mut(*id) {
            t.today_focus = true;
        }
    }

    tracing::debug!(owner, selected = ?chosen, "selected today focus");

    TodayFocus {
        tasks: chosen.iter().filter_map(|id| book.get(*id).cloned()).collect(),
        date: now.date_naive().format("%Y-%m-%d").to_string(),
    }
}

/// Approve every currently flagged task of `owner`. Returns how many were
/// flagged; a second call is a no-op on state.
pub fn approve_today_focus(book: &mut TaskBook, owner: &str) -> usize {
    let flagged: Vec<TaskId> = book
        .owner_tasks(owner)
        .filter(|t| t.today_focus)
        .map(|t| t.id)
        .collect();

    for id in &flagged {
        if let Some(t) = book.get_mut(*id) {
            t.today_focus_approved = true;
        }
    }
    flagged.len()
}
