use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use taskrank_core::{
    due_alert_in, parse_due, parse_minutes, parse_tasks_csv, Category, Clock, ListFilter, NewTask,
    Recurrence, SystemClock, Task, TaskBook, TaskId, TaskPatch, TaskStatus, to_rfc3339_utc,
};

use crate::config::Config;
use crate::state::{load_book, save_book};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task title (1-100 chars)
    pub title: String,

    /// Due date: RFC3339, "YYYY-MM-DD HH:MM" or "YYYY-MM-DD" (config timezone)
    #[arg(long)]
    pub due: String,

    /// Importance 1-5
    #[arg(long, default_value_t = 3)]
    pub importance: u8,

    /// Effort estimate: 45, 45m, 2h, 1h30m
    #[arg(long)]
    pub estimate: Option<String>,

    /// legal | accounting | general_affairs | hr | other
    #[arg(long)]
    pub category: Option<String>,

    /// daily | weekly | monthly
    #[arg(long)]
    pub recurrence: Option<String>,

    #[arg(long)]
    pub memo: Option<String>,

    /// Id of the task that must be done first
    #[arg(long)]
    pub blocked_by: Option<TaskId>,

    /// Parent task id (subtask)
    #[arg(long)]
    pub parent: Option<TaskId>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: TaskId,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub due: Option<String>,

    #[arg(long)]
    pub importance: Option<u8>,

    #[arg(long, conflicts_with = "clear_estimate")]
    pub estimate: Option<String>,

    #[arg(long, default_value_t = false)]
    pub clear_estimate: bool,

    /// Actual minutes spent
    #[arg(long)]
    pub actual: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// daily | weekly | monthly | none
    #[arg(long)]
    pub recurrence: Option<String>,

    #[arg(long)]
    pub memo: Option<String>,

    /// not_started | in_progress | done
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long, conflicts_with = "unblock")]
    pub blocked_by: Option<TaskId>,

    #[arg(long, default_value_t = false)]
    pub unblock: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// score | due | importance | created (default from config)
    #[arg(long)]
    pub sort: Option<String>,
}

pub fn add(cfg: &Config, args: AddArgs) -> Result<()> {
    let now = SystemClock.now();
    let mut book = load_book()?;

    let due = parse_due(&args.due, Some(&cfg.general.timezone))?;
    let mut draft = NewTask::new(&cfg.general.owner, args.title, due).with_importance(args.importance);
    if let Some(estimate) = args.estimate.as_deref() {
        draft = draft.with_estimate(parse_minutes(estimate)?);
    }
    if let Some(category) = args.category.as_deref() {
        draft = draft.with_category(category.parse()?);
    }
    if let Some(rule) = args.recurrence.as_deref() {
        draft = draft.with_recurrence(parse_rule(rule)?);
    }
    if let Some(memo) = args.memo {
        draft = draft.with_memo(memo);
    }
    if let Some(blocker) = args.blocked_by {
        draft = draft.with_blocker(blocker);
    }
    if let Some(parent) = args.parent {
        draft = draft.with_parent(parent);
    }

    let id = book.insert(draft, now)?;
    save_book(&book)?;

    if let Some(t) = book.get(id) {
        println!("Added {}", format_line(t));
    }
    Ok(())
}

pub fn list(cfg: &Config, args: ListArgs) -> Result<()> {
    let now = SystemClock.now();
    let mut book = load_book()?;

    let filter = ListFilter {
        status: args.status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
        category: args.category.as_deref().map(str::parse::<Category>).transpose()?,
    };
    let sort = match args.sort.as_deref() {
        Some(s) => s.parse()?,
        None => cfg.default_sort()?,
    };

    let tasks = book.list(&cfg.general.owner, filter, sort, now);
    save_book(&book)?;

    if tasks.is_empty() {
        println!("No tasks. Add one: taskrank add \"<title>\" --due <date>");
    }
    for t in &tasks {
        println!("{}", format_line(t));
    }
    println!("\n{} task(s), sorted by {}", tasks.len(), sort);

    if cfg.alerts.enabled {
        let tz = cfg.timezone()?;
        if let Some(alert) = due_alert_in(book.owner_tasks(&cfg.general.owner), now, &tz) {
            println!("\n! {}: {}", alert.title(), alert.body());
        }
    }
    Ok(())
}

pub fn show(cfg: &Config, id: TaskId) -> Result<()> {
    let now = SystemClock.now();
    let book = load_book()?;
    let task = visible(&book, cfg, id)?;
    let (b, level) = book.breakdown(id, now)?;

    println!("{}", format_line(task));
    println!("  status:      {}", task.status);
    println!("  due:         {}", to_rfc3339_utc(task.due));
    if let Some(done) = task.completed_at {
        println!("  completed:   {}", to_rfc3339_utc(done));
    }
    if let Some(c) = task.category {
        println!("  category:    {c}");
    }
    if let Some(r) = task.recurrence {
        println!("  recurrence:  {r}");
    }
    if let Some(dep) = task.depends_on {
        let state = if book.has_incomplete_blocker(task) { "open" } else { "clear" };
        println!("  blocked by:  #{dep} ({state})");
    }
    if let Some(parent) = task.parent_id {
        println!("  parent:      #{parent}");
    }
    if let Some(memo) = task.memo.as_deref() {
        println!("  memo:        {memo}");
    }
    println!("  focus:       {}{}", task.today_focus, if task.today_focus_approved { " (approved)" } else { "" });
    println!();
    println!("  urgency     {:>6.2}  x 0.40", b.urgency);
    println!("  importance  {:>6.2}  x 0.35", b.importance);
    println!("  duration    {:>6.2}  x 0.15", b.duration);
    println!("  dependency  {:>6.2}  x 0.10", b.dependency);
    println!("  total       {:>6.2}  [{level}]", b.total);
    Ok(())
}

pub fn update(cfg: &Config, args: UpdateArgs) -> Result<()> {
    let now = SystemClock.now();
    let mut book = load_book()?;
    visible(&book, cfg, args.id)?;

    let estimate = match (args.estimate.as_deref(), args.clear_estimate) {
        (Some(e), _) => Some(Some(parse_minutes(e)?)),
        (None, true) => Some(None),
        (None, false) => None,
    };
    let depends_on = match (args.blocked_by, args.unblock) {
        (Some(b), _) => Some(Some(b)),
        (None, true) => Some(None),
        (None, false) => None,
    };
    let recurrence = match args.recurrence.as_deref() {
        Some(r) if r.trim().eq_ignore_ascii_case("none") => Some(None),
        Some(r) => Some(Some(parse_rule(r)?)),
        None => None,
    };
    let status = args.status.as_deref().map(str::parse::<TaskStatus>).transpose()?;
    if status == Some(TaskStatus::Deleted) {
        bail!("use `taskrank delete {}` to delete a task", args.id);
    }

    let patch = TaskPatch {
        title: args.title,
        due: args
            .due
            .as_deref()
            .map(|d| parse_due(d, Some(&cfg.general.timezone)))
            .transpose()?,
        importance: args.importance,
        estimated_minutes: estimate,
        actual_minutes: args.actual.as_deref().map(parse_minutes).transpose()?.map(Some),
        depends_on,
        parent_id: None,
        category: args.category.as_deref().map(str::parse::<Category>).transpose()?.map(Some),
        memo: args.memo.map(Some),
        recurrence,
        status,
    };

    let next = book.update(args.id, patch, now)?;
    save_book(&book)?;

    if let Some(t) = book.get(args.id) {
        println!("Updated {}", format_line(t));
    }
    report_successor(&book, next);
    Ok(())
}

pub fn done(cfg: &Config, id: TaskId) -> Result<()> {
    let now = SystemClock.now();
    let mut book = load_book()?;
    visible(&book, cfg, id)?;

    let next = book.complete(id, now)?;
    save_book(&book)?;

    println!("Done #{id}");
    report_successor(&book, next);
    Ok(())
}

pub fn delete(cfg: &Config, id: TaskId) -> Result<()> {
    let now = SystemClock.now();
    let mut book = load_book()?;
    visible(&book, cfg, id)?;

    book.soft_delete(id, now)?;
    save_book(&book)?;
    println!("Deleted #{id}");
    Ok(())
}

pub fn import(cfg: &Config, csv: PathBuf) -> Result<()> {
    if !csv.exists() {
        bail!("CSV not found: {} (pass --csv <path>)", csv.display());
    }
    let now = SystemClock.now();
    let mut book = load_book()?;

    let drafts = parse_tasks_csv(&csv, &cfg.general.owner, Some(&cfg.general.timezone))
        .with_context(|| format!("parsing {}", csv.display()))?;

    let mut added = 0;
    for draft in drafts {
        let title = draft.title.clone();
        match book.insert(draft, now) {
            Ok(_) => added += 1,
            Err(e) => tracing::warn!(title = %title, error = %e, "skipping task"),
        }
    }
    save_book(&book)?;

    println!("Imported {added} task(s) from {}", csv.display());
    Ok(())
}

fn visible<'a>(book: &'a TaskBook, cfg: &Config, id: TaskId) -> Result<&'a Task> {
    book.get_visible(&cfg.general.owner, id)
        .with_context(|| format!("task not found: #{id}"))
}

fn parse_rule(text: &str) -> Result<Recurrence> {
    Recurrence::parse(text).with_context(|| format!("unknown recurrence: {text} (daily|weekly|monthly)"))
}

fn report_successor(book: &TaskBook, next: Option<TaskId>) {
    if let Some(t) = next.and_then(|id| book.get(id)) {
        println!("Next occurrence: {}", format_line(t));
    }
}

pub fn format_line(t: &Task) -> String {
    let estimate = t
        .estimated_minutes
        .map(|m| format!(" | {m}m"))
        .unwrap_or_default();
    let focus = if t.today_focus { " *" } else { "" };
    format!(
        "[{:<6}] {:>6.2} | #{} {} | due {} | imp {}{}{}",
        taskrank_core::priority_level(t.priority_score).as_str(),
        t.priority_score,
        t.id,
        t.title,
        t.due.format("%Y-%m-%d %H:%M UTC"),
        t.importance,
        estimate,
        focus,
    )
}
