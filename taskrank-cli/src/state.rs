use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use taskrank_core::TaskBook;

pub fn taskrank_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TASKRANK_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".taskrank"))
}

pub fn ensure_taskrank_home() -> Result<PathBuf> {
    let dir = taskrank_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn book_path() -> Result<PathBuf> {
    Ok(ensure_taskrank_home()?.join("tasks.json"))
}

pub fn load_book() -> Result<TaskBook> {
    let p = book_path()?;
    if !p.exists() {
        return Ok(TaskBook::new());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

/// Written to a sibling temp file, then renamed into place.
pub fn save_book(book: &TaskBook) -> Result<()> {
    let p = book_path()?;
    let tmp = p.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(book).context("serialize task book")?;
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, &p).with_context(|| format!("replace {}", p.display()))?;
    Ok(())
}
