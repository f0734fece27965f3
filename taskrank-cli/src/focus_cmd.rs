use anyhow::Result;
use taskrank_core::{approve_today_focus, select_today_focus, Clock, SystemClock};

use crate::config::Config;
use crate::state::{load_book, save_book};
use crate::task_cmd::format_line;

/// Pick today's focus set. The whole load-select-save runs on one in-memory
/// book, and the file is replaced in one rename.
pub fn focus(cfg: &Config) -> Result<()> {
    let now = SystemClock.now();
    let mut book = load_book()?;

    let today = select_today_focus(&mut book, &cfg.general.owner, now);
    save_book(&book)?;

    println!("# Today's focus ({})\n", today.date);
    if today.tasks.is_empty() {
        println!("Nothing open. Enjoy the day.");
        return Ok(());
    }
    for (i, t) in today.tasks.iter().enumerate() {
        println!("{}. {}", i + 1, format_line(t));
    }
    println!("\nApprove with: taskrank approve");
    Ok(())
}

pub fn approve(cfg: &Config) -> Result<()> {
    let mut book = load_book()?;
    let n = approve_today_focus(&mut book, &cfg.general.owner);
    save_book(&book)?;

    if n == 0 {
        println!("No focus tasks flagged. Run: taskrank focus");
    } else {
        println!("Approved {n} focus task(s)");
    }
    Ok(())
}
