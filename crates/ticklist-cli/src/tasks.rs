use std::io::{self, Write};

use chrono::{Local, NaiveDate};
use color_eyre::Result;
use ticklist_core::{
    store::{Applied, TaskStore},
    tasks::{Task, TaskDraft, TaskPersistence},
};
use tracing::warn;

use crate::{cli::TaskCommand, config, storage};

/// Execute a task subcommand against the configured store.
pub fn handle(cmd: TaskCommand, config: &config::Config) -> Result<()> {
    let mut store = storage::open_task_store(config)?;
    if let Some(err) = store.load_warning() {
        eprintln!("warning: starting with an empty task list: {err}");
    }
    if !store.can_persist() {
        eprintln!("warning: changes will not be saved while stored tasks are unreadable");
    }
    store.set_filter(config.ui.default_filter);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cmd, &mut store, &mut out, Local::now().date_naive())
}

pub fn run<P: TaskPersistence>(
    cmd: TaskCommand,
    store: &mut TaskStore<P>,
    out: &mut impl Write,
    today: NaiveDate,
) -> Result<()> {
    match cmd {
        TaskCommand::List { filter, search } => {
            if let Some(filter) = filter {
                store.set_filter(filter);
            }
            if let Some(query) = search {
                store.set_search(&query);
            }
            let visible = store.visible();
            if store.tasks().is_empty() {
                writeln!(out, "No tasks yet. Add one with `ticklist task add <text>`.")?;
                return Ok(());
            }
            if visible.is_empty() {
                writeln!(out, "No tasks match the current filter.")?;
            }
            for task in visible {
                writeln!(out, "{}", task_line(task, today))?;
            }
            writeln!(out, "{}", store.stats())?;
        }
        TaskCommand::Add {
            text,
            priority,
            due,
            category,
        } => {
            let mut draft = TaskDraft::new(text.join(" "))
                .priority(priority)
                .due_date(due);
            draft.category = category;
            let applied = store.create(draft)?;
            writeln!(
                out,
                "Created task {}: {}",
                applied.value.id().short(),
                applied.value.text()
            )?;
            report(out, &applied)?;
        }
        TaskCommand::Toggle { id } => {
            let id = store.resolve_id(&id)?;
            let applied = store.toggle(&id)?;
            let state = if applied.value.completed() {
                "done"
            } else {
                "pending"
            };
            writeln!(out, "Marked {state}: {}", applied.value.text())?;
            report(out, &applied)?;
        }
        TaskCommand::Edit {
            id,
            text,
            priority,
            due,
            clear_due,
            category,
        } => {
            let id = store.resolve_id(&id)?;
            let current = store
                .get(&id)
                .ok_or_else(|| color_eyre::eyre::eyre!("task {id} disappeared"))?;
            let mut draft = TaskDraft::from_task(current);
            if let Some(text) = text {
                draft.text = text;
            }
            if let Some(priority) = priority {
                draft.priority = priority;
            }
            if due.is_some() || clear_due {
                draft.due_date = due;
            }
            if category.is_some() {
                draft.category = category;
            }
            let applied = store.edit(&id, draft)?;
            writeln!(
                out,
                "Updated task {}: {}",
                applied.value.id().short(),
                applied.value.text()
            )?;
            report(out, &applied)?;
        }
        TaskCommand::Delete { id } => {
            let id = store.resolve_id(&id)?;
            let applied = store.delete(&id)?;
            writeln!(
                out,
                "Deleted task {}: {}",
                applied.value.id().short(),
                applied.value.text()
            )?;
            report(out, &applied)?;
        }
        TaskCommand::Stats => {
            writeln!(out, "{}", store.stats())?;
        }
    }

    Ok(())
}

/// One-line rendering: `<short id> [x] text (priority, #category, due ..., overdue)`.
pub fn task_line(task: &Task, today: NaiveDate) -> String {
    let mark = if task.completed() { 'x' } else { ' ' };
    let mut details = vec![task.priority().to_string()];
    if let Some(category) = task.category() {
        details.push(format!("#{category}"));
    }
    if let Some(due) = task.due_date() {
        details.push(format!("due {due}"));
    }
    if task.is_overdue(today) {
        details.push("overdue".to_string());
    }
    format!(
        "{} [{mark}] {} ({})",
        task.id().short(),
        task.text(),
        details.join(", ")
    )
}

/// The change already happened in memory; tell the user it is not on disk.
fn report<T>(out: &mut impl Write, applied: &Applied<T>) -> Result<()> {
    if let Some(err) = &applied.persist_error {
        warn!(%err, "change kept in memory only");
        writeln!(out, "warning: change was not saved: {err}")?;
    }
    Ok(())
}
