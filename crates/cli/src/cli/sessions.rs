//! `thinksuit sessions list` / `thinksuit sessions show` — read-only
//! inspection over the scheduler's session store.

use thinksuit_engine::Scheduler;
use thinksuit_journal::build_thread;

pub fn list(scheduler: &Scheduler) -> anyhow::Result<()> {
    let sessions = scheduler.list_sessions().map_err(|e| anyhow::anyhow!(e))?;
    if sessions.is_empty() {
        println!("no sessions");
        return Ok(());
    }
    for session_id in sessions {
        let status = scheduler.get_session_status(&session_id).map_err(|e| anyhow::anyhow!(e))?;
        println!("{session_id}  {status:?}");
    }
    Ok(())
}

pub fn show(scheduler: &Scheduler, session_id: &str, json_output: bool) -> anyhow::Result<()> {
    let entries = scheduler.get_session(session_id).map_err(|e| anyhow::anyhow!(e))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let status = scheduler.get_session_status(session_id).map_err(|e| anyhow::anyhow!(e))?;
    let metadata = scheduler.get_session_metadata(session_id).map_err(|e| anyhow::anyhow!(e))?;
    let forks = scheduler.get_session_forks(session_id).map_err(|e| anyhow::anyhow!(e))?;

    println!("session {session_id}");
    println!("status: {status:?}");
    if let Some(parent) = &metadata.parent {
        println!("forked from: {parent} at index {}", metadata.forked_at_index.unwrap_or(0));
    }
    if !forks.is_empty() {
        println!("forks: {}", forks.join(", "));
    }

    println!();
    let thread = build_thread(&entries);
    for message in thread.messages() {
        println!("{:?}: {}", message.role, message.content);
    }

    Ok(())
}
