//! `thinksuit run` — schedule a single turn and print its response.

use std::io::Read;

use thinksuit_engine::{ScheduleRequest, Scheduler};
use thinksuit_journal::build_thread;

pub async fn run(scheduler: &Scheduler, input: Option<String>, session: Option<String>, json_output: bool) -> anyhow::Result<()> {
    let input = match input {
        Some(input) => input,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf.trim_end().to_string()
        }
    };

    let req = ScheduleRequest {
        input,
        session_id: session,
        source_session_id: None,
        fork_from_index: None,
        selected_plan: None,
    };

    let scheduled = scheduler.schedule(req).map_err(|e| anyhow::anyhow!(e))?;
    if !scheduled.scheduled {
        eprintln!("not scheduled: {}", scheduled.reason.as_deref().unwrap_or("unknown"));
        std::process::exit(1);
    }

    let session_id = scheduled.session_id.clone();
    scheduled.join().await.map_err(|e| anyhow::anyhow!(e))?;

    let entries = scheduler.get_session(&session_id).map_err(|e| anyhow::anyhow!(e))?;
    let status = scheduler.get_session_status(&session_id).map_err(|e| anyhow::anyhow!(e))?;

    if json_output {
        let body = serde_json::json!({
            "sessionId": session_id,
            "status": format!("{status:?}"),
            "entries": entries,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let thread = build_thread(&entries);
    match thread.messages().last() {
        Some(message) => println!("{}", message.content),
        None => {
            eprintln!("turn produced no response");
            std::process::exit(1);
        }
    }

    Ok(())
}
