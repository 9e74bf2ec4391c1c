//! # Example: abort_with_timeout
//!
//! The engine has no implicit timeout. This example composes one by aborting
//! the call after a delay, and shows the abort cleanup releasing a resource.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► call("slow-report")           handler waits 5s, registers on_abort cleanup
//!   ├─► sleep 200ms
//!   ├─► task.abort()
//!   │     ├─► cleanup: "released report connection"
//!   │     └─► [after] slow-report state=aborted
//!   └─► await → ActionError::Aborted
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example abort_with_timeout
//! ```

use std::time::Duration;

use actionvisor::{AbortToken, ActionEngine, ActionError, ActionOptions, BoxError, Mutator, SharedState};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default)]
struct Report {
    rows: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== abort_with_timeout example ===\n");

    let state = SharedState::arc(Report::default());
    let engine = ActionEngine::new(state.clone());

    engine.define_fn(
        "slow-report",
        |rows: usize, mutate: Mutator<Report>, token: AbortToken| async move {
            println!("[handler] opening report connection");
            token.on_abort(|| println!("[cleanup] released report connection"));

            tokio::time::sleep(Duration::from_secs(5)).await;
            mutate.mutate(|r| r.rows = rows);
            Ok::<_, BoxError>(rows)
        },
        ActionOptions::default(),
    );
    engine.on_after_action("slow-report", |ev| {
        println!("[after] {} state={}", ev.name, ev.state.as_label());
    });

    let task = engine.call::<usize, usize>("slow-report", 1_000);

    // Timeout composed by the caller.
    tokio::time::sleep(Duration::from_millis(200)).await;
    task.abort();

    match task.await {
        Ok(rows) => println!("report finished with {rows} rows"),
        Err(ActionError::Aborted { name }) => println!("'{name}' timed out and was aborted"),
        Err(err) => return Err(err.into()),
    }

    println!("rows = {}", state.get().rows);
    println!("has_action_run = {}", engine.has_action_run("slow-report"));
    Ok(())
}
