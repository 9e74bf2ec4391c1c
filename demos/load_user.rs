//! # Example: load_user
//!
//! Defines a `load-user-info` action, attaches lifecycle triggers, and calls it.
//!
//! Shows how to:
//! - Register a closure handler that mutates shared state
//! - Observe before/success/error/after triggers
//! - Read run bookkeeping after the call
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► define("load-user-info")
//!   ├─► on_before_action / on_action_success / on_after_action
//!   ├─► call("load-user-info")
//!   │     ├─► [before]  load-user-info #1
//!   │     ├─► handler sleeps 300ms, writes Jane Doe (32)
//!   │     ├─► [success] load-user-info #1
//!   │     └─► [after]   load-user-info #1
//!   └─► print state + has_action_run
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=actionvisor=debug cargo run --example load_user
//! ```

use std::time::Duration;

use actionvisor::{AbortToken, ActionEngine, ActionOptions, BoxError, Mutator, SharedState};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default)]
struct UserInfo {
    first_name: String,
    last_name: String,
    age: u32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== load_user example ===\n");

    // 1. Host state + engine
    let state = SharedState::arc(UserInfo::default());
    let engine = ActionEngine::new(state.clone());

    // 2. Action
    engine.define_fn(
        "load-user-info",
        |(): (), mutate: Mutator<UserInfo>, _token: AbortToken| async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            mutate.mutate(|u| {
                u.first_name = "Jane".into();
                u.last_name = "Doe".into();
                u.age = 32;
            });
            Ok::<_, BoxError>(())
        },
        ActionOptions::default(),
    );

    // 3. Triggers
    engine.on_before_action("load-user-info", |ev| {
        println!("[before]  {} #{}", ev.name, ev.invocation);
    });
    engine.on_action_success("load-user-info", |ev| {
        println!("[success] {} #{} in {:?}", ev.name, ev.invocation, ev.elapsed);
    });
    engine.on_action_error("load-user-info", |ev| {
        println!("[error]   {} #{} err={:?}", ev.name, ev.invocation, ev.error);
    });
    engine.on_after_action("load-user-info", |ev| {
        println!("[after]   {} #{} state={}", ev.name, ev.invocation, ev.state.as_label());
    });

    // 4. Call
    engine.call::<(), ()>("load-user-info", ()).await?;

    println!("\nstate = {:?}", state.get());
    println!("has_action_run = {}", engine.has_action_run("load-user-info"));
    Ok(())
}
