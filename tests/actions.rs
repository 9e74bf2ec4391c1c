mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use actionvisor::{
    AbortToken, ActionEngine, ActionError, ActionOptions, BoxError, ConcurrencyPolicy, Mutator,
    SharedState,
};
use common::{define_load_user_info, define_sleeper, engine, Counter, UserInfo, LOAD_USER_INFO};
use parking_lot::Mutex;

/// Ordered log shared between handlers, cleanups and triggers.
#[derive(Clone, Default)]
struct Log(Arc<Mutex<Vec<&'static str>>>);

impl Log {
    fn push(&self, entry: &'static str) {
        self.0.lock().push(entry);
    }

    fn entries(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }
}

#[tokio::test(start_paused = true)]
async fn load_user_info_populates_state() {
    let (engine, state) = engine();
    define_load_user_info(&engine);

    assert!(!engine.has_action_run(LOAD_USER_INFO));
    engine
        .call::<(), ()>(LOAD_USER_INFO, ())
        .await
        .expect("load-user-info should resolve");

    assert_eq!(
        state.get(),
        UserInfo {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            age: 32,
        }
    );
    assert!(engine.has_action_run(LOAD_USER_INFO));
    assert!(!engine.is_action_running(LOAD_USER_INFO));
    assert!(!engine.has_action_failed(LOAD_USER_INFO));
}

#[tokio::test(start_paused = true)]
async fn abort_before_resolution_leaves_state_untouched() {
    let (engine, state) = engine();
    define_load_user_info(&engine);

    let task = engine.call::<(), ()>(LOAD_USER_INFO, ());
    assert!(engine.is_action_running(LOAD_USER_INFO));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(task.abort());

    let err = task.await.unwrap_err();
    assert!(err.is_abort(), "expected abort, got {err:?}");
    assert!(matches!(err, ActionError::Aborted { .. }));

    // Well past the handler's 300ms: nothing resolves late.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(state.get(), UserInfo::default());
    assert!(!engine.has_action_run(LOAD_USER_INFO));
    assert!(!engine.is_action_running(LOAD_USER_INFO));
    assert!(!engine.has_action_failed(LOAD_USER_INFO));
}

#[tokio::test(start_paused = true)]
async fn abort_does_not_clear_previous_success() {
    let (engine, _state) = engine();
    define_load_user_info(&engine);

    engine.call::<(), ()>(LOAD_USER_INFO, ()).await.unwrap();
    let task = engine.call::<(), ()>(LOAD_USER_INFO, ());
    task.abort();
    assert!(task.await.unwrap_err().is_abort());
    assert!(engine.has_action_run(LOAD_USER_INFO));
}

#[tokio::test(start_paused = true)]
async fn failing_action_records_error() {
    let (engine, _state) = engine();
    engine.define_fn(
        "explode",
        |(): (), _m: Mutator<UserInfo>, _t: AbortToken| async move {
            Err::<(), BoxError>("failed".into())
        },
        ActionOptions::default(),
    );

    let before = SystemTime::now();
    let err = engine.call::<(), ()>("explode", ()).await.unwrap_err();
    assert!(matches!(err, ActionError::Failed { .. }));
    assert_eq!(err.handler_error().unwrap().to_string(), "failed");

    assert!(engine.has_action_failed("explode"));
    assert!(!engine.has_action_run("explode"));
    let errors = engine.get_action_errors("explode");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error.to_string(), "failed");
    assert_eq!(&*errors[0].name, "explode");
    assert!(errors[0].timestamp >= before);
}

#[tokio::test(start_paused = true)]
async fn panicking_handler_is_recorded_as_failure() {
    let (engine, _state) = engine();
    engine.define_fn(
        "panics",
        |(): (), _m: Mutator<UserInfo>, _t: AbortToken| async move {
            if true {
                panic!("handler boom");
            }
            Ok::<(), BoxError>(())
        },
        ActionOptions::default(),
    );

    let err = engine.call::<(), ()>("panics", ()).await.unwrap_err();
    assert_eq!(
        err.handler_error().unwrap().to_string(),
        "handler panicked: handler boom"
    );
    assert!(engine.has_action_failed("panics"));
    assert!(!engine.is_action_running("panics"));

    // The slot was released: the exclusive action can run again.
    assert!(engine.call::<(), ()>("panics", ()).await.is_err());
    assert_eq!(engine.get_action_errors("panics").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn exclusive_second_call_is_rejected_without_running() {
    let (engine, _state) = engine();
    let runs = define_sleeper(&engine, "sync", ActionOptions::default());

    let first = engine.call::<_, ()>("sync", (Duration::from_millis(50), false));
    let second = engine.call::<_, ()>("sync", (Duration::from_millis(50), false));
    assert!(second.is_rejected());
    assert_eq!(engine.running_count("sync"), 1);

    let err = second.await.unwrap_err();
    assert!(err.is_concurrency());

    first.await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(engine.running_count("sync"), 0);
    assert!(!engine.has_action_failed("sync"));

    // Idle again: admitted.
    engine
        .call::<_, ()>("sync", (Duration::from_millis(1), false))
        .await
        .unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn try_call_reports_rejection_synchronously() {
    let (engine, _state) = engine();
    define_sleeper(&engine, "sync", ActionOptions::default());

    let first = engine
        .try_call::<_, ()>("sync", (Duration::from_millis(50), false))
        .unwrap();
    let err = engine
        .try_call::<_, ()>("sync", (Duration::from_millis(50), false))
        .unwrap_err();
    assert_eq!(err.as_label(), "action_concurrency");
    first.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn parallel_calls_run_independently() {
    let (engine, _state) = engine();
    let runs = define_sleeper(&engine, "fetch", ActionOptions::parallel());

    let slow = engine.call::<_, ()>("fetch", (Duration::from_millis(200), false));
    let fast = engine.call::<_, ()>("fetch", (Duration::from_millis(50), false));
    assert_eq!(engine.running_count("fetch"), 2);

    fast.await.unwrap();
    assert_eq!(engine.running_count("fetch"), 1);
    slow.await.unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(engine.running_count("fetch"), 0);
    assert!(engine.has_action_run("fetch"));
}

#[tokio::test(start_paused = true)]
async fn default_policy_comes_from_config() {
    let state = SharedState::arc(UserInfo::default());
    let engine: ActionEngine<UserInfo> = ActionEngine::builder(state)
        .with_default_policy(ConcurrencyPolicy::Parallel)
        .build();
    define_sleeper(&engine, "fetch", ActionOptions::default());
    define_sleeper(&engine, "sync", ActionOptions::exclusive());

    assert_eq!(engine.policy("fetch"), Some(ConcurrencyPolicy::Parallel));
    assert_eq!(engine.policy("sync"), Some(ConcurrencyPolicy::Exclusive));

    let a = engine.call::<_, ()>("fetch", (Duration::from_millis(10), false));
    let b = engine.call::<_, ()>("fetch", (Duration::from_millis(10), false));
    assert!(!b.is_rejected());
    a.await.unwrap();
    b.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unknown_action_is_rejected() {
    let (engine, _state) = engine();
    let err = engine.call::<(), ()>("missing", ()).await.unwrap_err();
    assert!(matches!(err, ActionError::UnknownAction { .. }));
    assert_eq!(err.action(), "missing");
    assert!(!engine.has_action_failed("missing"));
    assert!(!engine.is_defined("missing"));
}

#[tokio::test(start_paused = true)]
async fn signature_mismatch_is_rejected_before_running() {
    let (engine, _state) = engine();
    let runs = define_sleeper(&engine, "sync", ActionOptions::default());

    let err = engine.call::<u8, ()>("sync", 3).await.unwrap_err();
    assert!(matches!(err, ActionError::SignatureMismatch { .. }));
    let err = engine
        .call::<_, String>("sync", (Duration::from_millis(1), false))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::SignatureMismatch { .. }));

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(!engine.is_action_running("sync"));
}

#[tokio::test(start_paused = true)]
async fn reset_clears_history_for_all_actions() {
    let (engine, _state) = engine();
    define_sleeper(&engine, "ok", ActionOptions::default());
    define_sleeper(&engine, "bad", ActionOptions::default());

    engine
        .call::<_, ()>("ok", (Duration::from_millis(1), false))
        .await
        .unwrap();
    let _ = engine
        .call::<_, ()>("bad", (Duration::from_millis(1), true))
        .await;
    assert!(engine.has_action_run("ok"));
    assert!(engine.has_action_failed("bad"));

    engine.reset_action_state();
    assert!(!engine.has_action_run("ok"));
    assert!(!engine.has_action_failed("bad"));
    assert!(engine.get_action_errors("bad").is_empty());
}

#[tokio::test(start_paused = true)]
async fn reset_does_not_touch_in_flight_invocations() {
    let (engine, _state) = engine();
    define_sleeper(&engine, "sync", ActionOptions::default());

    engine
        .call::<_, ()>("sync", (Duration::from_millis(1), false))
        .await
        .unwrap();
    let task = engine.call::<_, ()>("sync", (Duration::from_millis(100), false));

    engine.reset_action_state();
    assert!(!engine.has_action_run("sync"));
    assert!(engine.is_action_running("sync"));
    // Still exclusive while in flight.
    assert!(engine
        .try_call::<_, ()>("sync", (Duration::from_millis(1), false))
        .is_err());

    task.await.unwrap();
    // The in-flight success lands after the reset.
    assert!(engine.has_action_run("sync"));
}

#[tokio::test(start_paused = true)]
async fn scoped_reset_only_clears_one_action() {
    let (engine, _state) = engine();
    define_sleeper(&engine, "a", ActionOptions::default());
    define_sleeper(&engine, "b", ActionOptions::default());
    for name in ["a", "b"] {
        engine
            .call::<_, ()>(name, (Duration::from_millis(1), false))
            .await
            .unwrap();
    }

    engine.reset_action("a");
    assert!(!engine.has_action_run("a"));
    assert!(engine.has_action_run("b"));
}

#[tokio::test(start_paused = true)]
async fn redefine_keeps_bookkeeping() {
    let (engine, _state) = engine();
    define_sleeper(&engine, "job", ActionOptions::default());
    engine
        .call::<_, ()>("job", (Duration::from_millis(1), false))
        .await
        .unwrap();

    engine.define_fn(
        "job",
        |n: u32, _m: Mutator<UserInfo>, _t: AbortToken| async move { Ok::<_, BoxError>(n + 1) },
        ActionOptions::parallel(),
    );
    assert!(engine.has_action_run("job"));
    assert_eq!(engine.call::<u32, u32>("job", 41).await.unwrap(), 42);
    assert_eq!(engine.action_names(), vec!["job".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn abort_cleanups_run_before_settlement_in_order() {
    let (engine, _state) = engine();
    let log = Log::default();
    let handler_log = log.clone();
    engine.define_fn(
        "stream",
        move |(): (), _m: Mutator<UserInfo>, token: AbortToken| {
            let log = handler_log.clone();
            async move {
                let first = log.clone();
                token.on_abort(move || first.push("cleanup-1"));
                let second = log.clone();
                token.on_abort(move || second.push("cleanup-2"));
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, BoxError>(())
            }
        },
        ActionOptions::default(),
    );
    let after_log = log.clone();
    let _after = engine.on_after_action("stream", move |_ev| after_log.push("after"));

    let task = engine.call::<(), ()>("stream", ());
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(task.abort());
    // Cleanups ran synchronously inside abort().
    assert_eq!(log.entries(), vec!["cleanup-1", "cleanup-2"]);
    assert!(!task.abort());

    assert!(task.await.unwrap_err().is_abort());
    assert_eq!(log.entries(), vec!["cleanup-1", "cleanup-2", "after"]);
}

#[tokio::test(start_paused = true)]
async fn abort_after_settlement_is_noop() {
    let (engine, _state) = engine();
    let log = Log::default();
    let handler_log = log.clone();
    engine.define_fn(
        "quick",
        move |(): (), _m: Mutator<UserInfo>, token: AbortToken| {
            let log = handler_log.clone();
            async move {
                token.on_abort(move || log.push("cleanup"));
                Ok::<_, BoxError>(7u8)
            }
        },
        ActionOptions::default(),
    );

    let task = engine.call::<(), u8>("quick", ());
    let token = task.token().cloned().unwrap();
    assert_eq!(task.await.unwrap(), 7);

    assert!(!token.abort());
    assert!(token.is_settled());
    assert!(log.entries().is_empty());
    assert!(engine.has_action_run("quick"));
}

#[tokio::test(start_paused = true)]
async fn handler_can_observe_abort_cooperatively() {
    let (engine, _state) = engine();
    let log = Log::default();
    let handler_log = log.clone();
    engine.define_fn(
        "poll",
        move |(): (), _m: Mutator<UserInfo>, token: AbortToken| {
            let log = handler_log.clone();
            async move {
                let child = token.cancellation_token();
                tokio::spawn(async move {
                    child.cancelled().await;
                    log.push("child-cancelled");
                });
                token.aborted().await;
                Ok::<_, BoxError>(())
            }
        },
        ActionOptions::default(),
    );

    let task = engine.call::<(), ()>("poll", ());
    tokio::time::sleep(Duration::from_millis(5)).await;
    task.abort();
    assert!(task.await.unwrap_err().is_abort());
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(log.entries(), vec!["child-cancelled"]);
}

#[tokio::test(start_paused = true)]
async fn dropped_task_still_settles() {
    let (engine, state) = engine();
    define_load_user_info(&engine);

    drop(engine.call::<(), ()>(LOAD_USER_INFO, ()));
    assert!(engine.is_action_running(LOAD_USER_INFO));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!engine.is_action_running(LOAD_USER_INFO));
    assert!(engine.has_action_run(LOAD_USER_INFO));
    assert_eq!(state.get().age, 32);
}

#[tokio::test(start_paused = true)]
async fn engines_do_not_share_state() {
    let (first, _s1) = engine();
    let (second, _s2) = engine();
    define_sleeper(&first, "job", ActionOptions::default());
    define_sleeper(&second, "job", ActionOptions::default());

    first
        .call::<_, ()>("job", (Duration::from_millis(1), false))
        .await
        .unwrap();
    assert!(first.has_action_run("job"));
    assert!(!second.has_action_run("job"));
}

#[tokio::test(start_paused = true)]
async fn bounded_error_log_keeps_latest_entries() {
    let state = SharedState::arc(UserInfo::default());
    let engine: ActionEngine<UserInfo> = ActionEngine::builder(state)
        .with_error_log_capacity(2)
        .build();
    define_sleeper(&engine, "flaky", ActionOptions::default());

    for _ in 0..4 {
        let _ = engine
            .call::<_, ()>("flaky", (Duration::from_millis(1), true))
            .await;
    }
    assert_eq!(engine.get_action_errors("flaky").len(), 2);
    assert!(engine.has_action_failed("flaky"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exclusive_gate_holds_across_threads() {
    let (engine, _state) = engine();
    let runs = define_sleeper(&engine, "sync", ActionOptions::default());

    let mut callers = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        callers.push(tokio::spawn(async move {
            engine
                .call::<_, ()>("sync", (Duration::from_millis(50), false))
                .await
        }));
    }

    let mut ok = 0;
    let mut rejected = 0;
    for caller in callers {
        match caller.await.unwrap() {
            Ok(()) => ok += 1,
            Err(err) if err.is_concurrency() => rejected += 1,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
    assert_eq!(ok + rejected, 16);
    assert_eq!(ok, runs.load(Ordering::SeqCst));
    assert!(ok >= 1);
    assert_eq!(engine.running_count("sync"), 0);
}

#[test]
fn call_outside_runtime_is_rejected_before_anything_fires() {
    let (engine, _state) = engine();
    define_sleeper(&engine, "sync", ActionOptions::default());
    let before = Counter::default();
    let after = Counter::default();
    let b = before.clone();
    engine.on_before_action("sync", move |_ev| b.hit());
    let a = after.clone();
    engine.on_after_action("sync", move |_ev| a.hit());

    let err = engine
        .try_call::<_, ()>("sync", (Duration::from_millis(1), false))
        .unwrap_err();
    assert!(matches!(err, ActionError::NoRuntime { .. }));
    assert_eq!(err.as_label(), "action_no_runtime");

    let task = engine.call::<_, ()>("sync", (Duration::from_millis(1), false));
    assert!(task.is_rejected());
    let err = futures::executor::block_on(task).unwrap_err();
    assert!(matches!(err, ActionError::NoRuntime { .. }));

    assert_eq!(before.get(), 0);
    assert_eq!(after.get(), 0);
    assert!(!engine.is_action_running("sync"));
    assert!(!engine.has_action_failed("sync"));
}

#[tokio::test(start_paused = true)]
async fn redefining_as_exclusive_gates_only_new_calls() {
    let (engine, _state) = engine();
    define_sleeper(&engine, "fetch", ActionOptions::parallel());
    let first = engine.call::<_, ()>("fetch", (Duration::from_millis(100), false));
    let second = engine.call::<_, ()>("fetch", (Duration::from_millis(200), false));
    assert_eq!(engine.running_count("fetch"), 2);

    let runs = define_sleeper(&engine, "fetch", ActionOptions::exclusive());
    assert_eq!(engine.policy("fetch"), Some(ConcurrencyPolicy::Exclusive));
    // In-flight invocations keep their slots; new calls are gated.
    assert_eq!(engine.running_count("fetch"), 2);
    let err = engine
        .try_call::<_, ()>("fetch", (Duration::from_millis(1), false))
        .unwrap_err();
    assert!(err.is_concurrency());

    first.await.unwrap();
    assert_eq!(engine.running_count("fetch"), 1);
    assert!(engine
        .try_call::<_, ()>("fetch", (Duration::from_millis(1), false))
        .is_err());
    second.await.unwrap();
    assert_eq!(engine.running_count("fetch"), 0);

    let only = engine.call::<_, ()>("fetch", (Duration::from_millis(10), false));
    assert!(engine
        .try_call::<_, ()>("fetch", (Duration::from_millis(1), false))
        .is_err());
    only.await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
