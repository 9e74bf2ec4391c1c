#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actionvisor::{AbortToken, ActionEngine, ActionOptions, BoxError, Mutator, SharedState};

pub const LOAD_USER_INFO: &str = "load-user-info";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserInfo {
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
}

pub fn engine() -> (ActionEngine<UserInfo>, Arc<SharedState<UserInfo>>) {
    let state = SharedState::arc(UserInfo::default());
    let engine: ActionEngine<UserInfo> = ActionEngine::new(state.clone());
    (engine, state)
}

/// `load-user-info`: resolves Jane Doe (32) after 300ms; the timer is released on abort.
pub fn define_load_user_info(engine: &ActionEngine<UserInfo>) {
    engine.define_fn(
        LOAD_USER_INFO,
        |(): (), mutate: Mutator<UserInfo>, token: AbortToken| async move {
            let timer = tokio::spawn(tokio::time::sleep(Duration::from_millis(300)));
            let handle = timer.abort_handle();
            token.on_abort(move || handle.abort());
            timer.await?;
            mutate.mutate(|u| {
                u.first_name = "Jane".into();
                u.last_name = "Doe".into();
                u.age = 32;
            });
            Ok::<_, BoxError>(())
        },
        ActionOptions::default(),
    );
}

/// Sleeps `delay`, fails with "failed" when `fail` is set, counts handler runs.
pub fn define_sleeper(
    engine: &ActionEngine<UserInfo>,
    name: &str,
    options: ActionOptions,
) -> Arc<AtomicUsize> {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    engine.define_fn(
        name,
        move |(delay, fail): (Duration, bool), _mutate: Mutator<UserInfo>, _token: AbortToken| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                if fail {
                    return Err::<(), BoxError>("failed".into());
                }
                Ok(())
            }
        },
        options,
    );
    runs
}

/// Counts listener invocations.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
