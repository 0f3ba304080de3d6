//! Quiet-window debouncing.
//!
//! A [`Debouncer`] remembers the latest deadline and argument. The first
//! `schedule` starts one waiter task that polls until the latest deadline has
//! passed and then fires once with the latest argument. Later calls made while
//! the waiter is alive only move the deadline and replace the argument.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

type FireFn<T> = dyn Fn(T) + Send + Sync;

pub struct Debouncer<T> {
    state: Arc<Mutex<DebounceState<T>>>,
    poll: Duration,
    runtime: Handle,
    on_fire: Arc<FireFn<T>>,
}

struct DebounceState<T> {
    deadline: Instant,
    pending: Option<T>,
    running: bool,
}

impl<T> Clone for Debouncer<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            poll: self.poll,
            runtime: self.runtime.clone(),
            on_fire: Arc::clone(&self.on_fire),
        }
    }
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(runtime: Handle, on_fire: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(DebounceState {
                deadline: Instant::now(),
                pending: None,
                running: false,
            })),
            poll: POLL_INTERVAL,
            runtime,
            on_fire: Arc::new(on_fire),
        }
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub fn schedule(&self, deadline: Instant, arg: T) {
        let mut state = lock(&self.state);
        state.deadline = deadline;
        state.pending = Some(arg);

        if state.running {
            return;
        }
        state.running = true;
        drop(state);

        let state = Arc::clone(&self.state);
        let on_fire = Arc::clone(&self.on_fire);
        let poll = self.poll;
        self.runtime.spawn(async move {
            if let Some(arg) = wait_for_deadline(&state, poll).await {
                on_fire(arg);
            }
        });
    }

    pub fn schedule_in(&self, delay: Duration, arg: T) {
        self.schedule(Instant::now() + delay, arg);
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }
}

async fn wait_for_deadline<T>(state: &Mutex<DebounceState<T>>, poll: Duration) -> Option<T> {
    loop {
        {
            // Checked and cleared under one lock so a concurrent schedule either
            // lands before the fire or starts a fresh waiter.
            let mut state = lock(state);
            if Instant::now() >= state.deadline {
                state.running = false;
                return state.pending.take();
            }
        }
        tokio::time::sleep(poll).await;
    }
}

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
