//! Single-flight async value cache
//!
//! [`CoalescingOrchestrator`] guarantees that at most one computation of an
//! expensive async value is in flight at a time. Callers that arrive while a
//! computation is running join it and receive the same result; callers that
//! arrive after completion are served from memory when the retention policy
//! keeps the value, and trigger a fresh computation otherwise.
//!
//! The orchestrator is the building block behind discovery-endpoint caching,
//! JWKS caching, credential-list loading, and per-credential refresh
//! serialization.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{watch, Mutex};
use tracing::debug;

type Factory<T> = Arc<dyn Fn() -> BoxFuture<'static, T> + Send + Sync>;
type RetentionPolicy<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// State of the orchestrator: nothing computed, a computation in flight that
/// new callers join, or a retained result served without recomputation.
enum State<T> {
    Idle,
    InFlight(watch::Receiver<Option<T>>),
    Cached(T),
}

/// De-duplicates concurrent computations of a single async value.
///
/// Concurrency contract:
/// - exactly one `factory` invocation occurs per cache miss, no matter how
///   many callers race on [`get`](Self::get);
/// - every caller joined to an in-flight computation observes that
///   computation's result;
/// - the result is retained in memory only when `keep_data_in_memory`
///   returns `true` for it, so errors are retried on the next call while
///   successes are pinned;
/// - the computation runs in its own spawned task, so a caller cancelling
///   its await does not cancel the computation for the other waiters.
pub struct CoalescingOrchestrator<T> {
    factory: Factory<T>,
    keep_data_in_memory: RetentionPolicy<T>,
    state: Arc<Mutex<State<T>>>,
}

impl<T> CoalescingOrchestrator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an orchestrator around a factory and a retention policy.
    ///
    /// # Arguments
    /// * `factory` - Produces the future computing the value; invoked once
    ///   per miss
    /// * `keep_data_in_memory` - Decides whether a completed result is served
    ///   to later callers without recomputation
    pub fn new<F, Fut, K>(factory: F, keep_data_in_memory: K) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        K: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move || -> BoxFuture<'static, T> { Box::pin(factory()) }),
            keep_data_in_memory: Arc::new(keep_data_in_memory),
            state: Arc::new(Mutex::new(State::Idle)),
        }
    }

    /// Get the value, joining an in-flight computation when one exists.
    ///
    /// Suspends until a result is available. The decision between "join the
    /// computation in flight" and "start a new one" is made under a single
    /// lock, so exactly one factory invocation happens per miss.
    pub async fn get(&self) -> T {
        loop {
            let mut receiver = {
                let mut state = self.state.lock().await;
                if let State::Cached(value) = &*state {
                    if (self.keep_data_in_memory)(value) {
                        return value.clone();
                    }
                }
                match &mut *state {
                    State::InFlight(receiver) => receiver.clone(),
                    // Idle, or a cached value the retention policy let go of.
                    other => self.start(other),
                }
            };

            // Await outside the lock so joined waiters do not serialize.
            // Clone the value out of the watch guard immediately so the
            // borrow does not outlive the await below.
            let changed = receiver.wait_for(Option::is_some).await.map(|value| value.clone());
            match changed {
                Ok(value) => {
                    if let Some(value) = value {
                        return value;
                    }
                }
                Err(_) => {
                    // The producing task vanished without publishing a value
                    // (it panicked). Restart from a clean slate.
                    debug!("coalesced computation ended without a result, retrying");
                    let mut state = self.state.lock().await;
                    if matches!(&*state, State::InFlight(receiver) if receiver.has_changed().is_err())
                    {
                        *state = State::Idle;
                    }
                }
            }
        }
    }

    /// Start a computation while holding the state lock.
    ///
    /// The computation is spawned as an independent task: its lifetime is not
    /// tied to the caller that happened to start it.
    fn start(&self, state: &mut State<T>) -> watch::Receiver<Option<T>> {
        let (sender, receiver) = watch::channel(None);
        let future = (self.factory)();
        let shared = Arc::clone(&self.state);
        let keep_data_in_memory = Arc::clone(&self.keep_data_in_memory);
        tokio::spawn(async move {
            let result = future.await;
            {
                let mut state = shared.lock().await;
                *state = if keep_data_in_memory(&result) {
                    State::Cached(result.clone())
                } else {
                    State::Idle
                };
            }
            // Publish after the state transition so a waiter that immediately
            // calls get() again observes consistent state.
            let _ = sender.send(Some(result));
        });
        *state = State::InFlight(receiver.clone());
        receiver
    }
}
