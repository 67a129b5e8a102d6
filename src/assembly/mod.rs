//! The assembly service: every voting rule, applied over a [`Store`].
//!
//! One [`Assembly`] is built at launch and kept in Rocket's managed state.
//! Routes are thin wrappers around its methods.

mod attendance;
mod events;
mod results;
mod retry;
mod roll;
mod session;
mod validation;

pub use events::{AssemblyEvent, EVENT_CAPACITY};
pub use retry::RetryPolicy;
pub use validation::check_admission;

use std::future::Future;
use std::sync::Arc;

use rocket::tokio::sync::{broadcast, RwLock};

use crate::error::Result;
use crate::model::store::{Store, StoreResult};

/// Shared handle to the assembly. Cloning is cheap and every clone sees
/// the same store, event channel and session lock.
#[derive(Clone)]
pub struct Assembly {
    store: Arc<dyn Store>,
    retry: RetryPolicy,
    events: broadcast::Sender<AssemblyEvent>,
    /// Session transitions and resets hold the write side. Ballot
    /// submission holds the read side from admission until the ballot is
    /// stored, so a ballot always lands in the session it was admitted to.
    session_lock: Arc<RwLock<()>>,
    recent_limit: usize,
}

impl Assembly {
    pub fn new(store: Arc<dyn Store>, retry: RetryPolicy, recent_limit: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            retry,
            events,
            session_lock: Arc::new(RwLock::new(())),
            recent_limit,
        }
    }

    /// Subscribe to live change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<AssemblyEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: AssemblyEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// A read or idempotent write, with timeout and retries.
    async fn read<T, F, Fut>(&self, what: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        Ok(self.retry.retry(what, op).await?)
    }

    /// A write that must not be repeated, with a timeout only.
    async fn write_once<T, Fut>(&self, what: &str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = StoreResult<T>>,
    {
        Ok(self.retry.once(what, fut).await?)
    }
}
