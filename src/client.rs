//! Top-level `Client` (spec.md §4.7): owns one lazily-connected [`Session`]
//! per namespace and a finalizer stack of resources to tear down on
//! close, mirroring the teacher's `Agent`/`Conversation` ownership style
//! but generalized across the five namespaces spec.md §2 defines.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::protocol::Namespace;
use crate::session::Session;

/// Anything that needs to run when the client closes -- in practice,
/// open [`crate::channel::Channel`]s and handles built on top of them
/// register a disconnect hook here so `Client::close` can cancel
/// everything still outstanding (spec.md §5's "on client close, cancel
/// all outstanding calls/channels").
type Finalizer = Box<dyn FnOnce() + Send>;

/// Entry point: one per connection to the host. Namespaces connect lazily
/// and independently -- opening a `llm` session does not connect
/// `embedding` (spec.md §8, property 6).
pub struct Client {
    config: ClientConfig,
    sessions: Mutex<HashMap<Namespace, Arc<Session>>>,
    finalizers: Mutex<Vec<Finalizer>>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: Mutex::new(HashMap::new()),
            finalizers: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Return the (lazily created) session for `namespace`. The session
    /// itself defers the actual websocket connect until first use.
    pub async fn get_session(&self, namespace: Namespace) -> Arc<Session> {
        let mut sessions = self.sessions.lock().await;
        Arc::clone(
            sessions
                .entry(namespace)
                .or_insert_with(|| Arc::new(Session::new(namespace, self.config.clone()))),
        )
    }

    /// Register a cleanup hook run (in LIFO order) by [`Client::close`].
    pub async fn register_finalizer(&self, finalizer: impl FnOnce() + Send + 'static) {
        self.finalizers.lock().await.push(Box::new(finalizer));
    }

    /// Run every registered finalizer, then disconnect every open
    /// session. Idempotent: a second call is a no-op since both
    /// collections are drained.
    pub async fn close(&self) {
        let finalizers = std::mem::take(&mut *self.finalizers.lock().await);
        for finalizer in finalizers.into_iter().rev() {
            finalizer();
        }

        let sessions = std::mem::take(&mut *self.sessions.lock().await);
        for session in sessions.into_values() {
            session.disconnect().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn get_session_is_cached_per_namespace() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let a = client.get_session(Namespace::Llm).await;
        let b = client.get_session(Namespace::Llm).await;
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn distinct_namespaces_get_distinct_sessions() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let llm = client.get_session(Namespace::Llm).await;
        let embedding = client.get_session(Namespace::Embedding).await;
        assert!(!Arc::ptr_eq(&llm, &embedding));
    }

    #[tokio::test]
    async fn close_runs_finalizers_in_lifo_order() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = Arc::clone(&order);
        client.register_finalizer(move || {
            // Synchronous finalizer; real usage would spawn/terminate a pump.
            o1.try_lock().unwrap().push(1);
        }).await;
        let o2 = Arc::clone(&order);
        client.register_finalizer(move || {
            o2.try_lock().unwrap().push(2);
        }).await;

        client.close().await;
        assert_eq!(*order.lock().await, vec![2, 1]);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        client.register_finalizer(move || ran_clone.store(true, Ordering::SeqCst)).await;

        client.close().await;
        client.close().await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
