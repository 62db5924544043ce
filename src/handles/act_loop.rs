//! Convenience wrapper binding an [`ActConfig`] to a session, so callers
//! don't have to thread both through every call site (spec.md §4.6.3).

use std::sync::Arc;

use crate::endpoints::act::{act, ActCallbacks, ActConfig, ActResult};
use crate::error::Result;
use crate::history::ChatHistory;
use crate::session::Session;

pub struct ActLoopHandle {
    session: Arc<Session>,
    config: ActConfig,
}

impl ActLoopHandle {
    pub fn new(session: Arc<Session>, config: ActConfig) -> Self {
        Self { session, config }
    }

    pub async fn run(
        &self,
        history: &mut ChatHistory,
        callbacks: &mut dyn ActCallbacks,
    ) -> Result<ActResult> {
        act(&self.session, &self.config, history, callbacks).await
    }
}
