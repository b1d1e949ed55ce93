//! In-memory session store
//!
//! A HashMap behind a tokio Mutex. Expired entries are dropped lazily:
//! a `get` that finds a stale record removes it on the spot, so an
//! abandoned handshake occupies memory only until the next lookup of its
//! id or a later sweep on write.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::Clock;
use crate::error::Result;
use crate::record::{SessionRecord, SessionState};
use crate::store::SessionStore;

/// Volatile session store for tests and single-node deployments.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    state: Mutex<HashMap<String, SessionRecord>>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Number of live (non-expired) records. Test and health-report helper.
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        let state = self.state.lock().await;
        state.values().filter(|r| !r.expired_at(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl SessionStore for MemoryStore {
    fn put<'a>(
        &'a self,
        session_id: &'a str,
        state: SessionState,
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let now = self.clock.now();
            let record = SessionRecord {
                state,
                expires_at: now + ttl.as_secs(),
            };
            let mut map = self.state.lock().await;
            // Writes double as the sweep point for stale entries.
            map.retain(|_, r| !r.expired_at(now));
            map.insert(session_id.to_string(), record);
            Ok(())
        })
    }

    fn get<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SessionRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut map = self.state.lock().await;
            match map.get(session_id) {
                Some(record) if record.expired_at(now) => {
                    debug!(state = record.state.label(), "dropping expired session");
                    map.remove(session_id);
                    Ok(None)
                }
                Some(record) => Ok(Some(record.clone())),
                None => Ok(None),
            }
        })
    }
}
