// Session table for the HTTP transport

use crate::bridge::BridgeError;
use crate::comm::error::{CommError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One logical caller. Closing it cancels whatever it still has in flight.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl Session {
    /// Token for one request of this session
    pub fn request_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }
}

#[derive(Debug, Default)]
struct Table {
    sessions: HashMap<String, Session>,
    closed: bool,
}

/// Live sessions, capped at `capacity`. Creation past the cap is refused, never queued.
#[derive(Debug)]
pub struct SessionManager {
    table: Mutex<Table>,
    capacity: usize,
}

impl SessionManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            capacity,
        }
    }

    pub async fn create(&self) -> Result<Session> {
        let mut table = self.table.lock().await;
        if table.closed {
            return Err(CommError::ShuttingDown);
        }
        if table.sessions.len() >= self.capacity {
            warn!(capacity = self.capacity, "session refused, server at capacity");
            return Err(BridgeError::CapacityExceeded(self.capacity).into());
        }

        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            cancel: CancellationToken::new(),
        };
        table.sessions.insert(session.id.clone(), session.clone());
        info!(
            session_id = %session.id,
            live = table.sessions.len(),
            "session created"
        );
        Ok(session)
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.table.lock().await.sessions.get(id).cloned()
    }

    /// Close one session. Returns whether it existed.
    pub async fn close(&self, id: &str) -> bool {
        let removed = self.table.lock().await.sessions.remove(id);
        match removed {
            Some(session) => {
                session.cancel.cancel();
                let age_secs = (Utc::now() - session.created_at).num_seconds();
                info!(session_id = %id, age_secs, "session closed");
                true
            }
            None => {
                debug!(session_id = %id, "close for unknown session");
                false
            }
        }
    }

    /// Refuse new sessions and close every live one. Returns how many were closed.
    pub async fn shutdown(&self) -> usize {
        let drained: Vec<Session> = {
            let mut table = self.table.lock().await;
            table.closed = true;
            table.sessions.drain().map(|(_, s)| s).collect()
        };
        for session in &drained {
            session.cancel.cancel();
        }
        info!(closed = drained.len(), "all sessions closed");
        drained.len()
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
