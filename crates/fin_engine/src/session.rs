use std::collections::HashMap;
use std::sync::Arc;

use fin_core::{ConversationState, ConversationTurn, Error, Result};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// In-memory session registry.
///
/// Each session's state sits behind its own `Mutex`, which is how "at most
/// one in-flight turn per session" is enforced: `answer()` holds the owned
/// guard for the lifetime of the stream. Separate sessions are independent
/// and run in parallel. Sessions live for the process lifetime; durable
/// session storage is an external concern.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Mutex<ConversationState>>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn start_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let state = ConversationState::new(session_id.clone());
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(state)));
        session_id
    }

    pub async fn get(&self, session_id: &str) -> Result<Arc<Mutex<ConversationState>>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::Session(session_id.to_string()))
    }

    pub async fn turns(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let state = self.get(session_id).await?;
        let guard = state.lock().await;
        Ok(guard.turns().to_vec())
    }

    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| Error::Session(session_id.to_string()))
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
