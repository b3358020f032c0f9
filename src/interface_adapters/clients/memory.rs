// In-process session store for tests and single-binary deployments.

use crate::domain::{SessionVerifier, VerifiedSession, VerifyError};
use crate::interface_adapters::utils::ids::session_token;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredSession {
    player_name: String,
    room_code: String,
    expires_at: SystemTime,
}

/// Token store with a fixed lifetime per session.
#[derive(Debug)]
pub struct MemorySessions {
    ttl: Duration,
    sessions: Mutex<HashMap<String, StoredSession>>,
}

impl MemorySessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issues a fresh token for the name/room code pair.
    pub async fn issue(&self, player_name: &str, room_code: &str) -> String {
        let token = session_token();
        self.insert(&token, player_name, room_code).await;
        token
    }

    pub async fn insert(&self, token: &str, player_name: &str, room_code: &str) {
        let session = StoredSession {
            player_name: player_name.to_string(),
            room_code: room_code.to_string(),
            expires_at: SystemTime::now() + self.ttl,
        };
        self.sessions.lock().await.insert(token.to_string(), session);
    }

    /// Returns whether the token was known.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.lock().await.remove(token).is_some()
    }
}

#[async_trait]
impl SessionVerifier for MemorySessions {
    async fn verify(&self, token: &str) -> Result<VerifiedSession, VerifyError> {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get(token).cloned() else {
            return Err(VerifyError::InvalidToken);
        };

        if SystemTime::now() >= session.expires_at {
            sessions.remove(token);
            return Err(VerifyError::SessionExpired);
        }

        let expires_at = session
            .expires_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Ok(VerifiedSession {
            player_name: session.player_name,
            room_code: session.room_code,
            expires_at,
        })
    }
}
