use async_trait::async_trait;

/// Identity carried by a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSession {
    pub player_name: String,
    pub room_code: String,
    pub expires_at: u64,
}

// Domain-level errors for session verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    InvalidToken,
    SessionExpired,
    UpstreamUnavailable,
}

// Port for resolving a session token into a player identity.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedSession, VerifyError>;
}
