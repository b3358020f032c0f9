use crate::domain::{SessionVerifier, VerifiedSession, VerifyError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Session lookup response from the auth service.
#[derive(Debug, Clone, Deserialize)]
struct VerifiedSessionDto {
    player_name: String,
    room_code: String,
    expires_at: u64,
}

impl From<VerifiedSessionDto> for VerifiedSession {
    fn from(dto: VerifiedSessionDto) -> Self {
        Self {
            player_name: dto.player_name,
            room_code: dto.room_code,
            expires_at: dto.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct VerifyTokenRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

// Thin reqwest client for session token verification.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn verify_token(&self, token: &str) -> Result<VerifiedSession, VerifyError> {
        let url = format!("{}/auth/verify-token", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&VerifyTokenRequest { token })
            .send()
            .await
            .map_err(|_| VerifyError::UpstreamUnavailable)?;

        if response.status().is_success() {
            return response
                .json::<VerifiedSessionDto>()
                .await
                .map(VerifiedSession::from)
                .map_err(|_| VerifyError::UpstreamUnavailable);
        }

        if response.status() == StatusCode::UNAUTHORIZED {
            let error = response
                .json::<ErrorResponse>()
                .await
                .map_err(|_| VerifyError::UpstreamUnavailable)?;

            if error.message == "session expired" {
                return Err(VerifyError::SessionExpired);
            }
            return Err(VerifyError::InvalidToken);
        }

        Err(VerifyError::UpstreamUnavailable)
    }
}

#[async_trait]
impl SessionVerifier for AuthClient {
    async fn verify(&self, token: &str) -> Result<VerifiedSession, VerifyError> {
        self.verify_token(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode as HttpStatus;
    use axum::{Json, Router, routing::post};
    use serde_json::{Value, json};

    async fn verify_stub(Json(body): Json<Value>) -> (HttpStatus, Json<Value>) {
        match body["token"].as_str() {
            Some("good") => (
                HttpStatus::OK,
                Json(json!({"player_name": "ann", "room_code": "ABCD", "expires_at": 42})),
            ),
            Some("old") => (
                HttpStatus::UNAUTHORIZED,
                Json(json!({"message": "session expired"})),
            ),
            Some("boom") => (
                HttpStatus::INTERNAL_SERVER_ERROR,
                Json(json!({"message": "boom"})),
            ),
            _ => (
                HttpStatus::UNAUTHORIZED,
                Json(json!({"message": "invalid token"})),
            ),
        }
    }

    async fn stub_base_url() -> String {
        let app = Router::new().route("/auth/verify-token", post(verify_stub));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn when_auth_service_answers_then_outcomes_map_to_verify_errors() {
        let client = AuthClient::new(stub_base_url().await, Duration::from_secs(2)).unwrap();

        let session = client.verify("good").await.unwrap();
        assert_eq!(session.player_name, "ann");
        assert_eq!(session.room_code, "ABCD");
        assert_eq!(session.expires_at, 42);

        assert_eq!(client.verify("old").await, Err(VerifyError::SessionExpired));
        assert_eq!(client.verify("nope").await, Err(VerifyError::InvalidToken));
        assert_eq!(
            client.verify("boom").await,
            Err(VerifyError::UpstreamUnavailable)
        );
    }

    #[tokio::test]
    async fn when_auth_service_is_unreachable_then_upstream_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            AuthClient::new(format!("http://{addr}"), Duration::from_millis(500)).unwrap();
        assert_eq!(
            client.verify("good").await,
            Err(VerifyError::UpstreamUnavailable)
        );
    }
}
