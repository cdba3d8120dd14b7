//! Client for the remote generation endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::GenerateError;
use crate::session::Session;

pub const DEFAULT_ENDPOINT: &str = "https://maxmoviesai-backend.vercel.app/api/generate";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    user_id: &'a str,
    project: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    reply: Option<String>,
}

/// Anything that can turn a prompt into a raw reply
#[async_trait]
pub trait Backend: Send + Sync {
    async fn generate(&self, session: &Session, prompt: &str) -> Result<String, GenerateError>;
}

#[derive(Clone)]
pub struct GenerateClient {
    client: Client,
    endpoint: String,
}

impl GenerateClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Backend for GenerateClient {
    async fn generate(&self, session: &Session, prompt: &str) -> Result<String, GenerateError> {
        let request = GenerateRequest {
            user_id: &session.user_id,
            project: &session.project,
            prompt,
        };

        tracing::debug!(endpoint = %self.endpoint, project = %session.project, "sending prompt");
        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            // A body that fails to arrive is a transport failure, not a status error
            let body = response.text().await?;
            tracing::warn!(status, "backend returned an error status");
            return Err(GenerateError::Status { status, body });
        }

        let generate_response: GenerateResponse = response.json().await?;
        match generate_response.reply {
            Some(reply) if !reply.is_empty() => Ok(reply),
            _ => Err(GenerateError::EmptyReply),
        }
    }
}
