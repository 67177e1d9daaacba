use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    error::EngineFailureBody,
    protocol::{
        EngineRequest, FaceCropPayload, FaceSwapArgs, FaceSwapPayload, ProcessFaceArgs,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{EngineError, FaceEngine};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Invokes engine commands as `POST {engine_url}/invoke/{command}` with the command's
/// arguments as the JSON body.
pub struct HttpFaceEngine {
    http: Client,
    base_url: Url,
}

impl HttpFaceEngine {
    pub fn new(engine_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(engine_url.trim())
            .with_context(|| format!("invalid face engine url '{engine_url}'"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build face engine http client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn command_url(&self, command: &str) -> Result<Url, EngineError> {
        self.base_url
            .join(&format!("invoke/{command}"))
            .map_err(|err| EngineError::Transport(format!("invalid command url: {err}")))
    }

    async fn invoke<T: DeserializeOwned>(&self, request: EngineRequest) -> Result<T, EngineError> {
        let command = request.command();
        let url = self.command_url(command)?;
        let args = request
            .args()
            .map_err(|err| EngineError::Transport(format!("failed to encode {command} args: {err}")))?;

        debug!(command, %url, "invoking face engine command");
        let res = self
            .http
            .post(url)
            .json(&args)
            .send()
            .await
            .map_err(|err| transport_error(command, err))?;

        let status = res.status();
        if !status.is_success() {
            let body = match res.text().await {
                Ok(body) => body,
                Err(err) => {
                    warn!(command, %status, error = %err, "failed to read face engine error body");
                    String::new()
                }
            };
            return Err(EngineError::Engine(failure_message(status, &body)));
        }

        res.json::<T>()
            .await
            .map_err(|err| EngineError::contract(format!("malformed {command} response: {err}")))
    }
}

#[async_trait]
impl FaceEngine for HttpFaceEngine {
    async fn process_face(
        &self,
        args: ProcessFaceArgs,
    ) -> Result<Vec<FaceCropPayload>, EngineError> {
        self.invoke(EngineRequest::ProcessFace(args)).await
    }

    async fn face_swap(&self, args: FaceSwapArgs) -> Result<FaceSwapPayload, EngineError> {
        self.invoke(EngineRequest::FaceSwap(args)).await
    }
}

fn transport_error(command: &str, err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        EngineError::Transport(format!("{command} timed out: {err}"))
    } else {
        EngineError::Transport(format!("{command} request failed: {err}"))
    }
}

fn failure_message(status: reqwest::StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("face engine returned {status}");
    }
    match serde_json::from_str::<EngineFailureBody>(trimmed) {
        Ok(failure) => failure.into_message(),
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/http_engine_tests.rs"]
mod tests;
