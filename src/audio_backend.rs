//! Client for the audio processing backend.
//!
//! The backend takes a base64 encoded recording and answers with a WAV body,
//! or with a JSON `{"error": ...}` payload on failure.

use std::path::Path;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000/api/process-audio";

pub const READY_STATUS: &str = "Feedback ready.";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("could not read the recording: {0}")]
    Recording(#[from] std::io::Error),
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl BackendError {
    /// One-line status for the user.
    pub fn status_message(&self) -> String {
        match self {
            BackendError::Recording(_) => format!("Error {self}"),
            BackendError::Server { .. } | BackendError::Transport(_) => {
                format!("Error connecting to or processing by the server: {self}")
            }
        }
    }
}

#[derive(Serialize)]
struct ProcessRequest<'a> {
    audio: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// The server's `error` text, or a generic line naming the status.
pub fn server_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Server responded with status {status}"))
}

pub fn encode_recording(recording: &[u8]) -> String {
    general_purpose::STANDARD.encode(recording)
}

pub struct AudioBackend {
    http: Client,
    url: String,
}

impl AudioBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one recording; returns the processed WAV bytes.
    pub fn process(&self, recording: &[u8]) -> Result<Vec<u8>, BackendError> {
        let encoded = encode_recording(recording);
        debug!(url = %self.url, bytes = recording.len(), "sending audio");

        let response = self
            .http
            .post(&self.url)
            .json(&ProcessRequest { audio: &encoded })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = server_message(status.as_u16(), &body);
            warn!(status = status.as_u16(), %message, "audio backend refused recording");
            return Err(BackendError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let wav = response.bytes()?.to_vec();
        info!(bytes = wav.len(), "processed audio received");
        Ok(wav)
    }

    pub fn process_file(&self, path: &Path) -> Result<Vec<u8>, BackendError> {
        let recording = std::fs::read(path)?;
        self.process(&recording)
    }
}
