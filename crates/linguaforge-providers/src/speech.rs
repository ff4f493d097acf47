//! Polling speech-to-text transcriber.
//!
//! Wraps an AssemblyAI-style REST API: upload raw bytes, submit a transcript
//! job, poll until it resolves. The audio normalizer in the pipeline owns the
//! polling loop and its bounds; this type only exposes the three calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use linguaforge_core::model::Language;
use linguaforge_core::traits::{
    SpeechTranscriber, TranscribedWord, Transcription, TranscriptionStatus,
};

use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn language_code(language: Language) -> &'static str {
    match language {
        Language::Romanian => "ro",
        Language::Korean => "ko",
        Language::English => "en",
    }
}

/// `SpeechTranscriber` backed by an AssemblyAI-compatible API.
pub struct PollingTranscriber {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl PollingTranscriber {
    pub fn new(api_key: &str, base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client,
        }
    }

    async fn check_status(&self, response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
        let status = response.status().as_u16();
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body).into());
        }
        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_ms: 5000,
            }
            .into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }
        Ok(response)
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Serialize)]
struct SubmitRequest {
    audio_url: String,
    language_code: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Deserialize)]
struct PollResponse {
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    words: Vec<PollWord>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct PollWord {
    text: String,
    confidence: f64,
}

#[async_trait]
impl SpeechTranscriber for PollingTranscriber {
    fn name(&self) -> &str {
        "assemblyai"
    }

    #[instrument(skip(self, audio), fields(bytes = audio.len()))]
    async fn upload(&self, audio: &[u8]) -> anyhow::Result<String> {
        let response = self
            .client
            .post(format!("{}/v2/upload", self.base_url))
            .header("Authorization", &self.api_key)
            .header("content-type", "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let response = self.check_status(response).await?;
        let upload: UploadResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("failed to parse upload response: {e}"))
        })?;
        Ok(upload.upload_url)
    }

    #[instrument(skip(self), fields(language = %language))]
    async fn submit(&self, audio_url: &str, language: Language) -> anyhow::Result<String> {
        let body = SubmitRequest {
            audio_url: audio_url.to_string(),
            language_code: language_code(language).to_string(),
        };
        let response = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let response = self.check_status(response).await?;
        let submit: SubmitResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("failed to parse submit response: {e}"))
        })?;
        Ok(submit.id)
    }

    #[instrument(skip(self))]
    async fn poll(&self, job_id: &str) -> anyhow::Result<TranscriptionStatus> {
        let response = self
            .client
            .get(format!("{}/v2/transcript/{job_id}", self.base_url))
            .header("Authorization", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let response = self.check_status(response).await?;
        let poll: PollResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("failed to parse poll response: {e}"))
        })?;

        match poll.status.as_str() {
            "queued" => Ok(TranscriptionStatus::Queued),
            "processing" => Ok(TranscriptionStatus::Processing),
            "completed" => Ok(TranscriptionStatus::Completed(Transcription {
                text: poll.text.unwrap_or_default(),
                confidence: poll.confidence.unwrap_or(0.0),
                words: poll
                    .words
                    .into_iter()
                    .map(|w| TranscribedWord {
                        text: w.text,
                        confidence: w.confidence,
                    })
                    .collect(),
            })),
            "error" => Ok(TranscriptionStatus::Failed {
                message: poll.error.unwrap_or_else(|| "unknown error".to_string()),
            }),
            other => Err(ProviderError::MalformedResponse(format!(
                "unknown transcript status: {other}"
            ))
            .into()),
        }
    }
}
