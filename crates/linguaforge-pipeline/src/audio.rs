//! Audio normalization.
//!
//! Converts an audio submission into a transcript plus a pronunciation
//! signal: upload (when the audio is not already fetchable), submit, poll
//! with bounded attempts, then positionally align the transcript against the
//! expected text and penalize mismatches by the transcriber's word-level
//! confidence.

use std::sync::Arc;
use std::time::Duration;

use linguaforge_core::config::{AudioQualityCutoffs, PronunciationPenalties};
use linguaforge_core::error::GradeError;
use linguaforge_core::model::Language;
use linguaforge_core::results::{AudioAnalysis, AudioQuality, PronunciationError};
use linguaforge_core::traits::{SpeechTranscriber, TranscribedWord, Transcription, TranscriptionStatus};

const DEFAULT_POLL_ATTEMPTS: u32 = 60;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct AudioNormalizer {
    transcriber: Arc<dyn SpeechTranscriber>,
    penalties: PronunciationPenalties,
    cutoffs: AudioQualityCutoffs,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl AudioNormalizer {
    pub fn new(
        transcriber: Arc<dyn SpeechTranscriber>,
        penalties: PronunciationPenalties,
        cutoffs: AudioQualityCutoffs,
    ) -> Self {
        Self {
            transcriber,
            penalties,
            cutoffs,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the polling bounds. Tests use a zero interval.
    pub fn with_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts;
        self.poll_interval = interval;
        self
    }

    /// Normalize an audio submission.
    ///
    /// Failures here are fatal to this stage only; the caller decides whether
    /// to abort or proceed text-only.
    pub async fn normalize(
        &self,
        audio_url: &str,
        expected_text: Option<&str>,
        language: Language,
    ) -> Result<AudioAnalysis, GradeError> {
        let fetchable_url = self.ensure_fetchable(audio_url).await?;

        let job_id = self
            .transcriber
            .submit(&fetchable_url, language)
            .await
            .map_err(|e| GradeError::TranscriptionFailed(e.to_string()))?;

        let transcription = self.poll_until_complete(&job_id).await?;
        Ok(self.analyze(&transcription, expected_text))
    }

    /// Make sure the speech service can fetch the audio: pass URLs through,
    /// upload local files.
    async fn ensure_fetchable(&self, audio_url: &str) -> Result<String, GradeError> {
        if audio_url.starts_with("http://") || audio_url.starts_with("https://") {
            return Ok(audio_url.to_string());
        }
        let bytes = tokio::fs::read(audio_url).await.map_err(|e| {
            GradeError::TranscriptionFailed(format!("cannot read audio {audio_url}: {e}"))
        })?;
        self.transcriber
            .upload(&bytes)
            .await
            .map_err(|e| GradeError::TranscriptionFailed(format!("upload failed: {e}")))
    }

    async fn poll_until_complete(&self, job_id: &str) -> Result<Transcription, GradeError> {
        for attempt in 0..self.poll_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.poll_interval).await;
            }
            let status = self
                .transcriber
                .poll(job_id)
                .await
                .map_err(|e| GradeError::TranscriptionFailed(e.to_string()))?;
            match status {
                TranscriptionStatus::Completed(transcription) => return Ok(transcription),
                TranscriptionStatus::Failed { message } => {
                    return Err(GradeError::TranscriptionFailed(message));
                }
                TranscriptionStatus::Queued | TranscriptionStatus::Processing => {
                    tracing::trace!(job_id, attempt, "transcription pending");
                }
            }
        }
        Err(GradeError::TranscriptionTimeout {
            attempts: self.poll_attempts,
        })
    }

    fn analyze(&self, transcription: &Transcription, expected_text: Option<&str>) -> AudioAnalysis {
        let pronunciation_errors = match expected_text {
            Some(expected) => align_words(expected, transcription),
            None => Vec::new(),
        };

        let total_penalty: u32 = pronunciation_errors
            .iter()
            .map(|e| self.penalties.penalty_for(e.confidence))
            .sum();

        let base = 100.0 * transcription.confidence;
        let pronunciation_score = (base - total_penalty as f64).round().max(0.0) as u8;

        let audio_quality = if transcription.confidence >= self.cutoffs.good {
            AudioQuality::Good
        } else if transcription.confidence >= self.cutoffs.fair {
            AudioQuality::Fair
        } else {
            AudioQuality::Poor
        };

        AudioAnalysis {
            transcript: transcription.text.clone(),
            confidence: transcription.confidence,
            pronunciation_score,
            pronunciation_errors,
            audio_quality,
        }
    }
}

/// Positionally align transcribed words against the expected words and flag
/// mismatches. Alignment is index-by-index: an insertion early in the
/// utterance will cascade, which is accepted for this signal.
fn align_words(expected: &str, transcription: &Transcription) -> Vec<PronunciationError> {
    let expected_words: Vec<&str> = expected.split_whitespace().collect();
    let transcribed = effective_words(transcription);

    let mut errors = Vec::new();
    for (position, expected_word) in expected_words.iter().enumerate() {
        let heard = transcribed.get(position);
        let matches = heard
            .map(|w| normalize_word(&w.text) == normalize_word(expected_word))
            .unwrap_or(false);
        if !matches {
            errors.push(PronunciationError {
                expected: (*expected_word).to_string(),
                heard: heard.map(|w| w.text.clone()).unwrap_or_default(),
                position,
                confidence: heard.map(|w| w.confidence).unwrap_or(0.0),
            });
        }
    }
    errors
}

/// Word list with per-word confidence, falling back to splitting the
/// transcript text at the overall confidence when the service returned no
/// word timings.
fn effective_words(transcription: &Transcription) -> Vec<TranscribedWord> {
    if !transcription.words.is_empty() {
        return transcription.words.clone();
    }
    transcription
        .text
        .split_whitespace()
        .map(|w| TranscribedWord {
            text: w.to_string(),
            confidence: transcription.confidence,
        })
        .collect()
}

fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
