//! Mock judge and transcriber for testing and offline use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use linguaforge_core::model::Language;
use linguaforge_core::traits::{
    JudgeCorrection, SpeechTranscriber, TextJudge, Transcription, TranscriptionStatus,
};

/// A deterministic `TextJudge` that needs no network.
///
/// Corrections are keyed by substring match against the graded text, so tests
/// can script "this phrase draws this correction" without a live model. With
/// no mappings it judges everything clean, which is also the offline-mode
/// behavior in the CLI.
pub struct MockJudge {
    /// Map of text substring → corrections to report.
    corrections: HashMap<String, Vec<JudgeCorrection>>,
    /// Map of text substring → naturalness findings to report.
    naturalness_findings: HashMap<String, Vec<String>>,
    call_count: AtomicU32,
    last_text: Mutex<Option<String>>,
}

impl MockJudge {
    pub fn new() -> Self {
        Self {
            corrections: HashMap::new(),
            naturalness_findings: HashMap::new(),
            call_count: AtomicU32::new(0),
            last_text: Mutex::new(None),
        }
    }

    pub fn with_correction(mut self, text_contains: &str, correction: JudgeCorrection) -> Self {
        self.corrections
            .entry(text_contains.to_string())
            .or_default()
            .push(correction);
        self
    }

    pub fn with_naturalness_finding(mut self, text_contains: &str, finding: &str) -> Self {
        self.naturalness_findings
            .entry(text_contains.to_string())
            .or_default()
            .push(finding.to_string());
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_text(&self) -> Option<String> {
        self.last_text.lock().unwrap().clone()
    }
}

impl Default for MockJudge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextJudge for MockJudge {
    fn name(&self) -> &str {
        "mock"
    }

    async fn grammar_check(
        &self,
        text: &str,
        _language: Language,
    ) -> anyhow::Result<Vec<JudgeCorrection>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_text.lock().unwrap() = Some(text.to_string());

        Ok(self
            .corrections
            .iter()
            .filter(|(key, _)| text.contains(key.as_str()))
            .flat_map(|(_, v)| v.iter().cloned())
            .collect())
    }

    async fn naturalness(&self, text: &str, _language: Language) -> anyhow::Result<Vec<String>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .naturalness_findings
            .iter()
            .filter(|(key, _)| text.contains(key.as_str()))
            .flat_map(|(_, v)| v.iter().cloned())
            .collect())
    }
}

/// A `SpeechTranscriber` that resolves immediately with a fixed transcription.
pub struct MockTranscriber {
    transcription: Transcription,
    call_count: AtomicU32,
}

impl MockTranscriber {
    pub fn new(transcription: Transcription) -> Self {
        Self {
            transcription,
            call_count: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SpeechTranscriber for MockTranscriber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(&self, _audio: &[u8]) -> anyhow::Result<String> {
        Ok("https://mock.test/upload/1".to_string())
    }

    async fn submit(&self, _audio_url: &str, _language: Language) -> anyhow::Result<String> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Ok("mock-job-1".to_string())
    }

    async fn poll(&self, _job_id: &str) -> anyhow::Result<TranscriptionStatus> {
        Ok(TranscriptionStatus::Completed(self.transcription.clone()))
    }
}
