//! The grading pipeline.
//!
//! Orchestrates one submission end to end: validate, persist the raw
//! submission, aggregate context, normalize audio, grade, synthesize feedback,
//! track proficiency. `grade` never returns an error; every failure mode is
//! folded into a `GradeResponse` so the caller always has something to show
//! the learner.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linguaforge_core::config::{
    AudioQualityCutoffs, ContextLimits, FeedbackConfig, NaturalnessScoring,
    PronunciationPenalties, ScoringWeights, SeverityPenalties,
};
use linguaforge_core::error::GradeError;
use linguaforge_core::model::{ForgeType, Language, Submission};
use linguaforge_core::results::{
    AudioAnalysis, AudioQuality, Correction, GradingRecord, ScoreSet,
};
use linguaforge_core::traits::{KnowledgeStore, SpeechTranscriber, TextJudge};

use crate::audio::AudioNormalizer;
use crate::context::ContextAggregator;
use crate::feedback::FeedbackSynthesizer;
use crate::grading::GradingEngine;
use crate::tracker::ProficiencyTracker;

const DEFAULT_REQUEST_BUDGET: Duration = Duration::from_secs(30);

const GENERIC_FAILURE_MESSAGE: &str =
    "We couldn't grade this submission. Please try again in a moment.";

// ---------------------------------------------------------------------------
// Request / response shapes
// ---------------------------------------------------------------------------

/// One grading request. Exactly one of `text` and `audio_url` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub user_id: String,
    pub session_id: String,
    pub language: Language,
    pub forge_type: ForgeType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    /// Source text the learner was responding to; used as the pronunciation
    /// alignment target for audio submissions.
    #[serde(default)]
    pub original_text: Option<String>,
}

impl GradeRequest {
    fn validate(&self) -> Result<(), GradeError> {
        if self.user_id.trim().is_empty() {
            return Err(GradeError::InvalidRequest("missing userId".into()));
        }
        if self.session_id.trim().is_empty() {
            return Err(GradeError::InvalidRequest("missing sessionId".into()));
        }
        let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_audio = self
            .audio_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty());
        match (has_text, has_audio) {
            (false, false) => Err(GradeError::InvalidRequest(
                "either text or audioUrl is required".into(),
            )),
            (true, true) => Err(GradeError::InvalidRequest(
                "provide text or audioUrl, not both".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Prose feedback bundle inside the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackBody {
    pub summary: String,
    pub encouragement: String,
    pub suggestions: Vec<String>,
}

/// The caller-facing grading result. Always produced, even on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResponse {
    pub success: bool,
    #[serde(default)]
    pub submission_id: Option<Uuid>,
    #[serde(default)]
    pub transcript: Option<String>,
    pub scores: ScoreSet,
    pub corrections: Vec<Correction>,
    pub feedback: FeedbackBody,
    #[serde(default)]
    pub audio_quality: Option<AudioQuality>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GradeResponse {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            submission_id: None,
            transcript: None,
            scores: ScoreSet::zero(),
            corrections: Vec::new(),
            feedback: FeedbackBody {
                summary: String::new(),
                encouragement: String::new(),
                suggestions: Vec::new(),
            },
            audio_quality: None,
            error: Some(message),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// All pipeline tunables in one place.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub weights: ScoringWeights,
    pub severity_penalties: SeverityPenalties,
    pub naturalness: NaturalnessScoring,
    pub pronunciation: PronunciationPenalties,
    pub audio_quality: AudioQualityCutoffs,
    pub limits: ContextLimits,
    pub feedback: FeedbackConfig,
    /// Hard wall-clock budget for one request, validation excluded.
    pub request_budget: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            severity_penalties: SeverityPenalties::default(),
            naturalness: NaturalnessScoring::default(),
            pronunciation: PronunciationPenalties::default(),
            audio_quality: AudioQualityCutoffs::default(),
            limits: ContextLimits::default(),
            feedback: FeedbackConfig::default(),
            request_budget: DEFAULT_REQUEST_BUDGET,
        }
    }
}

pub struct GradingPipeline {
    store: Arc<dyn KnowledgeStore>,
    aggregator: ContextAggregator,
    normalizer: AudioNormalizer,
    engine: GradingEngine,
    synthesizer: FeedbackSynthesizer,
    tracker: ProficiencyTracker,
    request_budget: Duration,
}

impl GradingPipeline {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        judge: Arc<dyn TextJudge>,
        transcriber: Arc<dyn SpeechTranscriber>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            aggregator: ContextAggregator::new(store.clone(), config.limits),
            normalizer: AudioNormalizer::new(
                transcriber,
                config.pronunciation,
                config.audio_quality,
            ),
            engine: GradingEngine::new(
                judge,
                config.weights,
                config.severity_penalties,
                config.naturalness,
            ),
            synthesizer: FeedbackSynthesizer::new(config.feedback),
            tracker: ProficiencyTracker::new(store.clone()),
            store,
            request_budget: config.request_budget,
        }
    }

    /// Override the audio polling bounds. Tests use a zero interval.
    pub fn with_audio_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.normalizer = self.normalizer.with_polling(attempts, interval);
        self
    }

    /// Grade one submission. Infallible by contract: failures come back as a
    /// `GradeResponse` with `success: false` and zeroed scores.
    #[tracing::instrument(skip_all, fields(user_id = %request.user_id, language = %request.language, forge_type = %request.forge_type))]
    pub async fn grade(&self, request: GradeRequest) -> GradeResponse {
        // Client errors are reported verbatim, before any pipeline work and
        // outside the request budget.
        if let Err(e) = request.validate() {
            tracing::debug!(error = %e, "request rejected");
            return GradeResponse::failure(e.to_string());
        }

        let result = tokio::time::timeout(self.request_budget, self.run(&request)).await;
        match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_client_error() => {
                tracing::debug!(error = %e, "request rejected");
                GradeResponse::failure(e.to_string())
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "grading request failed");
                GradeResponse::failure(GENERIC_FAILURE_MESSAGE.to_string())
            }
            Err(_) => {
                tracing::error!(budget = ?self.request_budget, "grading request exceeded budget");
                GradeResponse::failure(GENERIC_FAILURE_MESSAGE.to_string())
            }
        }
    }

    async fn run(&self, request: &GradeRequest) -> Result<GradeResponse, GradeError> {
        let context = self
            .aggregator
            .aggregate(&request.user_id, request.language)
            .await?;

        // The raw submission is persisted before any scoring: a crash
        // mid-pipeline still leaves an auditable record.
        let submission = Submission {
            id: Uuid::new_v4(),
            user_id: request.user_id.clone(),
            session_id: request.session_id.clone(),
            language: request.language,
            forge_type: request.forge_type,
            text: request.text.clone(),
            audio_url: request.audio_url.clone(),
            original_text: request.original_text.clone(),
            created_at: Utc::now(),
        };
        self.store
            .create_submission(&submission)
            .await
            .map_err(|e| GradeError::StoreUnavailable(e.to_string()))?;

        // Audio submissions carry no text, so a normalization failure here is
        // fatal: there is nothing to fall back to.
        let audio: Option<AudioAnalysis> = match &request.audio_url {
            Some(url) => Some(
                self.normalizer
                    .normalize(url, request.original_text.as_deref(), request.language)
                    .await?,
            ),
            None => None,
        };

        let text = match (&request.text, &audio) {
            (Some(text), _) => text.clone(),
            (None, Some(analysis)) => analysis.transcript.clone(),
            (None, None) => return Err(GradeError::NoGradableText),
        };

        let output = self.engine.grade(&text, request.language, &context).await?;

        let naturalness_score = output.naturalness.score();
        let scores = ScoreSet {
            overall: self.engine.weights().blend(
                output.grammar_score,
                output.vocabulary_score,
                naturalness_score,
            ),
            grammar: output.grammar_score,
            vocabulary: output.vocabulary_score,
            pronunciation: audio.as_ref().map(|a| a.pronunciation_score).unwrap_or(0),
            fluency: output.fluency_score,
            naturalness: naturalness_score,
        };

        let feedback =
            self.synthesizer
                .synthesize(&output, &context, &text, request.forge_type, &scores);

        let record = GradingRecord {
            id: Uuid::new_v4(),
            submission_id: submission.id,
            user_id: request.user_id.clone(),
            session_id: request.session_id.clone(),
            language: request.language,
            forge_type: request.forge_type,
            text: text.clone(),
            transcript: audio.as_ref().map(|a| a.transcript.clone()),
            scores,
            correction_count: feedback.corrections.len(),
            created_at: Utc::now(),
        };

        // Tracking failures never reach the learner; the score is already
        // computed.
        let outcome = self
            .tracker
            .record(&context, &text, &output, &feedback, record)
            .await;
        if !outcome.failures.is_empty() {
            tracing::warn!(
                failures = outcome.failures.len(),
                "proficiency tracking partially failed"
            );
        }
        tracing::info!(
            submission_id = %submission.id,
            overall = scores.overall,
            patterns = outcome.patterns_updated,
            words = outcome.words_recorded,
            errors = outcome.errors_created,
            "submission graded"
        );

        Ok(GradeResponse {
            success: true,
            submission_id: Some(submission.id),
            transcript: audio.as_ref().map(|a| a.transcript.clone()),
            scores,
            corrections: feedback.corrections,
            feedback: FeedbackBody {
                summary: feedback.summary,
                encouragement: feedback.encouragement,
                suggestions: feedback.suggestions,
            },
            audio_quality: audio.as_ref().map(|a| a.audio_quality),
            error: None,
        })
    }
}
