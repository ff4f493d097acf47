//! End-to-end pipeline tests with mock services and the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use linguaforge_core::model::{ForgeType, GrammarRule, Language, RuleExample, VocabularyTracking};
use linguaforge_core::results::AudioQuality;
use linguaforge_core::store::MemoryStore;
use linguaforge_core::traits::{JudgeCorrection, KnowledgeStore, TranscribedWord, Transcription};
use linguaforge_pipeline::{GradeRequest, GradingPipeline, PipelineConfig};
use linguaforge_providers::{MockJudge, MockTranscriber};

fn pipeline_with(
    store: Arc<MemoryStore>,
    judge: MockJudge,
    transcriber: MockTranscriber,
) -> GradingPipeline {
    GradingPipeline::new(
        store,
        Arc::new(judge),
        Arc::new(transcriber),
        PipelineConfig::default(),
    )
    .with_audio_polling(5, Duration::ZERO)
}

fn silent_transcriber() -> MockTranscriber {
    MockTranscriber::new(Transcription {
        text: String::new(),
        confidence: 0.0,
        words: vec![],
    })
}

fn text_request(user_id: &str, text: &str) -> GradeRequest {
    GradeRequest {
        user_id: user_id.into(),
        session_id: "session-1".into(),
        language: Language::Romanian,
        forge_type: ForgeType::Conversation,
        text: Some(text.into()),
        audio_url: None,
        original_text: None,
    }
}

#[tokio::test]
async fn clean_romanian_text_scores_as_documented() {
    let store = Arc::new(MemoryStore::new());
    // Track both significant words so vocabulary scores 100.
    store.add_vocabulary(VocabularyTracking::new("u1", "merg", Language::Romanian));
    store.add_vocabulary(VocabularyTracking::new("u1", "magazin", Language::Romanian));

    let pipeline = pipeline_with(store.clone(), MockJudge::new(), silent_transcriber());
    let response = pipeline.grade(text_request("u1", "Merg la magazin")).await;

    assert!(response.success, "error: {:?}", response.error);
    assert_eq!(response.scores.grammar, 100);
    assert_eq!(response.scores.vocabulary, 100);
    assert_eq!(response.scores.naturalness, 85);
    // overall = round(0.4*100 + 0.2*100 + 0.4*85) = 94
    assert_eq!(response.scores.overall, 94);
    assert!(response.corrections.is_empty());
    assert!(!response.feedback.summary.is_empty());
    assert!(!response.feedback.encouragement.is_empty());
    assert_eq!(store.submissions().len(), 1);
    assert_eq!(store.grading_records().len(), 1);
}

#[tokio::test]
async fn rule_match_and_judge_finding_flow_into_corrections_and_tracking() {
    let store = Arc::new(MemoryStore::new());
    store.add_grammar_rule(
        Language::Romanian,
        GrammarRule {
            id: "ro-verb-1".into(),
            category: "verb-agreement".into(),
            difficulty_level: 2,
            examples: vec![RuleExample {
                incorrect: "eu merge".into(),
                correct: "eu merg".into(),
                explanation: "first person singular takes merg".into(),
            }],
        },
    );

    let judge = MockJudge::new().with_correction(
        "un casa",
        JudgeCorrection {
            incorrect: "un casa".into(),
            corrected: "o casă".into(),
            explanation: "casa is feminine".into(),
            category: Some("articles".into()),
        },
    );

    let pipeline = pipeline_with(store.clone(), judge, silent_transcriber());
    let response = pipeline
        .grade(text_request("u1", "eu merge la un casa"))
        .await;

    assert!(response.success);
    // One low-severity rule match (difficulty 2) and one medium judge finding:
    // 100 - 5 - 10 = 85.
    assert_eq!(response.scores.grammar, 85);
    assert_eq!(response.corrections.len(), 2);

    // Both issues marked their categories as missed.
    let patterns = store.patterns();
    assert_eq!(patterns.len(), 2);
    assert!(patterns.iter().any(|p| p.category == "verb-agreement"));
    assert!(patterns.iter().any(|p| p.category == "articles"));

    // Both corrections carried real corrected forms, so both became cards.
    let errors = store.error_items("u1", None).await.unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.next_review.is_none()));
}

#[tokio::test]
async fn audio_submission_grades_the_transcript() {
    let store = Arc::new(MemoryStore::new());
    let transcriber = MockTranscriber::new(Transcription {
        text: "merg la magazine".into(),
        confidence: 0.72,
        words: vec![
            TranscribedWord {
                text: "merg".into(),
                confidence: 0.9,
            },
            TranscribedWord {
                text: "la".into(),
                confidence: 0.95,
            },
            TranscribedWord {
                text: "magazine".into(),
                confidence: 0.6,
            },
        ],
    });

    let pipeline = pipeline_with(store.clone(), MockJudge::new(), transcriber);
    let request = GradeRequest {
        user_id: "u1".into(),
        session_id: "session-1".into(),
        language: Language::Romanian,
        forge_type: ForgeType::Pronunciation,
        text: None,
        audio_url: Some("https://audio.test/clip.wav".into()),
        original_text: Some("merg la magazin".into()),
    };
    let response = pipeline.grade(request).await;

    assert!(response.success, "error: {:?}", response.error);
    assert_eq!(response.transcript.as_deref(), Some("merg la magazine"));
    // One medium-confidence mismatch: round(72) - 10 = 62.
    assert_eq!(response.scores.pronunciation, 62);
    assert_eq!(response.audio_quality, Some(AudioQuality::Fair));
    // The transcript, not the expected text, is what got graded and recorded.
    let records = store.grading_records();
    assert_eq!(records[0].text, "merg la magazine");
    assert_eq!(records[0].transcript.as_deref(), Some("merg la magazine"));
}

#[tokio::test]
async fn degraded_judge_still_produces_a_grade() {
    // The MockJudge cannot fail, so degrade through the store-backed path:
    // rules still match while the judge finds nothing. Exercising a hard
    // judge outage lives in the pipeline unit tests; here we check the
    // conservative fallback composition end to end.
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline_with(store, MockJudge::new(), silent_transcriber());
    let response = pipeline.grade(text_request("u1", "text de test")).await;

    assert!(response.success);
    assert_eq!(response.scores.grammar, 100);
    assert_eq!(response.scores.naturalness, 85);
}

#[tokio::test]
async fn invalid_request_invokes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let judge = MockJudge::new();
    let transcriber = silent_transcriber();

    let pipeline = GradingPipeline::new(
        store.clone(),
        Arc::new(judge),
        Arc::new(transcriber),
        PipelineConfig::default(),
    );

    let request = GradeRequest {
        user_id: "u1".into(),
        session_id: "session-1".into(),
        language: Language::Korean,
        forge_type: ForgeType::Blitz,
        text: None,
        audio_url: None,
        original_text: None,
    };
    let response = pipeline.grade(request).await;

    assert!(!response.success);
    assert_eq!(response.scores.overall, 0);
    assert!(response.error.is_some());
    assert!(store.submissions().is_empty());
    assert!(store.grading_records().is_empty());
}

#[tokio::test]
async fn korean_text_round_trip() {
    let store = Arc::new(MemoryStore::new());
    store.set_user_level("u1", Language::Korean, 2);

    let judge = MockJudge::new().with_correction(
        "학교에 공부",
        JudgeCorrection {
            incorrect: "학교에 공부해요".into(),
            corrected: "학교에서 공부해요".into(),
            explanation: "location of an action takes 에서".into(),
            category: Some("particles".into()),
        },
    );

    let pipeline = pipeline_with(store.clone(), judge, silent_transcriber());
    let mut request = text_request("u1", "저는 학교에 공부해요");
    request.language = Language::Korean;
    let response = pipeline.grade(request).await;

    assert!(response.success);
    assert_eq!(response.scores.grammar, 90);
    assert_eq!(response.corrections.len(), 1);
    assert_eq!(response.corrections[0].category, "particles");

    let patterns = store.patterns();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].language, Language::Korean);
}
