//! The `linguaforge grade` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use comfy_table::Table;
use uuid::Uuid;

use linguaforge_core::error::GradeError;
use linguaforge_core::model::ForgeType;
use linguaforge_core::traits::{SpeechTranscriber, Transcription};
use linguaforge_pipeline::{GradeRequest, GradingPipeline, PipelineConfig};
use linguaforge_providers::{create_judge, create_transcriber, load_config_from, MockTranscriber};

use super::{load_store, parse_language, save_store};

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    user: String,
    session: Option<String>,
    language: String,
    forge_type: String,
    text: Option<String>,
    audio: Option<String>,
    original_text: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let language = parse_language(&language)?;
    let forge_type = forge_type
        .parse::<ForgeType>()
        .map_err(|e| anyhow::anyhow!(e))?;

    let judge = create_judge(&config);
    let transcriber: Arc<dyn SpeechTranscriber> = match create_transcriber(&config) {
        Some(t) => t,
        None => {
            if audio.is_some() {
                return Err(anyhow::Error::new(GradeError::MissingCredentials(
                    "speech service".into(),
                ))
                .context(
                    "audio submissions need a speech service; add a [speech] section to \
                     linguaforge.toml or set LINGUAFORGE_SPEECH_KEY",
                ));
            }
            Arc::new(MockTranscriber::new(Transcription {
                text: String::new(),
                confidence: 0.0,
                words: vec![],
            }))
        }
    };

    let store = Arc::new(load_store(&config.state_path)?);
    let pipeline = GradingPipeline::new(
        store.clone(),
        judge,
        transcriber,
        PipelineConfig::default(),
    );

    let request = GradeRequest {
        user_id: user,
        session_id: session.unwrap_or_else(|| Uuid::new_v4().to_string()),
        language,
        forge_type,
        text,
        audio_url: audio,
        original_text,
    };

    let response = pipeline.grade(request).await;
    save_store(&config.state_path, &store)?;

    if !response.success {
        anyhow::bail!(
            "{}",
            response
                .error
                .unwrap_or_else(|| "grading failed".to_string())
        );
    }

    if let Some(transcript) = &response.transcript {
        println!("Transcript: {transcript}");
        if let Some(quality) = response.audio_quality {
            println!("Audio quality: {quality}");
        }
        println!();
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Overall",
        "Grammar",
        "Vocabulary",
        "Pronunciation",
        "Fluency",
        "Naturalness",
    ]);
    table.add_row(vec![
        response.scores.overall.to_string(),
        response.scores.grammar.to_string(),
        response.scores.vocabulary.to_string(),
        response.scores.pronunciation.to_string(),
        response.scores.fluency.to_string(),
        response.scores.naturalness.to_string(),
    ]);
    println!("{table}");

    if !response.corrections.is_empty() {
        println!("\nCorrections:");
        for correction in &response.corrections {
            let recurring = if correction.is_recurring {
                " (recurring)"
            } else {
                ""
            };
            println!(
                "  - \"{}\" → \"{}\"{recurring}",
                correction.incorrect, correction.corrected
            );
            println!("    {}", correction.explanation);
        }
    }

    println!("\n{}", response.feedback.summary);
    println!("{}", response.feedback.encouragement);
    for suggestion in &response.feedback.suggestions {
        println!("  * {suggestion}");
    }

    Ok(())
}
