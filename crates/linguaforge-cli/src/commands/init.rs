//! The `linguaforge init` command.

use anyhow::Result;

use linguaforge_core::model::{GrammarRule, Language, RuleExample};
use linguaforge_core::store::{LanguageRules, MemoryStore, StoreSnapshot};

use super::save_store;

pub fn execute() -> Result<()> {
    // Create linguaforge.toml
    if std::path::Path::new("linguaforge.toml").exists() {
        println!("linguaforge.toml already exists, skipping.");
    } else {
        std::fs::write("linguaforge.toml", SAMPLE_CONFIG)?;
        println!("Created linguaforge.toml");
    }

    // Seed the state file with starter grammar rules
    let state_path = std::path::Path::new("linguaforge-state.json");
    if state_path.exists() {
        println!("linguaforge-state.json already exists, skipping.");
    } else {
        let store = MemoryStore::from_snapshot(seed_snapshot());
        save_store(state_path, &store)?;
        println!("Created linguaforge-state.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit linguaforge.toml with your API keys (or skip for offline mode)");
    println!("  2. Grade something:");
    println!("     linguaforge grade --user you --language romanian --text \"Merg la magazin\"");
    println!("  3. See what's due: linguaforge due --user you");

    Ok(())
}

fn seed_snapshot() -> StoreSnapshot {
    StoreSnapshot {
        grammar_rules: vec![
            LanguageRules {
                language: Language::Romanian,
                rules: vec![
                    GrammarRule {
                        id: "ro-gender-article".into(),
                        category: "articles".into(),
                        difficulty_level: 2,
                        examples: vec![RuleExample {
                            incorrect: "un casa".into(),
                            correct: "o casă".into(),
                            explanation: "casă is feminine and takes the article o".into(),
                        }],
                    },
                    GrammarRule {
                        id: "ro-verb-agreement".into(),
                        category: "verb-agreement".into(),
                        difficulty_level: 3,
                        examples: vec![RuleExample {
                            incorrect: "eu merge".into(),
                            correct: "eu merg".into(),
                            explanation: "first person singular of a merge is merg".into(),
                        }],
                    },
                ],
            },
            LanguageRules {
                language: Language::Korean,
                rules: vec![GrammarRule {
                    id: "ko-location-particle".into(),
                    category: "particles".into(),
                    difficulty_level: 3,
                    examples: vec![RuleExample {
                        incorrect: "학교에 공부해요".into(),
                        correct: "학교에서 공부해요".into(),
                        explanation: "the location of an action takes 에서, not 에".into(),
                    }],
                }],
            },
        ],
        ..StoreSnapshot::default()
    }
}

const SAMPLE_CONFIG: &str = r#"# linguaforge configuration

state_path = "./linguaforge-state.json"

# Uncomment to enable the LLM grammar/naturalness judge.
# [judge]
# api_key = "${OPENAI_API_KEY}"
# model = "gpt-4.1-mini"

# Uncomment to enable audio submissions.
# [speech]
# api_key = "${ASSEMBLYAI_API_KEY}"
"#;
