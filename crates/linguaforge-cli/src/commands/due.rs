//! The `linguaforge due` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use comfy_table::Table;

use linguaforge_core::config::SrsConfig;
use linguaforge_providers::load_config_from;
use linguaforge_srs::SrsScheduler;

use super::{load_store, parse_language_opt};

pub async fn execute(
    user: String,
    language: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let language = parse_language_opt(language.as_deref())?;

    let store = Arc::new(load_store(&config.state_path)?);
    let scheduler = SrsScheduler::new(store, SrsConfig::default());
    let due = scheduler.due_items(&user, language, Utc::now()).await?;

    if due.is_empty() {
        println!("Nothing due. Come back later.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Language", "Your answer", "Correct", "Seen", "Reviews"]);
    for item in &due {
        table.add_row(vec![
            item.id.to_string(),
            item.language.to_string(),
            item.original.clone(),
            item.correct.clone(),
            item.occurrences.to_string(),
            item.review_count.to_string(),
        ]);
    }
    println!("{table}");
    println!("\n{} item(s) due. Review one with:", due.len());
    println!("  linguaforge review --error-id <id> --quality <0-5>");

    Ok(())
}
