//! The `linguaforge stats` command.

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
    let stats = scheduler.stats(&user, language, Utc::now()).await?;

    let mut table = Table::new();
    table.set_header(vec![
        "Total errors",
        "Due today",
        "Due this week",
        "New",
        "Learning",
        "Mastered",
    ]);
    table.add_row(vec![
        stats.total_errors.to_string(),
        stats.due_today.to_string(),
        stats.due_this_week.to_string(),
        stats.new_items.to_string(),
        stats.learning.to_string(),
        stats.mastered.to_string(),
    ]);
    println!("{table}");

    Ok(())
}
