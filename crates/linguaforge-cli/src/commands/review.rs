//! The `linguaforge review` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use linguaforge_core::config::SrsConfig;
use linguaforge_providers::load_config_from;
use linguaforge_srs::SrsScheduler;

use super::{load_store, save_store};

pub async fn execute(error_id: String, quality: i32, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let error_id = Uuid::parse_str(&error_id).context("invalid error id")?;

    let store = Arc::new(load_store(&config.state_path)?);
    let scheduler = SrsScheduler::new(store.clone(), SrsConfig::default());

    let item = scheduler.review(error_id, quality, Utc::now()).await?;
    save_store(&config.state_path, &store)?;

    println!("Reviewed \"{}\" → \"{}\"", item.original, item.correct);
    println!("  interval: {} day(s)", item.interval_days);
    println!("  ease factor: {:.2}", item.ease_factor);
    match item.next_review {
        Some(due) => println!("  next review: {}", due.format("%Y-%m-%d %H:%M UTC")),
        None => println!("  next review: now"),
    }

    Ok(())
}
