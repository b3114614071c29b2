//! CLI `memory` commands: inspect or wipe a user's stored memories.

use anyhow::{bail, Result};

use memchat::config::MemchatConfig;
use memchat::memory::MemoryStore;

pub async fn search(config: &MemchatConfig, user_id: &str, query: &str) -> Result<()> {
    let memory = MemoryStore::connect(config).await;
    let results = memory.search(user_id, query).await?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s) for {user_id} ({}):\n", results.len(), memory.backend());
    for (i, text) in results.iter().enumerate() {
        println!("  {}. {}", i + 1, preview(text));
    }
    Ok(())
}

pub async fn list(config: &MemchatConfig, user_id: &str) -> Result<()> {
    let memory = MemoryStore::connect(config).await;
    let entries = memory.list(user_id).await?;

    if entries.is_empty() {
        println!("No memories stored for {user_id}.");
        return Ok(());
    }

    println!("{} memories for {user_id} ({}):\n", entries.len(), memory.backend());
    for (i, text) in entries.iter().enumerate() {
        println!("  {}. {}", i + 1, preview(text));
    }
    Ok(())
}

/// Delete all memories for a user after confirmation (skipped with `--yes`).
pub async fn clear(config: &MemchatConfig, user_id: &str, yes: bool) -> Result<()> {
    let memory = MemoryStore::connect(config).await;

    if !yes {
        println!(
            "This will permanently delete ALL memories for {user_id} ({} backend: {}).",
            memory.backend(),
            memory.location()
        );
        let answer = super::read_line("\nType YES to confirm: ")?;
        if answer.as_deref() != Some("YES") {
            bail!("clear cancelled");
        }
    }

    memory.clear(user_id).await?;
    println!("Memories for {user_id} cleared.");
    Ok(())
}

fn preview(text: &str) -> String {
    const MAX: usize = 120;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
