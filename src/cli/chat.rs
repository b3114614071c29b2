//! CLI `chat` command: the chat loop in a terminal.

use anyhow::Result;
use std::sync::Arc;

use memchat::chat::{ChatOrchestrator, ChatSession};
use memchat::config::MemchatConfig;
use memchat::health::check_connections;
use memchat::llm::ChatClient;
use memchat::memory::MemoryStore;

const HELP: &str = "Commands: /clear (forget this user's memories), /status (test connections), /quit";

pub async fn chat(config: &MemchatConfig, user_id: &str) -> Result<()> {
    let memory = Arc::new(MemoryStore::connect(config).await);
    let llm = Arc::new(ChatClient::new(&config.llm)?);
    let orchestrator = ChatOrchestrator::new(memory, llm);
    let mut session = ChatSession::new(user_id);

    println!(
        "Chatting as {user_id} (memory: {}, model: {}).",
        orchestrator.memory().backend(),
        orchestrator.llm().model()
    );
    println!("{HELP}\n");

    // stdin reads block, so run them off the async workers.
    while let Some(line) = tokio::task::spawn_blocking(|| super::read_line("🗣️You: ")).await?? {
        match line.as_str() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/clear" => match orchestrator.memory().clear(&session.user_id).await {
                Ok(()) => println!("Memory cleared for {}.", session.user_id),
                Err(e) => eprintln!("Clear failed: {e:#}"),
            },
            "/status" => {
                let report = check_connections(orchestrator.memory(), orchestrator.llm()).await;
                super::status::print_report(&report);
            }
            input => match orchestrator.respond(&mut session, input).await {
                Ok(turn) => println!("🤖Bot: {}\n", turn.reply),
                Err(e) => eprintln!("Error: {e:#}\n"),
            },
        }
    }

    Ok(())
}
