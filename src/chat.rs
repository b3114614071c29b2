//! One conversational turn: recall memories, prompt the model, remember the
//! exchange.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::llm::{ChatClient, ChatMessage};
use crate::memory::MemoryStore;

/// Conversation state for one UI session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatSession {
    pub user_id: String,
    pub history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            history: Vec::new(),
        }
    }
}

/// Outcome of a successful turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub reply: String,
    /// Memories that were injected into the system prompt.
    pub memories: Vec<String>,
}

/// System prompt carrying recalled memories.
pub fn memory_system_prompt(memories: &[String]) -> String {
    let mem_text = memories
        .iter()
        .map(|m| format!("- {m}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Here are relevant user memories:\n{mem_text}\n\nNow respond to the user's message.")
}

/// System prompt, then prior history in order, then the new user message.
pub fn build_messages(memories: &[String], history: &[ChatMessage], input: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(memory_system_prompt(memories)));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(input));
    messages
}

#[derive(Clone)]
pub struct ChatOrchestrator {
    memory: Arc<MemoryStore>,
    llm: Arc<ChatClient>,
}

impl ChatOrchestrator {
    pub fn new(memory: Arc<MemoryStore>, llm: Arc<ChatClient>) -> Self {
        Self { memory, llm }
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn llm(&self) -> &ChatClient {
        &self.llm
    }

    /// Run a turn for `session`. On error the session history is unchanged.
    ///
    /// Memory failures degrade the turn (no recalled context, exchange not
    /// persisted) but do not fail it; model failures do.
    pub async fn respond(&self, session: &mut ChatSession, input: &str) -> Result<ChatTurn> {
        let input = input.trim();
        if input.is_empty() {
            bail!("message must not be empty");
        }

        let user_id = session.user_id.as_str();
        let memories = match self.memory.search(user_id, input).await {
            Ok(memories) => memories,
            Err(e) => {
                tracing::warn!(user_id, error = %format!("{e:#}"), "memory search failed, continuing without context");
                Vec::new()
            }
        };
        tracing::info!(
            user_id,
            input_len = input.len(),
            recalled = memories.len(),
            history = session.history.len(),
            "chat turn"
        );

        let messages = build_messages(&memories, &session.history, input);
        let reply = self
            .llm
            .complete(&messages)
            .await
            .context("language model call failed")?;

        let exchange = [ChatMessage::user(input), ChatMessage::assistant(reply.clone())];
        session.history.extend(exchange.iter().cloned());

        if let Err(e) = self.memory.add_exchange(user_id, &exchange).await {
            tracing::warn!(user_id, error = %format!("{e:#}"), "failed to persist exchange to memory");
        }

        Ok(ChatTurn { reply, memories })
    }
}
