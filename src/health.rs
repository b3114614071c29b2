//! Connection test for both upstream services.

use serde::Serialize;

use crate::llm::ChatClient;
use crate::memory::{BackendKind, MemoryStore};

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub ok: bool,
    pub detail: String,
}

impl CheckResult {
    fn from_outcome<E: std::fmt::Display>(outcome: Result<(), E>, ok_detail: String) -> Self {
        match outcome {
            Ok(()) => Self {
                ok: true,
                detail: ok_detail,
            },
            Err(e) => Self {
                ok: false,
                detail: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub backend: BackendKind,
    pub memory: CheckResult,
    pub llm: CheckResult,
}

impl ConnectionReport {
    pub fn all_ok(&self) -> bool {
        self.memory.ok && self.llm.ok
    }
}

/// Ping the selected memory backend and the model provider concurrently.
pub async fn check_connections(memory: &MemoryStore, llm: &ChatClient) -> ConnectionReport {
    let (memory_outcome, llm_outcome) = tokio::join!(memory.check(), llm.check());

    let memory_check = CheckResult::from_outcome(
        memory_outcome.map_err(|e| format!("{e:#}")),
        format!("{} reachable at {}", memory.backend(), memory.location()),
    );
    let llm_check = CheckResult::from_outcome(
        llm_outcome,
        format!("model {} at {}", llm.model(), llm.base_url()),
    );

    tracing::info!(
        backend = %memory.backend(),
        memory_ok = memory_check.ok,
        llm_ok = llm_check.ok,
        "connection test"
    );

    ConnectionReport {
        backend: memory.backend(),
        memory: memory_check,
        llm: llm_check,
    }
}
