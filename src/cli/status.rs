//! CLI `status` command: run the connection test and print a report.

use anyhow::{bail, Result};

use memchat::config::MemchatConfig;
use memchat::health::{check_connections, ConnectionReport};
use memchat::llm::ChatClient;
use memchat::memory::MemoryStore;

pub async fn status(config: &MemchatConfig) -> Result<()> {
    let memory = MemoryStore::connect(config).await;
    let llm = ChatClient::new(&config.llm)?;
    let report = check_connections(&memory, &llm).await;

    print_report(&report);

    if !report.all_ok() {
        bail!("connection test failed");
    }
    Ok(())
}

pub(crate) fn print_report(report: &ConnectionReport) {
    let mark = |ok: bool| if ok { "OK" } else { "FAILED" };

    println!("memchat connection test");
    println!("=======================");
    println!();
    println!("Memory backend:    {}", report.backend);
    println!("Memory:            {} ({})", mark(report.memory.ok), report.memory.detail);
    println!("Language model:    {} ({})", mark(report.llm.ok), report.llm.detail);
}
