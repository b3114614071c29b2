pub mod chat;
pub mod memory;
pub mod status;

use anyhow::Result;
use std::io::Write;

/// Print `prompt` and read one trimmed line from stdin. `None` on EOF.
pub(crate) fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}
