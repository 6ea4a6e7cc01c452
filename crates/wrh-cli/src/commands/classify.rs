//! Classify command: chat rows in, raw record entries out.
//!
//! Entries are printed as classified, one JSON object per line, without any
//! reconciliation. Useful for checking how individual messages are read.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use wrh_core::classify_all;

use super::input::load_inputs;
use crate::Config;

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Chat rows as JSON Lines, `-` for stdin.
    pub chat: PathBuf,

    /// Demo metadata as JSON Lines (dates, maps, participants).
    #[arg(long)]
    pub demos: Option<PathBuf>,

    /// Only print entries for this map.
    #[arg(long)]
    pub map: Option<String>,
}

/// Returns the number of entries written.
pub fn run<W: Write>(writer: &mut W, args: &ClassifyArgs, config: &Config) -> Result<usize> {
    let (candidates, catalog) = load_inputs(&args.chat, args.demos.as_deref(), config)?;

    let mut written = 0;
    for entry in classify_all(&candidates, &catalog, &catalog)
        .iter()
        .filter(|e| args.map.as_deref().is_none_or(|map| e.map == map))
    {
        serde_json::to_writer(&mut *writer, entry).context("failed to serialize entry")?;
        writeln!(writer)?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use wrh_core::WrHistoryEntry;

    #[test]
    fn classify_prints_only_record_lines() {
        let temp = tempfile::tempdir().unwrap();
        let chat = temp.path().join("chat.jsonl");
        fs::write(
            &chat,
            concat!(
                r#"{"demo_id":1,"map":"jump_beef","text":"Tempus | (Solly) Boshy beat the map record: 00:40.00!","chat_index":0}"#,
                "\n",
                r#"{"demo_id":1,"map":"jump_beef","text":"gg","chat_index":1}"#,
                "\n",
                r#"{"demo_id":1,"map":"jump_beef","text":"[IRC] (Demo) Alle set jump_new WR: 00:30.00!","chat_index":2}"#,
                "\n",
            ),
        )
        .unwrap();

        let args = ClassifyArgs {
            chat: chat.clone(),
            demos: None,
            map: None,
        };
        let mut output = Vec::new();
        let written = run(&mut output, &args, &Config::default()).unwrap();
        assert_eq!(written, 2);

        let output = String::from_utf8(output).unwrap();
        let entries: Vec<WrHistoryEntry> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries[0].map, "jump_beef");
        assert_eq!(entries[1].map, "jump_new");

        let args = ClassifyArgs {
            chat,
            demos: None,
            map: Some("jump_new".into()),
        };
        let mut output = Vec::new();
        assert_eq!(run(&mut output, &args, &Config::default()).unwrap(), 1);
    }
}
