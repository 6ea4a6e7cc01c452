//! History command: the reconciled record history of every map.

use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use wrh_core::{WrHistoryEntry, build_wr_history, classify_all};

use super::input::load_inputs;
use crate::Config;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Chat rows as JSON Lines, `-` for stdin.
    pub chat: PathBuf,

    /// Demo metadata as JSON Lines (dates, maps, participants).
    #[arg(long)]
    pub demos: Option<PathBuf>,

    /// Only show the history of this map.
    #[arg(long)]
    pub map: Option<String>,

    /// Keep lookups and observed records whose holder is unknown.
    #[arg(long)]
    pub all: bool,

    /// Output as JSON Lines.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &HistoryArgs, config: &Config) -> Result<()> {
    let (candidates, catalog) = load_inputs(&args.chat, args.demos.as_deref(), config)?;
    let include_all = args.all || config.include_all;

    let entries = classify_all(&candidates, &catalog, &catalog);
    let history = build_wr_history(entries, include_all);

    let selected: Vec<&WrHistoryEntry> = match args.map.as_deref() {
        Some(map) => history.for_map(map).collect(),
        None => history.iter().collect(),
    };

    if args.json {
        for entry in selected {
            serde_json::to_writer(&mut *writer, entry).context("failed to serialize entry")?;
            writeln!(writer)?;
        }
    } else {
        write!(writer, "{}", format_history(&selected))?;
    }
    Ok(())
}

// ========== Human-Readable Output ==========

/// Format history entries as a table.
pub fn format_history(entries: &[&WrHistoryEntry]) -> String {
    let mut output = String::new();

    writeln!(output, "WR HISTORY").unwrap();
    writeln!(output).unwrap();

    if entries.is_empty() {
        writeln!(output, "No records found.").unwrap();
        return output;
    }

    let header = format_row(
        "Date", "Map", "Source", "Time", "Player", "Class", "Split", "Notes",
    );
    writeln!(output, "{header}").unwrap();
    writeln!(
        output,
        "──────────  ────────────────  ────────────────  ──────────  ────────────────  ─────  ──────────  ─────"
    )
    .unwrap();

    for entry in entries {
        let date = entry
            .date
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        let split = entry.split.map(|s| s.to_string()).unwrap_or_default();
        let notes = [(entry.inferred, "inferred"), (entry.is_lookup, "lookup")]
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, label)| *label)
            .collect::<Vec<_>>()
            .join(",");
        let row = format_row(
            &date,
            &entry.map,
            &entry.source.to_string(),
            &entry.record_time.to_string(),
            entry.player.as_str(),
            &entry.class,
            &split,
            &notes,
        );
        writeln!(output, "{row}").unwrap();
    }

    output
}

#[expect(
    clippy::too_many_arguments,
    reason = "one argument per table column"
)]
fn format_row(
    date: &str,
    map: &str,
    source: &str,
    time: &str,
    player: &str,
    class: &str,
    split: &str,
    notes: &str,
) -> String {
    format!(
        "{date:<10}  {map:<16}  {source:<16}  {time:>10}  {player:<16}  {class:<5}  {split:>10}  {notes}"
    )
    .trim_end()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use wrh_core::{Player, RecordSource};

    fn entry(player: Player, source: RecordSource, time: &str, day: u32) -> WrHistoryEntry {
        WrHistoryEntry {
            date: NaiveDate::from_ymd_opt(2022, 3, day),
            ..WrHistoryEntry::new(player, "Solly", "jump_beef", source, time.parse().unwrap())
        }
    }

    #[test]
    fn test_history_empty() {
        let output = format_history(&[]);
        assert_snapshot!(output, @r"
        WR HISTORY

        No records found.
        ");
    }

    #[test]
    fn test_history_table() {
        let direct = WrHistoryEntry {
            split: Some("-00:00.10".parse().unwrap()),
            ..entry(
                Player::Known("Holder0".into()),
                RecordSource::MapRecord,
                "00:40.00",
                1,
            )
        };
        let observed = WrHistoryEntry {
            inferred: true,
            ..entry(Player::Unknown, RecordSource::ObservedWr, "00:39.90", 2)
        };

        let output = format_history(&[&direct, &observed]);
        assert_snapshot!(output, @r"
        WR HISTORY

        Date        Map               Source                  Time  Player            Class       Split  Notes
        ──────────  ────────────────  ────────────────  ──────────  ────────────────  ─────  ──────────  ─────
        2022-03-01  jump_beef         MapRecord           00:40.00  Holder0           Solly   -00:00.10
        2022-03-02  jump_beef         ObservedWr          00:39.90  Unknown           Solly              inferred
        ");
    }
}
