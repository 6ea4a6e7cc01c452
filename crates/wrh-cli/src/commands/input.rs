//! Loading chat rows and demo metadata from JSON Lines files.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use wrh_core::{ChatCandidate, DemoDateIndex, DemoUserIndex, SteamIdentity};

use crate::Config;

/// One demo as described by the demo metadata file.
#[derive(Debug, Deserialize)]
pub struct DemoRecord {
    pub id: i64,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub map: Option<String>,
    #[serde(default)]
    pub users: Vec<DemoUser>,
}

/// A participant of a demo.
#[derive(Debug, Deserialize)]
pub struct DemoUser {
    pub user_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub steam_id: Option<String>,
    #[serde(default)]
    pub steam_id64: Option<i64>,
}

/// Dates, maps and participants of every known demo.
#[derive(Debug, Default)]
pub struct DemoCatalog {
    dates: HashMap<i64, Option<DateTime<Utc>>>,
    maps: HashMap<i64, String>,
    users: HashMap<(i64, i64), SteamIdentity>,
}

impl DemoCatalog {
    pub fn from_records(records: Vec<DemoRecord>) -> Self {
        let mut catalog = Self::default();
        for record in records {
            catalog.dates.insert(record.id, record.date);
            if let Some(map) = record.map {
                catalog.maps.insert(record.id, map);
            }
            for user in record.users {
                catalog.users.insert(
                    (record.id, user.user_id),
                    SteamIdentity {
                        name: user.name,
                        steam_id: user.steam_id,
                        steam_id64: user.steam_id64,
                    },
                );
            }
        }
        catalog
    }

    pub fn map_of(&self, demo_id: i64) -> Option<&str> {
        self.maps.get(&demo_id).map(String::as_str)
    }

    /// Gives rows without a map the map of their demo.
    pub fn fill_maps(&self, candidates: &mut [ChatCandidate]) {
        for candidate in candidates.iter_mut().filter(|c| c.map.is_none()) {
            candidate.map = self.map_of(candidate.demo_id).map(String::from);
        }
    }
}

impl DemoDateIndex for DemoCatalog {
    fn demo_date(&self, demo_id: i64) -> Option<NaiveDate> {
        self.dates.demo_date(demo_id)
    }
}

impl DemoUserIndex for DemoCatalog {
    fn resolve_user(&self, demo_id: i64, user_id: i64) -> Option<SteamIdentity> {
        self.users.resolve_user(demo_id, user_id)
    }
}

/// Loads chat rows and the demo catalog for a command.
///
/// `demos` overrides the configured demo metadata file. Without either, the
/// catalog is empty and rows keep only the map they carry themselves.
pub fn load_inputs(
    chat: &Path,
    demos: Option<&Path>,
    config: &Config,
) -> Result<(Vec<ChatCandidate>, DemoCatalog)> {
    let mut candidates: Vec<ChatCandidate> = load_jsonl(chat)?;

    let catalog = match demos.or(config.demos_path.as_deref()) {
        Some(path) => DemoCatalog::from_records(load_jsonl(path)?),
        None => DemoCatalog::default(),
    };
    catalog.fill_maps(&mut candidates);

    let unmapped = candidates.iter().filter(|c| c.map.is_none()).count();
    if unmapped > 0 {
        tracing::warn!(
            unmapped,
            "chat rows without a known map; only IRC records can be read from them"
        );
    }

    tracing::debug!(rows = candidates.len(), "loaded chat rows");
    Ok((candidates, catalog))
}

/// Reads a JSON Lines file, `-` meaning stdin.
pub fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if path.as_os_str() == "-" {
        let stdin = io::stdin();
        return parse_jsonl(stdin.lock()).context("failed to read stdin");
    }
    let file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_jsonl(BufReader::new(file)).with_context(|| format!("failed to read {}", path.display()))
}

fn parse_jsonl<T: DeserializeOwned, R: BufRead>(reader: R) -> Result<Vec<T>> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let row = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        rows.push(row);
    }
    Ok(rows)
}
