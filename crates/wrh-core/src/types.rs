//! Chat rows going in, history entries coming out.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::source::{RecordSource, UNKNOWN_PLAYER};
use crate::time::{RaceTime, SignedTime};

/// One raw chat line extracted from a demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCandidate {
    /// Demo the line was recorded in.
    pub demo_id: i64,
    /// Map the demo is known to be on. IRC lines name their own map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    /// The raw chat text.
    pub text: String,
    /// Position of the line within the demo.
    pub chat_index: i64,
    /// In-demo tick of the line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick: Option<i64>,
    /// Speaker of the line, used to look up a Steam identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user_id: Option<i64>,
}

/// The holder of a record.
///
/// Serialized as the plain name, with [`UNKNOWN_PLAYER`] standing in for
/// [`Player::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Player {
    Known(String),
    Unknown,
}

impl Player {
    /// Builds a player from a parsed name; blank names are unknown.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() {
            Self::Unknown
        } else {
            Self::Known(name.to_string())
        }
    }

    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(name) => name,
            Self::Unknown => UNKNOWN_PLAYER,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Player {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Player {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == UNKNOWN_PLAYER {
            Ok(Self::Unknown)
        } else {
            Ok(Self::from_name(&s))
        }
    }
}

/// Kind of record an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecordType {
    /// World record.
    #[default]
    Wr,
}

/// Steam identity of a demo participant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SteamIdentity {
    /// In-game name at the time of the demo, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_id64: Option<i64>,
}

/// A world record fact, either classified from a single chat line or
/// reconciled from several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrHistoryEntry {
    pub player: Player,
    /// Normalized class label, e.g. `Solly`.
    pub class: String,
    pub map: String,
    #[serde(default)]
    pub record_type: RecordType,
    pub source: RecordSource,
    pub record_time: RaceTime,
    /// Time of the run itself when it differs from the record it produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time: Option<RaceTime>,
    /// Signed delta against the previous record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<SignedTime>,
    /// Unsigned delta against the previous record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement: Option<RaceTime>,
    /// Holder or time was derived rather than stated directly.
    #[serde(default)]
    pub inferred: bool,
    /// The line restates known state (bot command output) instead of
    /// announcing a live event.
    #[serde(default)]
    pub is_lookup: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_id64: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_id: Option<String>,
}

impl WrHistoryEntry {
    /// Creates a direct, non-lookup entry with no provenance.
    pub fn new(
        player: Player,
        class: impl Into<String>,
        map: impl Into<String>,
        source: RecordSource,
        record_time: RaceTime,
    ) -> Self {
        Self {
            player,
            class: class.into(),
            map: map.into(),
            record_type: RecordType::Wr,
            source,
            record_time,
            run_time: None,
            split: None,
            improvement: None,
            inferred: false,
            is_lookup: false,
            date: None,
            demo_id: None,
            chat_index: None,
            steam_id64: None,
            steam_id: None,
        }
    }

    /// Copies an identity onto this entry, leaving absent ids untouched.
    pub fn apply_identity(&mut self, identity: &SteamIdentity) {
        if identity.steam_id.is_some() {
            self.steam_id.clone_from(&identity.steam_id);
        }
        if identity.steam_id64.is_some() {
            self.steam_id64 = identity.steam_id64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> WrHistoryEntry {
        let mut entry = WrHistoryEntry::new(
            Player::from_name("Holder1"),
            "Solly",
            "jump_beef",
            RecordSource::MapRecord,
            "00:40.00".parse().unwrap(),
        );
        entry.split = Some("-00:00.10".parse().unwrap());
        entry.date = NaiveDate::from_ymd_opt(2021, 3, 4);
        entry.demo_id = Some(3_718_446);
        entry
    }

    #[test]
    fn player_from_blank_name_is_unknown() {
        assert_eq!(Player::from_name("  "), Player::Unknown);
        assert_eq!(Player::from_name(" alle "), Player::Known("alle".into()));
        assert_eq!(Player::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn player_serde_uses_sentinel() {
        let json = serde_json::to_string(&Player::Unknown).unwrap();
        assert_eq!(json, "\"Unknown\"");
        let parsed: Player = serde_json::from_str("\"Unknown\"").unwrap();
        assert_eq!(parsed, Player::Unknown);
        let parsed: Player = serde_json::from_str("\"\"").unwrap();
        assert_eq!(parsed, Player::Unknown);
    }

    #[test]
    fn entry_serialization_roundtrip() {
        let entry = sample_entry();
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: WrHistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn entry_json_uses_canonical_strings() {
        let value = serde_json::to_value(sample_entry()).unwrap();
        assert_eq!(value["player"], "Holder1");
        assert_eq!(value["record_type"], "Wr");
        assert_eq!(value["source"], "MapRecord");
        assert_eq!(value["record_time"], "00:40.00");
        assert_eq!(value["split"], "-00:00.10");
        assert_eq!(value["date"], "2021-03-04");
        assert!(value.get("steam_id64").is_none());
    }

    #[test]
    fn candidate_optional_fields_default() {
        let json = r#"{"demo_id": 7, "text": "hello", "chat_index": 3}"#;
        let candidate: ChatCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.demo_id, 7);
        assert_eq!(candidate.map, None);
        assert_eq!(candidate.from_user_id, None);
    }

    #[test]
    fn apply_identity_keeps_existing_ids() {
        let mut entry = sample_entry();
        entry.steam_id = Some("STEAM_0:1:1".into());
        entry.apply_identity(&SteamIdentity {
            name: None,
            steam_id: None,
            steam_id64: Some(456),
        });
        assert_eq!(entry.steam_id.as_deref(), Some("STEAM_0:1:1"));
        assert_eq!(entry.steam_id64, Some(456));
    }
}
