//! Core logic for world record history reconstruction.
//!
//! This crate contains:
//! - Time codec: `MM:SS.cc` strings to centiseconds and back
//! - Classification: turning relay chat lines into candidate record entries
//! - Reconciliation: folding candidates into one chronological history per map

pub mod classify;
pub mod history;
pub mod index;
pub mod source;
pub mod time;
pub mod types;

pub use classify::{
    classify, classify_all, normalize_class, parse_irc_record, parse_tempus_record,
};
pub use history::{WrHistory, build_wr_history};
pub use index::{DemoDateIndex, DemoUserIndex};
pub use source::{RecordSource, Segment, UnknownSource};
pub use time::{
    RaceTime, Sign, SignedTime, TimeParseError, format_centiseconds, normalize_signed_time,
    parse_centiseconds,
};
pub use types::{ChatCandidate, Player, RecordType, SteamIdentity, WrHistoryEntry};
