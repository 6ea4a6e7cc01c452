//! Record source tags as the single source of truth for their display strings.
//!
//! Downstream exports compare against these literals, so the `Display` output of
//! [`RecordSource`] must stay byte-for-byte stable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const BONUS_PREFIX: &str = "Bonus ";
pub const COURSE_PREFIX: &str = "Course ";
pub const COURSE_SEGMENT_PREFIX: &str = "C";
pub const FIRST_SUFFIX: &str = " (first)";

pub const MAP_RECORD: &str = "MapRecord";
pub const FIRST_RECORD: &str = "FirstRecord";
pub const MAP_RUN: &str = "MapRun";
pub const IRC: &str = "Irc";
pub const IRC_SET: &str = "IrcSet";
pub const RANKED: &str = "Ranked";
pub const COMPACT: &str = "Compact";
pub const OBSERVED_WR: &str = "ObservedWr";

/// Player name used when a record holder could not be determined.
pub const UNKNOWN_PLAYER: &str = "Unknown";

/// A sub-section of a map with its own record timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Bonus(u32),
    Course(u32),
    /// A named checkpoint inside a course, e.g. `C2 - Wallpogo`.
    CourseSegment { course: u32, name: String },
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bonus(n) => write!(f, "{BONUS_PREFIX}{n}"),
            Self::Course(n) => write!(f, "{COURSE_PREFIX}{n}"),
            Self::CourseSegment { course, name } => {
                write!(f, "{COURSE_SEGMENT_PREFIX}{course} - {name}")
            }
        }
    }
}

impl FromStr for Segment {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownSource(s.to_string());
        if let Some(n) = s.strip_prefix(BONUS_PREFIX) {
            return n.parse().map(Self::Bonus).map_err(|_| unknown());
        }
        if let Some(n) = s.strip_prefix(COURSE_PREFIX) {
            return n.parse().map(Self::Course).map_err(|_| unknown());
        }
        let rest = s.strip_prefix(COURSE_SEGMENT_PREFIX).ok_or_else(unknown)?;
        let (course, name) = rest.split_once(" - ").ok_or_else(unknown)?;
        let course = course.trim().parse().map_err(|_| unknown())?;
        if name.is_empty() {
            return Err(unknown());
        }
        Ok(Self::CourseSegment {
            course,
            name: name.to_string(),
        })
    }
}

/// Where a history entry came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordSource {
    /// "beat the map record" broadcast.
    MapRecord,
    /// "set the first map record" broadcast.
    FirstRecord,
    /// A map run that beat the record, broadcast to bystanders.
    MapRun,
    /// IRC relay record break.
    Irc,
    /// IRC relay first record.
    IrcSet,
    /// Rank 1 reply to a rank query.
    Ranked,
    /// Compact WR listing for a whole map.
    Compact,
    /// Record inferred from an ambiguous map run.
    ObservedWr,
    /// Record on a bonus, course, or course segment.
    Segment { segment: Segment, first: bool },
}

impl RecordSource {
    /// The segment this source is scoped to, if any.
    pub const fn segment(&self) -> Option<&Segment> {
        match self {
            Self::Segment { segment, .. } => Some(segment),
            _ => None,
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MapRecord => MAP_RECORD,
            Self::FirstRecord => FIRST_RECORD,
            Self::MapRun => MAP_RUN,
            Self::Irc => IRC,
            Self::IrcSet => IRC_SET,
            Self::Ranked => RANKED,
            Self::Compact => COMPACT,
            Self::ObservedWr => OBSERVED_WR,
            Self::Segment { segment, first } => {
                write!(f, "{segment}")?;
                if *first { FIRST_SUFFIX } else { "" }
            }
        };
        f.write_str(s)
    }
}

impl FromStr for RecordSource {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            MAP_RECORD => Ok(Self::MapRecord),
            FIRST_RECORD => Ok(Self::FirstRecord),
            MAP_RUN => Ok(Self::MapRun),
            IRC => Ok(Self::Irc),
            IRC_SET => Ok(Self::IrcSet),
            RANKED => Ok(Self::Ranked),
            COMPACT => Ok(Self::Compact),
            OBSERVED_WR => Ok(Self::ObservedWr),
            _ => {
                let (label, first) = s
                    .strip_suffix(FIRST_SUFFIX)
                    .map_or((s, false), |label| (label, true));
                let segment = label.parse().map_err(|_| UnknownSource(s.to_string()))?;
                Ok(Self::Segment { segment, first })
            }
        }
    }
}

impl Serialize for RecordSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unrecognized source strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown record source: {0}")]
pub struct UnknownSource(String);
