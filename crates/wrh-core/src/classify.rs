//! Chat line classification.
//!
//! Turns a single chat line into a candidate [`WrHistoryEntry`] by matching it
//! against a table of known server message templates. Lines that match no
//! template are not errors; they simply produce no entry.
//!
//! Two relays are understood:
//! - the in-game bot, `Tempus | (Class) ...`
//! - the IRC relay, `[IRC] (Class) ...`, which names the map in the text

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::{Captures, Regex};

use crate::index::{DemoDateIndex, DemoUserIndex};
use crate::source::{RecordSource, Segment};
use crate::time::{RaceTime, SignedTime};
use crate::types::{ChatCandidate, Player, WrHistoryEntry};

/// Prefix of messages printed by the in-game records bot.
pub const TEMPUS_PREFIX: &str = "Tempus | ";

/// Prefix of messages relayed from IRC.
pub const IRC_PREFIX: &str = "[IRC] ";

/// Splits `(Class) body` after the relay prefix.
static LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((?P<class>[^()]+)\) (?P<body>.+)$").unwrap());

/// Whether a message is safe to attribute to its speaker's Steam identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attribution {
    /// The holder is the speaker of the line.
    Speaker,
    /// Broadcast about someone else, or relayed; never attribute.
    Withheld,
}

/// Fields extracted by a template before provenance is attached.
#[derive(Debug)]
struct Draft {
    player: Player,
    /// Map named in the text itself, overriding the demo's map.
    map: Option<String>,
    source: RecordSource,
    record_time: RaceTime,
    run_time: Option<RaceTime>,
    split: Option<SignedTime>,
    improvement: Option<RaceTime>,
    inferred: bool,
    is_lookup: bool,
    attribution: Attribution,
}

impl Draft {
    fn live(player: &str, source: RecordSource, record_time: RaceTime) -> Self {
        Self {
            player: Player::from_name(player),
            map: None,
            source,
            record_time,
            run_time: None,
            split: None,
            improvement: None,
            inferred: false,
            is_lookup: false,
            attribution: Attribution::Speaker,
        }
    }

    fn lookup(player: &str, map: &str, source: RecordSource, record_time: RaceTime) -> Self {
        Self {
            map: Some(map.to_string()),
            is_lookup: true,
            attribution: Attribution::Withheld,
            ..Self::live(player, source, record_time)
        }
    }
}

/// A message shape and how to read it.
struct Template {
    name: &'static str,
    regex: LazyLock<Regex>,
    /// Receives the captures of `regex` on the body and the raw class label.
    build: fn(&Captures<'_>, &str) -> Option<Draft>,
}

static TEMPUS_TEMPLATES: [Template; 9] = [
    Template {
        name: "compact",
        regex: LazyLock::new(|| {
            Regex::new(
                r"^(?P<map>[^\s/]+)(?:/(?P<segment>.+?))? :: (?P<time>[\d:.]+) :: (?P<holder>.+)$",
            )
            .unwrap()
        }),
        build: build_compact,
    },
    Template {
        name: "ranked",
        regex: LazyLock::new(|| {
            Regex::new(
                r"^(?P<player>.+?) is ranked (?P<rank>\d+)/\d+ on (?P<map>\S+)(?: (?P<segment>.+?))? with time: (?P<time>[\d:.]+)$",
            )
            .unwrap()
        }),
        build: build_ranked,
    },
    Template {
        name: "map_record",
        regex: LazyLock::new(|| {
            Regex::new(
                r"^(?P<player>.+?) beat the map record: (?P<time>[\d:.]+)(?: \((?:(?:SR|PR|WR) )?(?P<split>[+-]?[\d:.]+)\))?(?:\s*\|\s*(?P<improvement>[\d:.]+) improvement)?!?$",
            )
            .unwrap()
        }),
        build: build_map_record,
    },
    Template {
        name: "first_record",
        regex: LazyLock::new(|| {
            Regex::new(r"^(?P<player>.+?) set the first map record: (?P<time>[\d:.]+)!?$")
                .unwrap()
        }),
        build: build_first_record,
    },
    Template {
        name: "zone_break",
        regex: LazyLock::new(|| {
            Regex::new(
                r"^(?P<player>.+?) broke (?P<kind>Bonus|Course) (?P<num>\d+) (?P<time>[\d:.]+) \(WR (?P<split>[+-]?[\d:.]+)\)(?:\s*\|\s*(?P<improvement>[\d:.]+) improvement)?!?$",
            )
            .unwrap()
        }),
        build: build_zone_break,
    },
    Template {
        name: "zone_set",
        regex: LazyLock::new(|| {
            Regex::new(
                r"^(?P<player>.+?) set (?P<kind>Bonus|Course) (?P<num>\d+) (?P<time>[\d:.]+)!$",
            )
            .unwrap()
        }),
        build: build_zone_set,
    },
    Template {
        name: "course_segment_break",
        regex: LazyLock::new(|| {
            Regex::new(
                r"^(?P<player>.+?) broke C ?(?P<num>\d+) - (?P<name>.+?) (?P<time>[\d:.]+) \(WR (?P<split>[+-]?[\d:.]+)\)(?:\s*\|\s*(?P<improvement>[\d:.]+) improvement)?!?$",
            )
            .unwrap()
        }),
        build: build_course_segment_break,
    },
    Template {
        name: "course_segment_set",
        regex: LazyLock::new(|| {
            Regex::new(r"^(?P<player>.+?) set C ?(?P<num>\d+) - (?P<name>.+?) (?P<time>[\d:.]+)!$")
                .unwrap()
        }),
        build: build_course_segment_set,
    },
    Template {
        name: "map_run",
        regex: LazyLock::new(|| {
            Regex::new(
                r"^(?P<player>.+?) map run (?P<time>[\d:.]+) \(WR (?P<split>[+-]?[\d:.]+)\)(?:\s*\|.*)?!?$",
            )
            .unwrap()
        }),
        build: build_map_run,
    },
];

static IRC_TEMPLATES: [Template; 2] = [
    Template {
        name: "irc_break",
        regex: LazyLock::new(|| {
            Regex::new(
                r"^(?P<player>.+?) broke (?P<map>\S+) WR: (?P<time>[\d:.]+) \(WR (?P<split>[+-]?[\d:.]+)\)!?$",
            )
            .unwrap()
        }),
        build: build_irc_break,
    },
    Template {
        name: "irc_set",
        regex: LazyLock::new(|| {
            Regex::new(r"^(?P<player>.+?) set (?P<map>\S+) WR: (?P<time>[\d:.]+)!?$").unwrap()
        }),
        build: build_irc_set,
    },
];

/// Maps long class names to the labels used in exports.
///
/// Labels outside the table are returned unchanged. A trailing ` WR`, as seen in
/// compact listings, is dropped first.
pub fn normalize_class(label: &str) -> String {
    let label = label.trim();
    let label = label.strip_suffix(" WR").unwrap_or(label).trim_end();
    let short = match label.to_ascii_lowercase().as_str() {
        "soldier" => "Solly",
        "demoman" => "Demo",
        "engineer" => "Engi",
        "heavy" | "heavyweapons" => "Heavy",
        _ => label,
    };
    short.to_string()
}

/// Classifies a line printed by the in-game records bot.
///
/// `map_hint` names the map for messages that do not mention one; it falls
/// back to `candidate.map`.
pub fn parse_tempus_record<D, U>(
    candidate: &ChatCandidate,
    map_hint: Option<&str>,
    demo_dates: &D,
    demo_users: &U,
) -> Option<WrHistoryEntry>
where
    D: DemoDateIndex + ?Sized,
    U: DemoUserIndex + ?Sized,
{
    let rest = candidate.text.strip_prefix(TEMPUS_PREFIX)?;
    let map_hint = map_hint.or(candidate.map.as_deref());
    parse_with(&TEMPUS_TEMPLATES, rest, candidate, map_hint, demo_dates, demo_users)
}

/// Classifies a line relayed from IRC.
///
/// The map always comes from the message text; `map_hint` is only compared
/// against it for diagnostics, since the relay reports records from every
/// server.
pub fn parse_irc_record<D, U>(
    candidate: &ChatCandidate,
    map_hint: Option<&str>,
    demo_dates: &D,
    demo_users: &U,
) -> Option<WrHistoryEntry>
where
    D: DemoDateIndex + ?Sized,
    U: DemoUserIndex + ?Sized,
{
    let rest = candidate.text.strip_prefix(IRC_PREFIX)?;
    let entry = parse_with(&IRC_TEMPLATES, rest, candidate, None, demo_dates, demo_users)?;
    if let Some(hint) = map_hint.filter(|hint| *hint != entry.map) {
        tracing::trace!(
            demo_id = candidate.demo_id,
            demo_map = hint,
            record_map = %entry.map,
            "IRC record for a different map than the demo"
        );
    }
    Some(entry)
}

/// Classifies a line from either relay, using the candidate's own map as hint.
pub fn classify<D, U>(
    candidate: &ChatCandidate,
    demo_dates: &D,
    demo_users: &U,
) -> Option<WrHistoryEntry>
where
    D: DemoDateIndex + ?Sized,
    U: DemoUserIndex + ?Sized,
{
    let map_hint = candidate.map.as_deref();
    parse_tempus_record(candidate, map_hint, demo_dates, demo_users)
        .or_else(|| parse_irc_record(candidate, map_hint, demo_dates, demo_users))
}

/// Classifies a batch of chat rows in parallel.
///
/// Rows repeating an already seen `(demo_id, chat_index)` are skipped. The
/// returned entries keep the order of their source rows.
pub fn classify_all<D, U>(
    candidates: &[ChatCandidate],
    demo_dates: &D,
    demo_users: &U,
) -> Vec<WrHistoryEntry>
where
    D: DemoDateIndex + Sync + ?Sized,
    U: DemoUserIndex + Sync + ?Sized,
{
    let mut seen = HashSet::new();
    let unique: Vec<&ChatCandidate> = candidates
        .iter()
        .filter(|c| seen.insert((c.demo_id, c.chat_index)))
        .collect();

    let skipped = candidates.len() - unique.len();
    if skipped > 0 {
        tracing::debug!(skipped, "skipped duplicate chat rows");
    }

    let entries: Vec<WrHistoryEntry> = unique
        .par_iter()
        .filter_map(|c| classify(c, demo_dates, demo_users))
        .collect();

    tracing::debug!(
        rows = unique.len(),
        records = entries.len(),
        "classified chat rows"
    );
    entries
}

fn parse_with<D, U>(
    templates: &[Template],
    rest: &str,
    candidate: &ChatCandidate,
    map_hint: Option<&str>,
    demo_dates: &D,
    demo_users: &U,
) -> Option<WrHistoryEntry>
where
    D: DemoDateIndex + ?Sized,
    U: DemoUserIndex + ?Sized,
{
    let line = LINE_RE.captures(rest)?;
    let label = &line["class"];
    let body = &line["body"];

    let Some((template, draft)) = templates.iter().find_map(|t| {
        let caps = t.regex.captures(body)?;
        (t.build)(&caps, label).map(|draft| (t, draft))
    }) else {
        tracing::trace!(
            demo_id = candidate.demo_id,
            chat_index = candidate.chat_index,
            "no record template matched"
        );
        return None;
    };

    let Some(map) = draft.map.clone().or_else(|| map_hint.map(String::from)) else {
        tracing::debug!(
            demo_id = candidate.demo_id,
            chat_index = candidate.chat_index,
            template = template.name,
            "record message without a known map"
        );
        return None;
    };

    tracing::trace!(
        demo_id = candidate.demo_id,
        chat_index = candidate.chat_index,
        template = template.name,
        "matched record template"
    );

    let mut entry = WrHistoryEntry {
        run_time: draft.run_time,
        split: draft.split,
        improvement: draft.improvement,
        inferred: draft.inferred,
        is_lookup: draft.is_lookup,
        date: demo_dates.demo_date(candidate.demo_id),
        demo_id: Some(candidate.demo_id),
        chat_index: Some(candidate.chat_index),
        ..WrHistoryEntry::new(
            draft.player,
            normalize_class(label),
            map,
            draft.source,
            draft.record_time,
        )
    };

    if draft.attribution == Attribution::Speaker {
        attach_speaker_identity(&mut entry, candidate, demo_users);
    }

    Some(entry)
}

/// Copies the speaker's Steam identity onto an entry they authored.
///
/// Skipped when the index knows the speaker under a different name than the
/// parsed holder.
fn attach_speaker_identity<U>(entry: &mut WrHistoryEntry, candidate: &ChatCandidate, users: &U)
where
    U: DemoUserIndex + ?Sized,
{
    let Some(user_id) = candidate.from_user_id else {
        return;
    };
    let Some(identity) = users.resolve_user(candidate.demo_id, user_id) else {
        return;
    };
    if identity
        .name
        .as_deref()
        .is_some_and(|name| name != entry.player.as_str())
    {
        tracing::debug!(
            demo_id = candidate.demo_id,
            chat_index = candidate.chat_index,
            "speaker name differs from record holder, not attributing"
        );
        return;
    }
    entry.apply_identity(&identity);
}

// ========== Capture helpers ==========

fn required<T: FromStr>(caps: &Captures<'_>, name: &str) -> Option<T> {
    caps.name(name)?.as_str().parse().ok()
}

/// `Some(None)` when the group did not participate, `None` when it did but
/// failed to parse.
fn optional<T: FromStr>(caps: &Captures<'_>, name: &str) -> Option<Option<T>> {
    caps.name(name)
        .map_or(Some(None), |m| m.as_str().parse().ok().map(Some))
}

fn zone_segment(caps: &Captures<'_>) -> Option<Segment> {
    let num = required(caps, "num")?;
    match caps.name("kind")?.as_str() {
        "Bonus" => Some(Segment::Bonus(num)),
        "Course" => Some(Segment::Course(num)),
        _ => None,
    }
}

fn course_segment(caps: &Captures<'_>) -> Option<Segment> {
    Some(Segment::CourseSegment {
        course: required(caps, "num")?,
        name: caps.name("name")?.as_str().trim().to_string(),
    })
}

/// Strips the annotations a compact listing appends after the holder's name,
/// a parenthesized age like `(3 days ago)` and `-flag` tokens like `-tt`.
fn compact_holder(field: &str) -> Option<&str> {
    let mut holder = field.trim();
    loop {
        let stripped = if holder.ends_with(')') {
            holder.rfind(" (").map(|idx| &holder[..idx])
        } else {
            holder
                .rsplit_once(' ')
                .filter(|(_, last)| last.len() > 1 && last.starts_with('-'))
                .map(|(rest, _)| rest)
        };
        match stripped {
            Some(rest) => holder = rest.trim_end(),
            None => break,
        }
    }
    (!holder.is_empty()).then_some(holder)
}

const fn segment_source(segment: Segment, first: bool) -> RecordSource {
    RecordSource::Segment { segment, first }
}

// ========== Template builders ==========

fn build_compact(caps: &Captures<'_>, label: &str) -> Option<Draft> {
    // Only WR listings; personal listings carry other labels.
    if !label.trim_end().ends_with(" WR") {
        return None;
    }
    let source = match caps.name("segment") {
        Some(segment) => segment_source(segment.as_str().parse().ok()?, false),
        None => RecordSource::Compact,
    };
    let holder = compact_holder(caps.name("holder")?.as_str())?;
    Some(Draft::lookup(
        holder,
        &caps["map"],
        source,
        required(caps, "time")?,
    ))
}

fn build_ranked(caps: &Captures<'_>, _label: &str) -> Option<Draft> {
    let rank: u32 = required(caps, "rank")?;
    if rank != 1 {
        return None;
    }
    let source = match caps.name("segment") {
        Some(segment) => segment_source(segment.as_str().parse().ok()?, false),
        None => RecordSource::Ranked,
    };
    Some(Draft {
        inferred: true,
        ..Draft::lookup(&caps["player"], &caps["map"], source, required(caps, "time")?)
    })
}

fn build_map_record(caps: &Captures<'_>, _label: &str) -> Option<Draft> {
    Some(Draft {
        split: optional(caps, "split")?,
        improvement: optional(caps, "improvement")?,
        ..Draft::live(&caps["player"], RecordSource::MapRecord, required(caps, "time")?)
    })
}

fn build_first_record(caps: &Captures<'_>, _label: &str) -> Option<Draft> {
    Some(Draft::live(
        &caps["player"],
        RecordSource::FirstRecord,
        required(caps, "time")?,
    ))
}

fn build_zone_break(caps: &Captures<'_>, _label: &str) -> Option<Draft> {
    let source = segment_source(zone_segment(caps)?, false);
    Some(Draft {
        split: Some(required(caps, "split")?),
        improvement: optional(caps, "improvement")?,
        ..Draft::live(&caps["player"], source, required(caps, "time")?)
    })
}

fn build_zone_set(caps: &Captures<'_>, _label: &str) -> Option<Draft> {
    let source = segment_source(zone_segment(caps)?, true);
    Some(Draft::live(&caps["player"], source, required(caps, "time")?))
}

fn build_course_segment_break(caps: &Captures<'_>, _label: &str) -> Option<Draft> {
    let source = segment_source(course_segment(caps)?, false);
    Some(Draft {
        split: Some(required(caps, "split")?),
        improvement: optional(caps, "improvement")?,
        ..Draft::live(&caps["player"], source, required(caps, "time")?)
    })
}

fn build_course_segment_set(caps: &Captures<'_>, _label: &str) -> Option<Draft> {
    let source = segment_source(course_segment(caps)?, true);
    Some(Draft::live(&caps["player"], source, required(caps, "time")?))
}

fn build_map_run(caps: &Captures<'_>, _label: &str) -> Option<Draft> {
    let split: SignedTime = required(caps, "split")?;
    // A run behind the record did not change it.
    if !split.is_negative() {
        return None;
    }
    let time: RaceTime = required(caps, "time")?;
    Some(Draft {
        run_time: Some(time),
        split: Some(split),
        attribution: Attribution::Withheld,
        ..Draft::live(&caps["player"], RecordSource::MapRun, time)
    })
}

fn build_irc_break(caps: &Captures<'_>, _label: &str) -> Option<Draft> {
    Some(Draft {
        map: Some(caps["map"].to_string()),
        split: Some(required(caps, "split")?),
        attribution: Attribution::Withheld,
        ..Draft::live(&caps["player"], RecordSource::Irc, required(caps, "time")?)
    })
}

fn build_irc_set(caps: &Captures<'_>, _label: &str) -> Option<Draft> {
    Some(Draft {
        map: Some(caps["map"].to_string()),
        attribution: Attribution::Withheld,
        ..Draft::live(&caps["player"], RecordSource::IrcSet, required(caps, "time")?)
    })
}
