//! World record history reconciliation.
//!
//! Folds the classified candidates of many demos into one chronological
//! record history per map and segment:
//! 1. Group entries into timelines by map and segment
//! 2. Within each timeline, sort by date, demo, then chat position
//! 3. Walk the timeline once, tracking the best known time
//! 4. Merge the surviving entries of all timelines back into one order

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::source::{RecordSource, Segment};
use crate::time::RaceTime;
use crate::types::{Player, WrHistoryEntry};

/// Chronological position of an entry. Entries without a date or demo sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OrderKey {
    date: Option<NaiveDate>,
    demo_id: Option<i64>,
    chat_index: Option<i64>,
}

impl OrderKey {
    const fn of(entry: &WrHistoryEntry) -> Self {
        Self {
            date: entry.date,
            demo_id: entry.demo_id,
            chat_index: entry.chat_index,
        }
    }
}

/// Map plus segment; the whole-map timeline has no segment.
type TimelineKey = (String, Option<Segment>);

/// A reconciled record history.
///
/// Iterating does not consume the history, so it can be walked any number of
/// times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrHistory {
    entries: Vec<WrHistoryEntry>,
}

impl WrHistory {
    pub fn iter(&self) -> std::slice::Iter<'_, WrHistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries belonging to one map, in history order.
    pub fn for_map<'a>(&'a self, map: &'a str) -> impl Iterator<Item = &'a WrHistoryEntry> + 'a {
        self.entries.iter().filter(move |e| e.map == map)
    }
}

impl IntoIterator for WrHistory {
    type Item = WrHistoryEntry;
    type IntoIter = std::vec::IntoIter<WrHistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a WrHistory {
    type Item = &'a WrHistoryEntry;
    type IntoIter = std::slice::Iter<'a, WrHistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Builds the canonical record history from classified entries.
///
/// # Rules
///
/// Per timeline, in chronological order:
/// - An identified entry matching the time of an unresolved `ObservedWr`
///   names that record's holder and is not emitted itself
/// - Lookups restating an emitted time are dropped
/// - Lookups with a new time are reported once when `include_all` is set and
///   never move the best time
/// - A map run matching or beating the best time becomes an anonymous
///   `ObservedWr`, since the broadcast reaches bystanders as well as the runner
/// - Everything else is emitted as is, except repeat sightings of a record
///   already emitted for the same player
///
/// Without `include_all`, `ObservedWr` entries whose holder stays unknown are
/// removed at the end. Observed records that were given a holder are kept,
/// still marked `inferred`.
pub fn build_wr_history<I>(entries: I, include_all: bool) -> WrHistory
where
    I: IntoIterator<Item = WrHistoryEntry>,
{
    let mut groups: HashMap<TimelineKey, Vec<WrHistoryEntry>> = HashMap::new();
    for entry in entries {
        let key = (entry.map.clone(), entry.source.segment().cloned());
        groups.entry(key).or_default().push(entry);
    }

    // Sort groups by key for deterministic output (HashMap iteration order is non-deterministic)
    let mut sorted_groups: Vec<_> = groups.into_iter().collect();
    sorted_groups.sort_by(|(a, _), (b, _)| a.cmp(b));

    let reconciled: Vec<Vec<(OrderKey, WrHistoryEntry)>> = sorted_groups
        .into_par_iter()
        .map(|(key, group)| reconcile_timeline(&key, group, include_all))
        .collect();

    let mut merged: Vec<(OrderKey, WrHistoryEntry)> = reconciled.into_iter().flatten().collect();
    merged.sort_by_key(|(key, _)| *key);

    tracing::debug!(entries = merged.len(), include_all, "built record history");

    WrHistory {
        entries: merged.into_iter().map(|(_, entry)| entry).collect(),
    }
}

/// Mutable state of one map or segment timeline.
#[derive(Default)]
struct Timeline {
    best: Option<RaceTime>,
    emitted: Vec<(OrderKey, WrHistoryEntry)>,
    /// First emitted record for each time; informational lookups excluded.
    emitted_times: HashMap<RaceTime, usize>,
    /// `ObservedWr` entries still waiting for a holder.
    unresolved: HashMap<RaceTime, usize>,
    /// Times already reported by informational lookups.
    lookup_times: HashSet<RaceTime>,
    /// Times materialized from map runs, resolved or not.
    observed_times: HashSet<RaceTime>,
}

impl Timeline {
    fn emit(&mut self, key: OrderKey, entry: WrHistoryEntry) -> usize {
        let time = entry.record_time;
        let index = self.emitted.len();
        self.emitted.push((key, entry));
        self.emitted_times.entry(time).or_insert(index);
        index
    }

    /// Reports a lookup without making its time part of the known history.
    fn emit_lookup(&mut self, key: OrderKey, entry: WrHistoryEntry) {
        self.emitted.push((key, entry));
    }

    fn advance(&mut self, time: RaceTime) {
        if self.best.is_none_or(|best| time < best) {
            self.best = Some(time);
        }
    }

    /// Names the holder of an unresolved `ObservedWr` with the same time.
    fn try_resolve(&mut self, entry: &WrHistoryEntry) -> bool {
        if !entry.player.is_known() || entry.source == RecordSource::MapRun {
            return false;
        }
        let Some(index) = self.unresolved.remove(&entry.record_time) else {
            return false;
        };
        let (_, observed) = &mut self.emitted[index];
        observed.player = entry.player.clone();
        observed.steam_id64 = entry.steam_id64;
        observed.steam_id.clone_from(&entry.steam_id);
        tracing::debug!(
            map = %observed.map,
            time = %observed.record_time,
            player = %observed.player,
            "resolved observed record holder"
        );
        true
    }

    /// A map run repeating a record emitted from the same demo is the
    /// holder's own broadcast, not a new sighting.
    fn is_own_broadcast(&self, run: &WrHistoryEntry) -> bool {
        self.emitted
            .iter()
            .any(|(_, e)| e.record_time == run.record_time && e.demo_id == run.demo_id)
    }

    fn is_repeat_sighting(&self, entry: &WrHistoryEntry) -> bool {
        self.emitted_times
            .get(&entry.record_time)
            .is_some_and(|&index| self.emitted[index].1.player == entry.player)
    }
}

fn reconcile_timeline(
    key: &TimelineKey,
    mut entries: Vec<WrHistoryEntry>,
    include_all: bool,
) -> Vec<(OrderKey, WrHistoryEntry)> {
    entries.sort_by_key(OrderKey::of);

    let mut timeline = Timeline::default();

    for entry in entries {
        let order = OrderKey::of(&entry);
        let time = entry.record_time;

        if timeline.try_resolve(&entry) {
            continue;
        }

        if entry.is_lookup {
            if timeline.emitted_times.contains_key(&time) {
                tracing::trace!(map = %key.0, %time, "dropping lookup of known record");
            } else if include_all && timeline.lookup_times.insert(time) {
                timeline.emit_lookup(order, entry);
            }
            continue;
        }

        if entry.source == RecordSource::MapRun {
            if timeline.is_own_broadcast(&entry) {
                tracing::trace!(map = %key.0, %time, "dropping map run of record from same demo");
                continue;
            }
            if timeline.observed_times.contains(&time) {
                tracing::trace!(map = %key.0, %time, "dropping repeat map run of observed record");
                continue;
            }
            if timeline.best.is_some_and(|best| time > best) {
                tracing::trace!(map = %key.0, %time, "dropping map run slower than record");
                continue;
            }
            let observed = observed_record(entry);
            let index = timeline.emit(order, observed);
            timeline.unresolved.insert(time, index);
            timeline.observed_times.insert(time);
            timeline.advance(time);
            continue;
        }

        if timeline.is_repeat_sighting(&entry) {
            tracing::trace!(map = %key.0, %time, "dropping repeat sighting of record");
            continue;
        }

        timeline.emit(order, entry);
        timeline.advance(time);
    }

    let mut emitted = timeline.emitted;
    if !include_all {
        emitted.retain(|(_, e)| e.source != RecordSource::ObservedWr || e.player.is_known());
    }
    emitted
}

/// Replaces an ambiguous map run with an anonymous observed record.
fn observed_record(run: WrHistoryEntry) -> WrHistoryEntry {
    tracing::debug!(
        map = %run.map,
        time = %run.record_time,
        "materializing observed record from map run"
    );
    WrHistoryEntry {
        inferred: true,
        date: run.date,
        ..WrHistoryEntry::new(
            Player::Unknown,
            run.class,
            run.map,
            RecordSource::ObservedWr,
            run.record_time,
        )
    }
}
