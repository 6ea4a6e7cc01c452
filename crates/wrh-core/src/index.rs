//! Lookups the classifier needs from the surrounding demo catalog.
//!
//! These traits let classification work with whatever the caller has loaded
//! (a database-backed cache, the CLI's JSONL index, or test fixtures).

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::SteamIdentity;

/// Resolves the calendar date of a demo.
pub trait DemoDateIndex {
    /// Returns the date the demo was recorded, if known.
    fn demo_date(&self, demo_id: i64) -> Option<NaiveDate>;
}

/// Resolves a chat speaker within a demo to a Steam identity.
pub trait DemoUserIndex {
    /// Returns the identity of `user_id` as seen in `demo_id`, if known.
    fn resolve_user(&self, demo_id: i64, user_id: i64) -> Option<SteamIdentity>;
}

impl DemoDateIndex for HashMap<i64, Option<DateTime<Utc>>> {
    fn demo_date(&self, demo_id: i64) -> Option<NaiveDate> {
        self.get(&demo_id).copied().flatten().map(|dt| dt.date_naive())
    }
}

impl DemoDateIndex for HashMap<i64, NaiveDate> {
    fn demo_date(&self, demo_id: i64) -> Option<NaiveDate> {
        self.get(&demo_id).copied()
    }
}

impl DemoUserIndex for HashMap<(i64, i64), SteamIdentity> {
    fn resolve_user(&self, demo_id: i64, user_id: i64) -> Option<SteamIdentity> {
        self.get(&(demo_id, user_id)).cloned()
    }
}
