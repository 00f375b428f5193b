//! Ids, revisions and timestamps assigned on write.

use std::ops::RangeInclusive;

use chrono::{NaiveDateTime, TimeDelta, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Rendering of `updated` and `origin`. Fixed width, so text order is time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Revisions are 7-digit integers.
pub const REVISION_RANGE: RangeInclusive<i64> = 1_000_000..=9_999_999;

/// A new document id: the 32 hex digits of a time-ordered UUID.
pub fn generate_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Draws a revision that is not in `existing`.
pub fn generate_revision<R: Rng + ?Sized>(rng: &mut R, existing: &[i64]) -> i64 {
    loop {
        let revision = rng.gen_range(REVISION_RANGE);
        if !existing.contains(&revision) {
            return revision;
        }
    }
}

/// Current UTC time, rendered with [`TIMESTAMP_FORMAT`].
pub fn now() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Write stamp for an id whose latest stamp is `previous`.
///
/// The result is strictly later than `previous`, falling back to one microsecond
/// after it when the clock has not moved on.
pub fn next_updated(now: String, previous: Option<&str>) -> DocumentStoreResult<String> {
    let Some(previous) = previous else {
        return Ok(now);
    };

    if now.as_str() > previous {
        return Ok(now);
    }

    let previous = NaiveDateTime::parse_from_str(previous, TIMESTAMP_FORMAT).map_err(|err| {
        DocumentStoreError::Serialization(format!("invalid stored timestamp '{previous}': {err}"))
    })?;

    Ok((previous + TimeDelta::microseconds(1))
        .format(TIMESTAMP_FORMAT)
        .to_string())
}
