use chrono::{DateTime, Duration, TimeZone, Utc};
use mongodb::bson;

/// Current time truncated to the millisecond precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis())
}

/// Timestamp for a mutation of a record last touched at `previous`.
/// Always strictly later than `previous`, even within the same millisecond.
pub(crate) fn next_update(previous: DateTime<Utc>) -> DateTime<Utc> {
    now().max(previous + Duration::milliseconds(1))
}

pub(crate) fn to_bson(value: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(value.timestamp_millis())
}

pub(crate) fn from_bson(value: bson::DateTime) -> DateTime<Utc> {
    from_millis(value.timestamp_millis())
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
