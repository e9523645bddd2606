use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::error::{Error, Result};
use crate::storage::RemoteObject;

const DAY_FORMAT: &str = "%Y-%m-%d";
const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Half-open `[start, end)` window over last-modified timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start > end {
            log::warn!("range start {} is after its end {}, nothing will match", start, end);
        }
        Self { start, end }
    }

    /// Midnight of `day` up to, but excluding, the next midnight.
    pub fn day(day: NaiveDate) -> Self {
        let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
        Self::new(start, start + TimeDelta::hours(24))
    }

    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        in_range(t, &self.start, &self.end)
    }
}

pub fn in_range(t: &DateTime<Utc>, start: &DateTime<Utc>, end: &DateTime<Utc>) -> bool {
    t >= start && t < end
}

/// Keeps the objects whose last-modified time falls in `range`, in listing order.
/// Without a range the listing is returned as is.
pub fn select(objects: Vec<RemoteObject>, range: Option<&DateRange>) -> Vec<RemoteObject> {
    match range {
        Some(range) => objects
            .into_iter()
            .filter(|o| range.contains(&o.last_modified))
            .collect(),
        None => objects,
    }
}

pub fn parse_day(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, DAY_FORMAT).map_err(|source| Error::TimeParse {
        input: input.to_string(),
        source,
    })
}

pub fn parse_minute(input: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(input, MINUTE_FORMAT)
        .map(|t| t.and_utc())
        .map_err(|source| Error::TimeParse {
            input: input.to_string(),
            source,
        })
}

/// Turns the `--for`, `--from` and `--to` arguments into an optional filter.
///
/// An explicit range beats a day, one bound without the other is an error and
/// nothing at all means no filtering. Empty strings count as absent.
pub fn resolve_range(
    day: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<DateRange>> {
    let day = day.filter(|s| !s.is_empty());
    let from = from.filter(|s| !s.is_empty());
    let to = to.filter(|s| !s.is_empty());

    match (from, to) {
        (Some(from), Some(to)) => {
            if let Some(day) = day {
                log::warn!("explicit range given, ignoring --for {}", day);
            }
            Ok(Some(DateRange::new(parse_minute(from)?, parse_minute(to)?)))
        }
        (Some(_), None) => Err(Error::InvalidArguments(
            "--from given without --to, missing the other bound".to_string(),
        )),
        (None, Some(_)) => Err(Error::InvalidArguments(
            "--to given without --from, missing the other bound".to_string(),
        )),
        (None, None) => match day {
            Some(day) => Ok(Some(DateRange::day(parse_day(day)?))),
            None => Ok(None),
        },
    }
}
