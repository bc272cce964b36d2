//! Turning a `/api/fixtures` query into an upstream request and back
//!
//! The browser sends loosely typed parameters (legacy numeric league ids,
//! `from`/`dateFrom` aliases, an IANA zone name). `FixturePlan` normalizes
//! them once; the upstream response is cached per normalized request and the
//! plan's local filters (single local day, next N upcoming) run on every hit.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::{
    integrations::football_data::MatchesRequest,
    models::{fixture::{Fixture, FixtureQuery}, lenient},
};

pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";
pub const DEFAULT_NEXT: usize = 10;
const NEXT_WINDOW_DAYS: u64 = 30;

/// Legacy numeric league ids still sent by old clients
pub fn legacy_code(id: &str) -> Option<&'static str> {
    match id.trim() {
        "39" => Some("PL"),
        "140" => Some("PD"),
        "2" => Some("CL"),
        "78" => Some("BL1"),
        "135" => Some("SA"),
        "61" => Some("FL1"),
        "3" => Some("EL"),
        _ => None,
    }
}

/// Zone used for the single-day filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalZone {
    /// IANA zone, daylight saving included
    Named(Tz),
    /// Literal `+HH:MM` / `-HH:MM`
    Fixed(FixedOffset),
}

impl LocalZone {
    pub fn date_of(&self, utc: DateTime<Utc>) -> NaiveDate {
        match self {
            LocalZone::Named(tz) => utc.with_timezone(tz).date_naive(),
            LocalZone::Fixed(offset) => utc.with_timezone(offset).date_naive(),
        }
    }
}

/// Zone for an IANA name or a literal offset; anything unparseable is UTC
pub fn resolve_timezone(name: &str) -> LocalZone {
    let name = name.trim();
    if let Ok(tz) = name.parse::<Tz>() {
        return LocalZone::Named(tz);
    }
    parse_offset(name)
        .and_then(FixedOffset::east_opt)
        .map(LocalZone::Fixed)
        .unwrap_or(LocalZone::Named(Tz::UTC))
}

fn parse_offset(raw: &str) -> Option<i32> {
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

fn parse_day(raw: Option<&String>) -> Option<NaiveDate> {
    raw.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Normalized fixtures query
#[derive(Debug, Clone, PartialEq)]
pub struct FixturePlan {
    pub request: MatchesRequest,
    /// Keep only the next N upcoming fixtures
    pub next: Option<usize>,
    /// Keep only fixtures on this local day
    pub single_day: Option<NaiveDate>,
    pub timezone: String,
    pub zone: LocalZone,
}

impl FixturePlan {
    pub fn from_query(query: &FixtureQuery, today: NaiveDate) -> Self {
        let competitions = query
            .competitions
            .clone()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| {
                let codes: Vec<&str> = [&query.league, &query.leagues]
                    .into_iter()
                    .flatten()
                    .flat_map(|ids| ids.split(','))
                    .filter_map(legacy_code)
                    .collect();
                (!codes.is_empty()).then(|| codes.join(","))
            });

        let date_from = parse_day(query.date_from.as_ref().or(query.from.as_ref()));
        let date_to = parse_day(query.date_to.as_ref().or(query.to.as_ref()));

        let next = lenient::<usize>(&query.next)
            .filter(|n| *n > 0)
            .or_else(|| (date_from.is_none() && date_to.is_none()).then_some(DEFAULT_NEXT));

        let single_day = match (date_from, date_to) {
            (Some(from), Some(to)) if from == to => Some(from),
            _ => None,
        };

        let (fetch_from, fetch_to) = if let Some(day) = single_day {
            (day.checked_sub_days(Days::new(1)), day.checked_add_days(Days::new(1)))
        } else if next.is_some() && date_from.is_none() && date_to.is_none() {
            (Some(today), today.checked_add_days(Days::new(NEXT_WINDOW_DAYS)))
        } else {
            (date_from, date_to)
        };

        let timezone = query
            .timezone
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let zone = resolve_timezone(&timezone);

        Self {
            request: MatchesRequest {
                competitions,
                date_from: fetch_from,
                date_to: fetch_to,
                status: query.status.clone().filter(|s| !s.trim().is_empty()),
            },
            next,
            single_day,
            timezone,
            zone,
        }
    }

    /// Apply the local filters to an upstream result
    pub fn apply(&self, mut fixtures: Vec<Fixture>, now_ms: i64) -> Vec<Fixture> {
        if let Some(n) = self.next {
            fixtures.retain(|fx| fx.ts >= now_ms);
            fixtures.sort_by_key(|fx| fx.ts);
            fixtures.truncate(n);
        }

        if let Some(day) = self.single_day {
            fixtures.retain(|fx| self.local_date(fx.ts) == Some(day));
        }

        fixtures
    }

    fn local_date(&self, ts_ms: i64) -> Option<NaiveDate> {
        DateTime::from_timestamp_millis(ts_ms).map(|utc| self.zone.date_of(utc))
    }
}
