//! Natural-language date/time normalization.
//!
//! Turns spoken due-date phrases ("tomorrow at 3pm", "next friday",
//! "october 21st at 9:30") into a calendar date and an `HH:MM` time of day.
//!
//! Resolution works by repeatedly pulling recognised expressions out of the
//! cleaned text. Whatever remains afterwards must be filler words, otherwise
//! the phrase is rejected as unparseable.
//!
//! A value that resolves to exactly midnight is moved to noon: a phrase with
//! no time of day lands on midnight, and a reminder at 00:00 is never what
//! the user meant.

use std::sync::{Arc, OnceLock};

use chrono::{
    Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday,
};
use regex::Regex;
use thiserror::Error;

use super::clock::Clock;
use crate::domain::{DATE_FORMAT, TIME_FORMAT};

/// Errors from date/time normalization
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Could not parse a date or time from '{0}'")]
    UnparseableDateTime(String),
}

/// A resolved (date, time-of-day) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedDateTime {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl NormalizedDateTime {
    /// Date as `YYYY-MM-DD`
    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    /// Time as `HH:MM` (24h)
    pub fn time_string(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }
}

/// Resolves spoken date/time text against the current wall clock
#[derive(Clone)]
pub struct DateTimeNormalizer {
    clock: Arc<dyn Clock>,
}

impl DateTimeNormalizer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Normalize relative to the clock's current time
    pub fn normalize(&self, text: &str) -> Result<NormalizedDateTime, NormalizeError> {
        normalize_at(text, self.clock.now())
    }
}

/// Time used when a phrase resolves to midnight
pub fn default_time() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Normalize `text` relative to `now`
pub fn normalize_at(text: &str, now: NaiveDateTime) -> Result<NormalizedDateTime, NormalizeError> {
    let unparseable = || NormalizeError::UnparseableDateTime(text.trim().to_string());

    let resolved = Resolver::new(text, now).resolve().ok_or_else(unparseable)?;

    let time = if resolved.time() == NaiveTime::MIN {
        default_time()
    } else {
        resolved.time()
    };

    Ok(NormalizedDateTime {
        date: resolved.date(),
        time,
    })
}

// ============================================================================
// Patterns
// ============================================================================

const HOUR_WORDS: &str = r"\d{1,2}|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve";
const COUNT_WORDS: &str =
    r"\d{1,3}|an?|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve";
const MONTHS: &str = r"january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";
const WEEKDAYS: &str = r"monday|tuesday|wednesday|thursday|friday|saturday|sunday";

/// Words allowed to remain once every expression has been extracted
const FILLER_WORDS: &[&str] = &[
    "at", "on", "by", "the", "of", "due", "is", "it", "its", "for", "this", "in", "and",
];

struct Patterns {
    in_minutes_or_hours: Regex,
    in_days_or_weeks: Regex,
    days_or_weeks_from_now: Regex,
    day_after_tomorrow: Regex,
    tomorrow: Regex,
    today: Regex,
    yesterday: Regex,
    next_week: Regex,
    next_month: Regex,
    clock_12h: Regex,
    clock_24h: Regex,
    noon_or_midnight: Regex,
    part_of_day: Regex,
    iso_date: Regex,
    slash_date: Regex,
    month_then_day: Regex,
    day_then_month: Regex,
    weekday: Regex,
    bare_hour: Regex,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("date pattern is a valid regex")
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();

    PATTERNS.get_or_init(|| Patterns {
        in_minutes_or_hours: compile(&format!(
            r"\bin\s+({COUNT_WORDS})\s+(minutes?|mins?|hours?|hrs?)\b"
        )),
        in_days_or_weeks: compile(&format!(r"\bin\s+({COUNT_WORDS})\s+(days?|weeks?)\b")),
        days_or_weeks_from_now: compile(&format!(
            r"\b({COUNT_WORDS})\s+(days?|weeks?)\s+from\s+now\b"
        )),
        day_after_tomorrow: compile(r"\b(?:the\s+)?day\s+after\s+tomorrow\b"),
        tomorrow: compile(r"\btomorrow\b"),
        today: compile(r"\b(?:today|tonight)\b"),
        yesterday: compile(r"\byesterday\b"),
        next_week: compile(r"\bnext\s+week\b"),
        next_month: compile(r"\bnext\s+month\b"),
        clock_12h: compile(&format!(r"\b({HOUR_WORDS})(?::(\d{{2}}))?\s*(am|pm)\b")),
        clock_24h: compile(r"\b(\d{1,2}):(\d{2})\b"),
        noon_or_midnight: compile(r"\b(noon|midday|midnight)\b"),
        part_of_day: compile(r"\b(?:in\s+the\s+)?(morning|afternoon|evening)\b"),
        iso_date: compile(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b"),
        slash_date: compile(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b"),
        month_then_day: compile(&format!(
            r"\b({MONTHS})\s+(\d{{1,2}})(?:st|nd|rd|th)?(?:\s+(\d{{4}}))?\b"
        )),
        day_then_month: compile(&format!(
            r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTHS})(?:\s+(\d{{4}}))?\b"
        )),
        weekday: compile(&format!(r"\b(?:(next|this)\s+)?({WEEKDAYS})\b")),
        bare_hour: compile(&format!(
            r"\b(?:at\s+)?({HOUR_WORDS})\s*(?:oclock|o clock)\b|\bat\s+({HOUR_WORDS})\b"
        )),
    })
}

// ============================================================================
// Resolver
// ============================================================================

/// "morning", "afternoon" or "evening"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl PartOfDay {
    fn parse(word: &str) -> Self {
        match word {
            "morning" => Self::Morning,
            "afternoon" => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    /// Hour used when no explicit time was given
    fn default_hour(self) -> u32 {
        match self {
            Self::Morning => 9,
            Self::Afternoon => 15,
            Self::Evening => 18,
        }
    }

    /// Read a bare hour as am or pm ("3 in the afternoon" is 15:00)
    fn qualify(self, hour: u32) -> u32 {
        match (self, hour) {
            (Self::Morning, 12) => 0,
            (Self::Morning, h) => h,
            (_, h) if h < 12 => h + 12,
            (_, h) => h,
        }
    }
}

/// One pass over a phrase; date and time slots may each be filled once
struct Resolver {
    rest: String,
    now: NaiveDateTime,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    period: Option<PartOfDay>,
}

type Groups = Vec<Option<String>>;

impl Resolver {
    fn new(text: &str, now: NaiveDateTime) -> Self {
        Self {
            rest: clean(text),
            now,
            date: None,
            time: None,
            period: None,
        }
    }

    fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// Remove the first match of `re` and return its capture groups
    fn take(&mut self, re: &Regex) -> Option<Groups> {
        let caps = re.captures(&self.rest)?;
        let range = caps.get(0)?.range();
        let groups = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        self.rest.replace_range(range, " ");
        Some(groups)
    }

    fn set_date(&mut self, date: NaiveDate) -> Option<()> {
        if self.date.is_some() {
            return None;
        }
        self.date = Some(date);
        Some(())
    }

    fn set_time(&mut self, time: NaiveTime) -> Option<()> {
        if self.time.is_some() {
            return None;
        }
        self.time = Some(time);
        Some(())
    }

    fn resolve(mut self) -> Option<NaiveDateTime> {
        let p = patterns();

        self.relative_clock(p)?;
        self.relative_days(p)?;
        self.named_days(p)?;
        self.clock_times(p)?;
        self.calendar_dates(p)?;
        self.weekdays(p)?;
        self.bare_hours(p)?;

        if let (Some(period), None) = (self.period, self.time) {
            self.set_time(NaiveTime::from_hms_opt(period.default_hour(), 0, 0)?)?;
        }

        let leftovers_are_filler = self
            .rest
            .split_whitespace()
            .all(|word| FILLER_WORDS.contains(&word));
        if !leftovers_are_filler {
            return None;
        }

        if self.date.is_none() && self.time.is_none() {
            return None;
        }

        let date = self.date.unwrap_or_else(|| self.today());
        let time = self.time.unwrap_or(NaiveTime::MIN);
        Some(date.and_time(time))
    }

    /// "in 20 minutes", "in an hour"
    fn relative_clock(&mut self, p: &Patterns) -> Option<()> {
        if let Some(g) = self.take(&p.in_minutes_or_hours) {
            let count = i64::from(parse_count(g[0].as_deref()?)?);
            let delta = if g[1].as_deref()?.starts_with('h') {
                Duration::hours(count)
            } else {
                Duration::minutes(count)
            };
            let at = self.now.checked_add_signed(delta)?;
            self.set_date(at.date())?;
            self.set_time(NaiveTime::from_hms_opt(at.hour(), at.minute(), 0)?)?;
        }
        Some(())
    }

    /// "in 3 days", "2 weeks from now"
    fn relative_days(&mut self, p: &Patterns) -> Option<()> {
        for re in [&p.in_days_or_weeks, &p.days_or_weeks_from_now] {
            if let Some(g) = self.take(re) {
                let count = i64::from(parse_count(g[0].as_deref()?)?);
                let days = if g[1].as_deref()?.starts_with('w') {
                    count * 7
                } else {
                    count
                };
                let date = self.today().checked_add_signed(Duration::days(days))?;
                self.set_date(date)?;
            }
        }
        Some(())
    }

    /// "today", "tomorrow", "next week", ...
    fn named_days(&mut self, p: &Patterns) -> Option<()> {
        let offsets: [(&Regex, i64); 5] = [
            (&p.day_after_tomorrow, 2),
            (&p.tomorrow, 1),
            (&p.today, 0),
            (&p.yesterday, -1),
            (&p.next_week, 7),
        ];

        for (re, days) in offsets {
            if self.take(re).is_some() {
                let date = self.today().checked_add_signed(Duration::days(days))?;
                self.set_date(date)?;
            }
        }

        if self.take(&p.next_month).is_some() {
            let date = self.today().checked_add_months(Months::new(1))?;
            self.set_date(date)?;
        }

        Some(())
    }

    /// "3pm", "9:30 am", "15:00", "noon", "in the evening"
    fn clock_times(&mut self, p: &Patterns) -> Option<()> {
        if let Some(g) = self.take(&p.clock_12h) {
            let hour = parse_count(g[0].as_deref()?)?;
            let minute = match g[1].as_deref() {
                Some(m) => m.parse().ok()?,
                None => 0,
            };
            if !(1..=12).contains(&hour) {
                return None;
            }
            let hour = match (g[2].as_deref()?, hour) {
                ("am", 12) => 0,
                ("am", h) => h,
                ("pm", 12) => 12,
                (_, h) => h + 12,
            };
            self.set_time(NaiveTime::from_hms_opt(hour, minute, 0)?)?;
        }

        if let Some(g) = self.take(&p.clock_24h) {
            let hour = g[0].as_deref()?.parse().ok()?;
            let minute = g[1].as_deref()?.parse().ok()?;
            self.set_time(NaiveTime::from_hms_opt(hour, minute, 0)?)?;
        }

        if let Some(g) = self.take(&p.noon_or_midnight) {
            let hour = if g[0].as_deref()? == "midnight" { 0 } else { 12 };
            self.set_time(NaiveTime::from_hms_opt(hour, 0, 0)?)?;
        }

        // Qualifies a bare hour, or stands in for one; an explicit clock time wins
        if let Some(g) = self.take(&p.part_of_day) {
            self.period = Some(PartOfDay::parse(g[0].as_deref()?));
        }

        Some(())
    }

    /// "2026-10-21", "10/21", "october 21st", "21 of october 2026"
    fn calendar_dates(&mut self, p: &Patterns) -> Option<()> {
        if let Some(g) = self.take(&p.iso_date) {
            let date = NaiveDate::from_ymd_opt(
                g[0].as_deref()?.parse().ok()?,
                g[1].as_deref()?.parse().ok()?,
                g[2].as_deref()?.parse().ok()?,
            )?;
            self.set_date(date)?;
        }

        if let Some(g) = self.take(&p.slash_date) {
            let month = g[0].as_deref()?.parse().ok()?;
            let day = g[1].as_deref()?.parse().ok()?;
            let year = match g[2].as_deref() {
                Some(y) if y.len() == 2 => Some(2000 + y.parse::<i32>().ok()?),
                Some(y) => Some(y.parse().ok()?),
                None => None,
            };
            let date = self.month_day(month, day, year)?;
            self.set_date(date)?;
        }

        if let Some(g) = self.take(&p.month_then_day) {
            let month = month_number(g[0].as_deref()?)?;
            let day = g[1].as_deref()?.parse().ok()?;
            let year = g[2].as_deref().and_then(|y| y.parse().ok());
            let date = self.month_day(month, day, year)?;
            self.set_date(date)?;
        }

        if let Some(g) = self.take(&p.day_then_month) {
            let day = g[0].as_deref()?.parse().ok()?;
            let month = month_number(g[1].as_deref()?)?;
            let year = g[2].as_deref().and_then(|y| y.parse().ok());
            let date = self.month_day(month, day, year)?;
            self.set_date(date)?;
        }

        Some(())
    }

    /// A month/day with no year that already passed this year means next year
    fn month_day(&self, month: u32, day: u32, year: Option<i32>) -> Option<NaiveDate> {
        match year {
            Some(year) => NaiveDate::from_ymd_opt(year, month, day),
            None => {
                let this_year = NaiveDate::from_ymd_opt(self.today().year(), month, day);
                match this_year {
                    Some(date) if date >= self.today() => Some(date),
                    _ => NaiveDate::from_ymd_opt(self.today().year() + 1, month, day),
                }
            }
        }
    }

    /// "friday" / "this friday" is the soonest on or after today,
    /// "next friday" the soonest strictly after today
    fn weekdays(&mut self, p: &Patterns) -> Option<()> {
        if let Some(g) = self.take(&p.weekday) {
            let target: Weekday = g[1].as_deref()?.parse().ok()?;
            let today = self.today().weekday().num_days_from_monday();
            let mut ahead = (target.num_days_from_monday() + 7 - today) % 7;
            if ahead == 0 && g[0].as_deref() == Some("next") {
                ahead = 7;
            }
            let date = self
                .today()
                .checked_add_signed(Duration::days(i64::from(ahead)))?;
            self.set_date(date)?;
        }
        Some(())
    }

    /// "at 9", "three o'clock" (a 24h hour unless a part of day says otherwise)
    fn bare_hours(&mut self, p: &Patterns) -> Option<()> {
        if let Some(g) = self.take(&p.bare_hour) {
            let hour = g.iter().flatten().next().and_then(|h| parse_count(h))?;
            let hour = match self.period {
                Some(period) => period.qualify(hour),
                None => hour,
            };
            self.set_time(NaiveTime::from_hms_opt(hour, 0, 0)?)?;
        }
        Some(())
    }
}

/// Lowercase, fold "a.m."/"p.m.", drop punctuation except `:` `/` `-`
fn clean(text: &str) -> String {
    let lowered = text
        .to_lowercase()
        .replace("a.m.", "am")
        .replace("p.m.", "pm")
        .replace("a.m", "am")
        .replace("p.m", "pm");

    let stripped: String = lowered
        .chars()
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || matches!(c, ':' | '/' | '-') {
                c
            } else {
                ' '
            }
        })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_count(word: &str) -> Option<u32> {
    if let Ok(n) = word.parse() {
        return Some(n);
    }
    let n = match word {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        _ => return None,
    };
    Some(n)
}

fn month_number(name: &str) -> Option<u32> {
    let n = match name.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}
