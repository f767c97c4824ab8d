//! Rendering "today" the way each source prints dates, and matching cells against it.
//!
//! Every source displays its dates differently. A [`DateMatcher`] renders the
//! run date once in the source's [`DateFormat`] and then compares each cell
//! according to a [`MatchPolicy`].

use crate::utils::normalize_whitespace;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// India Standard Time: UTC+05:30, no daylight saving.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// The current calendar date in India, where every source publishes.
pub fn today_in_india() -> NaiveDate {
    india_date(Utc::now())
}

fn india_date(at: DateTime<Utc>) -> NaiveDate {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS).expect("offset within a day");
    at.with_timezone(&ist).date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `October 19, 2026`
    MonthDayYear,
    /// `Oct 19, 2026`
    MonDayYear,
    /// `19-10-2026`
    DayMonthYearDashed,
    /// `19 October`
    DayMonth,
    /// `19 October , 2026`
    DayMonthCommaYear,
}

impl DateFormat {
    fn pattern(self) -> &'static str {
        match self {
            DateFormat::MonthDayYear => "%B %d, %Y",
            DateFormat::MonDayYear => "%b %d, %Y",
            DateFormat::DayMonthYearDashed => "%d-%m-%Y",
            DateFormat::DayMonth => "%d %B",
            DateFormat::DayMonthCommaYear => "%d %B , %Y",
        }
    }

    pub fn render(self, date: NaiveDate) -> String {
        date.format(self.pattern()).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Byte-for-byte equality.
    Exact,
    /// Equality after collapsing whitespace runs and trimming the cell.
    Normalized,
    /// Case-insensitive containment after normalizing the cell.
    Contains,
}

#[derive(Debug, Clone)]
pub struct DateMatcher {
    target: String,
    policy: MatchPolicy,
}

impl DateMatcher {
    pub fn new(format: DateFormat, policy: MatchPolicy, today: NaiveDate) -> Self {
        Self {
            target: normalize_whitespace(&format.render(today)),
            policy,
        }
    }

    /// The rendered date this matcher looks for.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn matches(&self, cell: &str) -> bool {
        match self.policy {
            MatchPolicy::Exact => cell == self.target,
            MatchPolicy::Normalized => normalize_whitespace(cell) == self.target,
            MatchPolicy::Contains => normalize_whitespace(cell)
                .to_lowercase()
                .contains(&self.target.to_lowercase()),
        }
    }
}
