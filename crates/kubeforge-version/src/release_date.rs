use std::{cmp::Ordering, fmt::Display, num::ParseIntError, str::FromStr, sync::LazyLock};

use regex::Regex;
use snafu::{OptionExt, ResultExt, Snafu, ensure};

static RELEASE_DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})(?P<preview>-preview)?$")
        .expect("failed to compile release date regex")
});

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseReleaseDateError {
    #[snafu(display("invalid release date format, expected YYYY-MM-DD or YYYY-MM-DD-preview"))]
    InvalidFormat,

    #[snafu(display("failed to parse {component} of release date"))]
    ParseComponent {
        source: ParseIntError,
        component: &'static str,
    },

    #[snafu(display("month {month} is out of range, expected 1-12"))]
    MonthOutOfRange { month: u8 },

    #[snafu(display("day {day} is out of range for {year:04}-{month:02}"))]
    DayOutOfRange { year: u16, month: u8, day: u8 },
}

/// A dated API release, for example `2017-07-01` or `2018-03-31-preview`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ReleaseDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub preview: bool,
}

impl ReleaseDate {
    pub const fn new(year: u16, month: u8, day: u8, preview: bool) -> Self {
        Self {
            year,
            month,
            day,
            preview,
        }
    }

    fn days_in_month(year: u16, month: u8) -> u8 {
        match month {
            2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
            2 => 28,
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }
}

impl FromStr for ReleaseDate {
    type Err = ParseReleaseDateError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let captures = RELEASE_DATE_REGEX
            .captures(input)
            .context(InvalidFormatSnafu)?;

        let component = |name: &'static str| {
            captures
                .name(name)
                .map(|m| m.as_str())
                .context(InvalidFormatSnafu)
        };

        let year = component("year")?
            .parse::<u16>()
            .context(ParseComponentSnafu { component: "year" })?;
        let month = component("month")?
            .parse::<u8>()
            .context(ParseComponentSnafu { component: "month" })?;
        let day = component("day")?
            .parse::<u8>()
            .context(ParseComponentSnafu { component: "day" })?;

        ensure!((1..=12).contains(&month), MonthOutOfRangeSnafu { month });
        ensure!(
            day >= 1 && day <= Self::days_in_month(year, month),
            DayOutOfRangeSnafu { year, month, day }
        );

        Ok(Self {
            year,
            month,
            day,
            preview: captures.name("preview").is_some(),
        })
    }
}

impl PartialOrd for ReleaseDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseDate {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.month, self.day)
            .cmp(&(other.year, other.month, other.day))
            // A preview precedes the general release of the same day
            .then_with(|| other.preview.cmp(&self.preview))
    }
}

impl Display for ReleaseDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)?;
        if self.preview {
            write!(f, "-preview")?;
        }
        Ok(())
    }
}
