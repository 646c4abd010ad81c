//! Season windows, year ranges and band labels

use seasonwatch_core::{Error, Result};
use std::fmt;

/// Inclusive range of years eligible for compositing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    /// Create a validated year range (`start <= end`)
    pub fn new(start: i32, end: i32) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange {
                what: "year_range",
                value: format!("{}..={}", start, end),
                bounds: "start <= end".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    /// Number of years in the range
    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate years ascending
    pub fn iter(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

/// Within-year month window shared across all years in range.
///
/// Both bounds are absolute calendar months in `1..=12`, inclusive, with
/// `month_start <= month_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonWindow {
    month_start: u32,
    month_end: u32,
}

impl SeasonWindow {
    /// Create a validated season window
    pub fn new(month_start: u32, month_end: u32) -> Result<Self> {
        if !(1..=12).contains(&month_start) || !(1..=12).contains(&month_end) {
            return Err(Error::InvalidRange {
                what: "season_month",
                value: format!("{}..={}", month_start, month_end),
                bounds: "1..=12".to_string(),
            });
        }
        if month_start > month_end {
            return Err(Error::InvalidRange {
                what: "season_window",
                value: format!("{}..={}", month_start, month_end),
                bounds: "month_start <= month_end".to_string(),
            });
        }
        Ok(Self {
            month_start,
            month_end,
        })
    }

    pub fn month_start(&self) -> u32 {
        self.month_start
    }

    pub fn month_end(&self) -> u32 {
        self.month_end
    }

    /// Number of months in the window
    pub fn len(&self) -> usize {
        (self.month_end - self.month_start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether a calendar month falls inside the window
    pub fn contains(&self, month: u32) -> bool {
        (self.month_start..=self.month_end).contains(&month)
    }

    /// Iterate calendar months ascending
    pub fn months(&self) -> impl Iterator<Item = u32> {
        self.month_start..=self.month_end
    }

    /// 1-based offset of a calendar month within the window.
    ///
    /// March in a March..=August window has index 1, August has index 6.
    pub fn season_index(&self, month: u32) -> Result<u32> {
        if !self.contains(month) {
            return Err(Error::InvalidRange {
                what: "month",
                value: month.to_string(),
                bounds: format!("{}..={}", self.month_start, self.month_end),
            });
        }
        Ok(month - self.month_start + 1)
    }
}

/// Deterministic band label `{prefix}_{year}_{season_index}`.
///
/// `season_index` is the 1-based offset within the season window, not the
/// absolute calendar month; uniqueness across a stack comes from the year
/// varying while indices cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandLabel {
    pub prefix: String,
    pub year: i32,
    pub season_index: u32,
}

impl BandLabel {
    pub fn new(prefix: impl Into<String>, year: i32, season_index: u32) -> Self {
        Self {
            prefix: prefix.into(),
            year,
            season_index,
        }
    }

    /// Label for a composite's calendar month within a season window
    pub fn for_month(
        prefix: &str,
        year: i32,
        month: u32,
        season: &SeasonWindow,
    ) -> Result<Self> {
        Ok(Self::new(prefix, year, season.season_index(month)?))
    }

    /// Parse a `{prefix}_{year}_{season_index}` label.
    ///
    /// The prefix itself may contain underscores; the year and index are
    /// taken from the last two `_`-separated tokens (the shape the
    /// deviation pipeline reads back from band descriptions).
    pub fn parse(label: &str) -> Result<Self> {
        let err = || Error::BandLabel {
            label: label.to_string(),
        };

        let (rest, index_token) = label.rsplit_once('_').ok_or_else(err)?;
        let (prefix, year_token) = rest.rsplit_once('_').ok_or_else(err)?;
        if prefix.is_empty() || year_token.len() != 4 {
            return Err(err());
        }

        let year: i32 = year_token.parse().map_err(|_| err())?;
        let season_index: u32 = index_token.parse().map_err(|_| err())?;
        if season_index == 0 {
            return Err(err());
        }

        Ok(Self::new(prefix, year, season_index))
    }
}

impl fmt::Display for BandLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.prefix, self.year, self.season_index)
    }
}
