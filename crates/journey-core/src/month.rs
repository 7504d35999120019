use chrono::Datelike;
use std::fmt;

use crate::{QueryError, Timestamp};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A calendar month. Orders chronologically; displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    /// 1-based.
    pub month: u32,
}

impl MonthKey {
    pub fn of(ts: &Timestamp) -> Self {
        let local = ts.local();
        Self {
            year: local.year(),
            month: local.month(),
        }
    }

    /// Parse a canonical "Month Year" label such as "February 2025".
    ///
    /// The month name must be spelled and capitalised exactly as in
    /// [`MONTH_NAMES`] and the year must be four digits.
    pub fn parse_label(label: &str) -> Result<Self, QueryError> {
        let invalid = || {
            QueryError::InvalidInput(format!(
                "'{label}' is not a valid month; expected a label like 'February 2025'."
            ))
        };
        let (name, year) = label.split_once(' ').ok_or_else(invalid)?;
        let month = MONTH_NAMES
            .iter()
            .position(|m| *m == name)
            .ok_or_else(invalid)?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        Ok(Self {
            year,
            month: month as u32 + 1,
        })
    }

    fn name(&self) -> &'static str {
        MONTH_NAMES[(self.month as usize).saturating_sub(1) % 12]
    }

    /// "February 2025"
    pub fn label(&self) -> String {
        format!("{} {:04}", self.name(), self.year)
    }

    /// "Feb 2025"
    pub fn short_label(&self) -> String {
        format!("{} {:04}", &self.name()[..3], self.year)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
