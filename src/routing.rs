//! Request path classification.
//!
//! Every request path falls into exactly one [`Route`]:
//!
//! | path                        | route                  |
//! |-----------------------------|------------------------|
//! | `/`                         | [`Route::Root`]        |
//! | `/YYYY/MM/DD`, `/YYYY/MM/DD/` | [`Route::DateListing`] |
//! | `/YYYY/MM/DD/<file>`        | [`Route::DateObject`]  |
//! | anything else               | [`Route::Unmatched`]   |
//!
//! Dates are checked for shape and range only (month `01..=12`, day
//! `01..=31`), never against the calendar. Years must start with `20`.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// A `YYYY/MM/DD` partition of the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateKey {
    year: String,
    month: String,
    day: String,
}

impl DateKey {
    /// Parse and validate the three date segments of a path.
    pub fn parse(year: &str, month: &str, day: &str) -> Option<Self> {
        if year.len() != 4 || !year.starts_with("20") || !all_digits(year) {
            return None;
        }
        if !two_digits_in(month, 1, 12) || !two_digits_in(day, 1, 31) {
            return None;
        }
        Some(Self {
            year: year.to_string(),
            month: month.to_string(),
            day: day.to_string(),
        })
    }

    /// Build a key from a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: format!("{:04}", date.year()),
            month: format!("{:02}", date.month()),
            day: format!("{:02}", date.day()),
        }
    }

    /// Today's date in the server's local time zone.
    pub fn today() -> Self {
        Self::from_date(chrono::Local::now().date_naive())
    }

    /// Store prefix for every object on this date: `YYYY/MM/DD/`.
    pub fn prefix(&self) -> String {
        format!("{self}/")
    }

    /// Path of the listing page for this date: `/YYYY/MM/DD`.
    pub fn listing_path(&self) -> String {
        format!("/{self}")
    }

    /// Store key of `filename` on this date: `YYYY/MM/DD/filename`.
    pub fn object_key(&self, filename: &str) -> String {
        format!("{self}/{filename}")
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.year, self.month, self.day)
    }
}

/// Classified request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`: redirect to today's listing.
    Root,
    /// List every object stored under a date.
    DateListing(DateKey),
    /// Stream a single object.
    DateObject { date: DateKey, filename: String },
    /// Anything else.
    Unmatched,
}

/// Classify a request path (without query string).
pub fn classify(path: &str) -> Route {
    if path == "/" {
        return Route::Root;
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Route::Unmatched;
    };

    let segments: Vec<&str> = rest.split('/').collect();
    match segments.as_slice() {
        [year, month, day] | [year, month, day, ""] => match DateKey::parse(year, month, day) {
            Some(date) => Route::DateListing(date),
            None => Route::Unmatched,
        },
        [year, month, day, filename] => {
            match (DateKey::parse(year, month, day), valid_filename(filename)) {
                (Some(date), true) => Route::DateObject {
                    date,
                    filename: filename.to_string(),
                },
                _ => Route::Unmatched,
            }
        }
        _ => Route::Unmatched,
    }
}

/// Filenames are restricted to `[-.a-z0-9]+`.
fn valid_filename(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn two_digits_in(s: &str, min: u32, max: u32) -> bool {
    if s.len() != 2 || !all_digits(s) {
        return false;
    }
    s.parse::<u32>().is_ok_and(|n| (min..=max).contains(&n))
}
