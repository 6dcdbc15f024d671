use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::task::Status;

/// Set of statuses shown to the user; everything else is counted as hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatusFilter {
    shown: [bool; 6],
}

impl StatusFilter {
    pub fn all() -> Self {
        Self { shown: [true; 6] }
    }

    pub fn only(statuses: &[Status]) -> Self {
        let mut shown = [false; 6];
        for status in statuses {
            shown[status.index()] = true;
        }
        Self { shown }
    }

    /// Comma separated status names, or `all`. Case insensitive.
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut statuses = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("all") {
                return Ok(Self::all());
            }
            statuses.push(part.parse::<Status>()?);
        }
        if statuses.is_empty() {
            return Err(format!("empty status filter '{input}'"));
        }
        Ok(Self::only(&statuses))
    }

    pub fn shows(&self, status: Status) -> bool {
        self.shown[status.index()]
    }
}

impl Default for StatusFilter {
    /// Everything except `None`.
    fn default() -> Self {
        Self::only(&[
            Status::Success,
            Status::Info,
            Status::Warning,
            Status::Failure,
            Status::Error,
        ])
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StatusFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StatusFilter> for String {
    fn from(filter: StatusFilter) -> Self {
        filter.to_string()
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shown.iter().all(|s| *s) {
            return f.write_str("all");
        }
        let names: Vec<String> = Status::ALL
            .into_iter()
            .filter(|s| self.shows(*s))
            .map(|s| s.as_str().to_ascii_lowercase())
            .collect();
        f.write_str(&names.join(","))
    }
}

/// Per-status counters for results the filter hid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HiddenCounts {
    counts: [usize; 6],
}

impl HiddenCounts {
    pub fn record(&mut self, status: Status) {
        self.counts[status.index()] += 1;
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn get(&self, status: Status) -> usize {
        self.counts[status.index()]
    }

    /// `"2 Success, 1 None"`, in status order, skipping zero counters.
    pub fn breakdown(&self) -> String {
        Status::ALL
            .into_iter()
            .filter(|s| self.get(*s) > 0)
            .map(|s| format!("{} {}", self.get(s), s))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
