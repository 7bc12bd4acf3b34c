//! Log verbosity for data clients.
//!
//! `LOGGER_LEVEL` is an ordinal where 0 is the most verbose and higher
//! numbers are quieter; 5 and 6 share the quietest band. Input that does not
//! start with an integer leaves the setting unset, in which case the framework
//! default (every category) applies.

use std::collections::BTreeSet;
use std::fmt;

pub const LOGGER_LEVEL_VAR: &str = "LOGGER_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogCategory {
    Query,
    Info,
    Warn,
    Error,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Query => "query",
            LogCategory::Info => "info",
            LogCategory::Warn => "warn",
            LogCategory::Error => "error",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCategories(BTreeSet<LogCategory>);

impl LogCategories {
    pub fn all() -> Self {
        Self::of(&[
            LogCategory::Query,
            LogCategory::Info,
            LogCategory::Warn,
            LogCategory::Error,
        ])
    }

    pub fn of(categories: &[LogCategory]) -> Self {
        Self(categories.iter().copied().collect())
    }

    pub fn contains(&self, category: LogCategory) -> bool {
        self.0.contains(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = LogCategory> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LogCategories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(LogCategory::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Read a leading integer the way lenient env parsing usually does:
/// leading whitespace, optional sign, then digits. Trailing text is ignored.
/// Values beyond `i64` saturate.
pub fn parse_level(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: &str = {
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        &digits[..end]
    };
    if digits.is_empty() {
        return None;
    }

    let magnitude = digits.bytes().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

/// Map an ordinal level to its log categories.
pub fn categories_for_level(level: i64) -> LogCategories {
    match level {
        5 | 6 => LogCategories::of(&[LogCategory::Error]),
        4 => LogCategories::of(&[LogCategory::Warn, LogCategory::Error]),
        3 => LogCategories::of(&[LogCategory::Info, LogCategory::Error, LogCategory::Warn]),
        // 0, 1, 2 and anything outside the table
        _ => LogCategories::all(),
    }
}

/// Log configuration for a client. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    explicit: Option<LogCategories>,
}

impl LogConfig {
    /// Leave logging to the framework default.
    pub fn unset() -> Self {
        Self { explicit: None }
    }

    pub fn explicit(categories: LogCategories) -> Self {
        Self {
            explicit: Some(categories),
        }
    }

    /// Derive the configuration from a raw `LOGGER_LEVEL` value.
    pub fn from_level(raw: Option<&str>) -> Self {
        match raw.and_then(parse_level) {
            Some(level) => Self::explicit(categories_for_level(level)),
            None => Self::unset(),
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit.is_some()
    }

    /// Effective categories: the explicit set, or every category when unset.
    pub fn categories(&self) -> LogCategories {
        self.explicit.clone().unwrap_or_else(LogCategories::all)
    }

    pub fn enabled(&self, category: LogCategory) -> bool {
        match &self.explicit {
            Some(categories) => categories.contains(category),
            None => true,
        }
    }
}
