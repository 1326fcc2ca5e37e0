use std::{borrow::Cow, env, fmt, str::FromStr, sync::LazyLock};

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

/// Canonical wire format exchanged with the backend.
pub const ISO_PATTERN: &str = "yyyy-MM-dd";
/// Environment variable holding the application display format.
pub const DATE_FORMAT_ENV: &str = "APP_DATE_FORMAT";

const ISO_STRFTIME: &str = "%Y-%m-%d";

static TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"y+|M+|d+|E+|[A-Za-z]|'(?:[^']|'')*'?|[^A-Za-z']+")
        .expect("date token pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateFormatError {
    #[error("date pattern is empty")]
    Empty,
    #[error("unsupported token '{token}' in date pattern '{pattern}'")]
    UnsupportedToken { pattern: String, token: String },
    #[error("unterminated quoted literal in date pattern '{0}'")]
    UnterminatedLiteral(String),
}

/// Display date pattern written in date-fns token syntax (`dd.MM.yyyy`,
/// `MMM d, yyyy`, ...), compiled to a chrono format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    strftime: String,
}

impl Default for DateFormat {
    fn default() -> Self {
        Self::iso()
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl FromStr for DateFormat {
    type Err = DateFormatError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        Self::parse(pattern)
    }
}

impl DateFormat {
    pub fn iso() -> Self {
        Self {
            pattern: ISO_PATTERN.to_string(),
            strftime: ISO_STRFTIME.to_string(),
        }
    }

    pub fn parse(pattern: &str) -> Result<Self, DateFormatError> {
        if pattern.is_empty() {
            return Err(DateFormatError::Empty);
        }
        let mut strftime = String::with_capacity(pattern.len() * 2);
        for token in TOKENS.find_iter(pattern).map(|m| m.as_str()) {
            let unsupported = || DateFormatError::UnsupportedToken {
                pattern: pattern.to_string(),
                token: token.to_string(),
            };
            let first = token.chars().next().unwrap_or('\'');
            let spec = match (first, token.len()) {
                ('y', 2) => "%y",
                ('y', _) => "%Y",
                ('M', 1) => "%-m",
                ('M', 2) => "%m",
                ('M', 3) => "%b",
                ('M', 4) => "%B",
                ('d', 1) => "%-d",
                ('d', 2) => "%d",
                ('E', 1..=3) => "%a",
                ('E', 4) => "%A",
                ('\'', _) => {
                    push_literal(&mut strftime, quoted_literal(token, pattern)?);
                    continue;
                }
                (letter, _) if letter.is_ascii_alphabetic() => return Err(unsupported()),
                _ => {
                    push_literal(&mut strftime, token);
                    continue;
                }
            };
            strftime.push_str(spec);
        }
        Ok(Self {
            pattern: pattern.to_string(),
            strftime,
        })
    }

    /// Reads `APP_DATE_FORMAT`, falling back to ISO when unset or unusable.
    pub fn from_env() -> Self {
        match env::var(DATE_FORMAT_ENV) {
            Ok(pattern) if !pattern.trim().is_empty() => {
                Self::parse(pattern.trim()).unwrap_or_else(|err| {
                    tracing::warn!("{DATE_FORMAT_ENV}: {err}; using {ISO_PATTERN}");
                    Self::iso()
                })
            }
            _ => Self::iso(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_iso(&self) -> bool {
        self.pattern == ISO_PATTERN
    }

    pub fn parse_date(&self, input: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(input.trim(), &self.strftime).ok()
    }

    pub fn format_date(&self, date: NaiveDate) -> String {
        date.format(&self.strftime).to_string()
    }

    /// Display string to canonical ISO. Empty or unparsable input yields `None`.
    pub fn to_iso(&self, display: &str) -> Option<String> {
        if display.trim().is_empty() {
            return None;
        }
        let date = if self.is_iso() {
            parse_iso(display)?
        } else {
            self.parse_date(display)?
        };
        Some(date.format(ISO_STRFTIME).to_string())
    }

    /// Canonical ISO to display string. Input that is not an ISO date is returned unchanged.
    pub fn from_iso(&self, iso: &str) -> String {
        if iso.is_empty() || self.is_iso() {
            return iso.to_string();
        }
        match parse_iso(iso) {
            Some(date) => self.format_date(date),
            None => iso.to_string(),
        }
    }
}

pub fn parse_iso(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), ISO_STRFTIME).ok()
}

fn quoted_literal<'a>(token: &'a str, pattern: &str) -> Result<Cow<'a, str>, DateFormatError> {
    if token == "''" {
        return Ok("'".into());
    }
    if token.len() < 2 || !token.ends_with('\'') {
        return Err(DateFormatError::UnterminatedLiteral(pattern.to_string()));
    }
    let inner = &token[1..token.len() - 1];
    Ok(if inner.contains("''") {
        inner.replace("''", "'").into()
    } else {
        inner.into()
    })
}

fn push_literal(out: &mut String, literal: impl AsRef<str>) {
    for ch in literal.as_ref().chars() {
        if ch == '%' {
            out.push_str("%%");
        } else {
            out.push(ch);
        }
    }
}
