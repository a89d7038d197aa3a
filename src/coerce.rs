//! Cell coercion shared by every parser.
//!
//! None of these functions fail: a cell that cannot be read as the requested
//! type degrades to zero, `None` or the empty string, so one bad cell costs a
//! field rather than the whole file.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::grid::Cell;

const CURRENCY_SYMBOLS: &[char] = &['₪', '$', '€', '£'];

/// Tried in order; the first format that parses wins.
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M",
];

fn is_bidi_mark(c: char) -> bool {
    matches!(c, '\u{200e}' | '\u{200f}' | '\u{202a}'..='\u{202e}' | '\u{2066}'..='\u{2069}')
}

/// Parse an amount as it appears in exported statements: thousands
/// separators, currency symbols and quotes are ignored, `(12.50)` and
/// `12.50-` are negative. Anything unreadable is zero.
pub fn parse_amount(raw: &str) -> Decimal {
    let value = parse_signed(raw);
    // "()" or "0-" must not come out as negative zero.
    if value.is_zero() {
        Decimal::ZERO
    } else {
        value
    }
}

fn parse_signed(raw: &str) -> Decimal {
    let s: String = raw
        .chars()
        .filter(|c| {
            *c != ','
                && *c != '"'
                && !c.is_whitespace()
                && !CURRENCY_SYMBOLS.contains(c)
                && !is_bidi_mark(*c)
        })
        .collect();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -parse_plain(inner);
    }
    if let Some(inner) = s.strip_suffix('-') {
        if !inner.is_empty() && !inner.starts_with('-') {
            return -parse_plain(inner);
        }
    }
    parse_plain(&s)
}

fn parse_plain(s: &str) -> Decimal {
    let s = s.strip_prefix('+').unwrap_or(s);
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .unwrap_or(Decimal::ZERO)
}

fn float_to_decimal(n: f64) -> Decimal {
    if !n.is_finite() {
        return Decimal::ZERO;
    }
    // Display gives the shortest round-tripping form, so 0.1 stays 0.1.
    Decimal::from_str(&n.to_string()).unwrap_or(Decimal::ZERO)
}

pub fn safe_number(cell: &Cell) -> Decimal {
    match cell {
        Cell::Number(n) => float_to_decimal(*n),
        Cell::Text(s) => parse_amount(s),
        _ => Decimal::ZERO,
    }
}

// Through the decimal text, so "0.4" lands on the same f64 as the literal.
fn decimal_to_f64(d: Decimal) -> f64 {
    d.to_string().parse().unwrap_or(0.0)
}

/// A ratio in `0..=1` terms. Text ending in `%` is divided by 100.
pub fn safe_fraction(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Text(s) => match s.trim().strip_suffix('%') {
            Some(pct) => decimal_to_f64(parse_amount(pct) / Decimal::ONE_HUNDRED),
            None => decimal_to_f64(parse_amount(s)),
        },
        _ => 0.0,
    }
}

/// chrono's `%Y` takes one to four digits; a two-digit year like `24` is
/// not a year here.
fn has_four_digit_year(s: &str) -> bool {
    let date_part = s.split([' ', 'T']).next().unwrap_or(s);
    let parts: Vec<&str> = date_part.split(['/', '-', '.']).collect();
    parts.len() == 3 && (parts[0].len() == 4 || parts[2].len() == 4)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() || !has_four_digit_year(s) {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn safe_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(dt) => Some(dt.date()),
        Cell::Text(s) => parse_date(s),
        _ => None,
    }
}

/// Render a number the way a person typed it: `3.0` reads as `3`.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

pub fn safe_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) => format_number(*n),
        Cell::Bool(b) => b.to_string(),
        Cell::Date(dt) => {
            if dt.num_seconds_from_midnight() == 0 {
                dt.format("%Y-%m-%d").to_string()
            } else {
                dt.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }
    }
}

/// Whole numbers only: `7`, `7.0` and `"7"` are 7; `7.5`, `"abc"` and empty
/// cells are not integers.
pub fn safe_int(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Number(n) => {
            if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
                Some(*n as i64)
            } else {
                None
            }
        }
        Cell::Text(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Some(i);
            }
            let d = Decimal::from_str(s).ok()?;
            if d.fract().is_zero() {
                d.to_i64()
            } else {
                None
            }
        }
        _ => None,
    }
}
