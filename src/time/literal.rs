//! Literal-kind detection.
//!
//! A literal is tried against each grammar in a fixed order (timestamp, local
//! date, nanos, period, local time) using only the quiet parsers; the first
//! grammar that accepts it decides the kind.

use std::fmt;
use std::ops::Range;

use chrono::{NaiveDate, NaiveTime};

use crate::time::format::{format_nanos, format_timestamp};
use crate::time::parse::{
    parse_date_quiet, parse_local_time_quiet, parse_nanos_quiet, parse_period_quiet,
    parse_timestamp_quiet, DateStyle,
};
use crate::time::period::Period;
use crate::time::timestamp::Timestamp;
use crate::time::zone::TimeZone;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLiteral {
    Timestamp(Timestamp),
    Date(NaiveDate),
    Nanos(i64),
    Period(Period),
    LocalTime(NaiveTime),
}

impl TimeLiteral {
    pub fn kind(&self) -> &'static str {
        match self {
            TimeLiteral::Timestamp(_) => "timestamp",
            TimeLiteral::Date(_) => "date",
            TimeLiteral::Nanos(_) => "nanos",
            TimeLiteral::Period(_) => "period",
            TimeLiteral::LocalTime(_) => "local time",
        }
    }

    /// Canonical rendering; timestamps are written in `zone`.
    pub fn render(&self, zone: TimeZone) -> String {
        match self {
            TimeLiteral::Timestamp(t) => format_timestamp(*t, zone),
            TimeLiteral::Date(d) => d.format("%Y-%m-%d").to_string(),
            TimeLiteral::Nanos(n) => format_nanos(*n),
            TimeLiteral::Period(p) => p.to_string(),
            TimeLiteral::LocalTime(t) => format!("L{}", t.format("%H:%M:%S%.f")),
        }
    }
}

impl fmt::Display for TimeLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.render(TimeZone::UTC))
    }
}

/// Classify `s` with month/day/year slash dates.
pub fn detect_literal(s: &str) -> Option<TimeLiteral> {
    detect_literal_with_style(s, DateStyle::default())
}

pub fn detect_literal_with_style(s: &str, style: DateStyle) -> Option<TimeLiteral> {
    if let Some(t) = parse_timestamp_quiet(s) {
        return Some(TimeLiteral::Timestamp(t));
    }
    if let Some(d) = parse_date_quiet(s, style) {
        return Some(TimeLiteral::Date(d));
    }
    if let Some(n) = parse_nanos_quiet(s) {
        return Some(TimeLiteral::Nanos(n));
    }
    if let Some(p) = parse_period_quiet(s) {
        return Some(TimeLiteral::Period(p));
    }
    parse_local_time_quiet(s).map(TimeLiteral::LocalTime)
}

/// A single-quoted span found in an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedLiteral {
    /// Byte range of the text between the quotes.
    pub span: Range<usize>,
    pub literal: Option<TimeLiteral>,
}

/// Find every `'...'` span in `expression` and classify its contents.
///
/// Spans of zero or one character are character literals and are skipped.
pub fn scan_quoted_literals(expression: &str, style: DateStyle) -> Vec<QuotedLiteral> {
    let mut out = Vec::new();
    let mut rest = 0;
    while let Some(open) = expression[rest..].find('\'') {
        let start = rest + open + 1;
        let Some(close) = expression[start..].find('\'') else {
            break;
        };
        let end = start + close;
        let text = &expression[start..end];
        if text.len() > 1 {
            out.push(QuotedLiteral {
                span: start..end,
                literal: detect_literal_with_style(text, style),
            });
        }
        rest = end + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::HOUR;

    #[test]
    fn detection_order() {
        assert!(matches!(
            detect_literal("2013-01-15T09:30:00 NY"),
            Some(TimeLiteral::Timestamp(_))
        ));
        assert!(matches!(detect_literal("2013-01-15"), Some(TimeLiteral::Date(_))));
        assert!(matches!(detect_literal("1/15/2013"), Some(TimeLiteral::Date(_))));
        assert_eq!(detect_literal("1WT1H"), Some(TimeLiteral::Nanos(169 * HOUR)));
        assert_eq!(detect_literal("01:00"), Some(TimeLiteral::Nanos(HOUR)));
        assert!(matches!(detect_literal("1Y2M"), Some(TimeLiteral::Period(_))));
        assert!(matches!(detect_literal("L09:30"), Some(TimeLiteral::LocalTime(_))));
        assert_eq!(detect_literal("hello"), None);
    }

    #[test]
    fn rendering() {
        let lit = detect_literal("2013-01-15T09:30:00.000 NY").expect("timestamp");
        assert_eq!(lit.render(TimeZone::NY), "2013-01-15T09:30:00.000 NY");
        let local = detect_literal("L09:30:00.5").expect("local time");
        assert_eq!(local.render(TimeZone::UTC), "L09:30:00.500");
        assert_eq!(detect_literal("1Y").expect("period").to_string(), "period 1Y");
    }

    #[test]
    fn scans_quoted_spans() {
        let expr = "Ts > '2013-01-15T09:30 NY' && c == 'x' && d < '1/15/2013' && 'bogus'";
        let found = scan_quoted_literals(expr, DateStyle::MDY);
        assert_eq!(found.len(), 3);
        assert_eq!(&expr[found[0].span.clone()], "2013-01-15T09:30 NY");
        assert!(matches!(found[0].literal, Some(TimeLiteral::Timestamp(_))));
        assert!(matches!(found[1].literal, Some(TimeLiteral::Date(_))));
        assert_eq!(found[2].literal, None);
    }
}
