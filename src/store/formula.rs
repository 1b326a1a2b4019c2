//! Filter-formula construction for the record store's query dialect.
//!
//! Every value that ends up inside a formula passes through this module, so
//! quoting and escaping can be audited in one place. Callers compose
//! fragments with [`chain`] and never hand-write quotes.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed layout handed to `DATETIME_PARSE`, matching what [`datetime_expression`] renders.
pub const DATETIME_PARSE_FORMAT: &str = "YYYY MM DD HH mm ss ZZ";

const RENDER_FORMAT: &str = "%Y %m %d %H %M %S %z";

/// Binary boolean combinator used to fold expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::And => write!(f, "AND"),
            Combinator::Or => write!(f, "OR"),
        }
    }
}

/// Unit specifiers understood by the store's date functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateTimeUnit {
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl DateTimeUnit {
    pub fn specifier(&self) -> &'static str {
        match self {
            DateTimeUnit::Milliseconds => "ms",
            DateTimeUnit::Seconds => "s",
            DateTimeUnit::Minutes => "m",
            DateTimeUnit::Hours => "h",
            DateTimeUnit::Days => "d",
            DateTimeUnit::Weeks => "w",
            DateTimeUnit::Months => "M",
            DateTimeUnit::Years => "y",
        }
    }
}

/// A point in time that may or may not carry its own offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

/// A naive timestamp so close to the calendar bounds that shifting it into a
/// zone leaves the representable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timestamp {local} is out of range at offset {zone}")]
pub struct TimestampOutOfRange {
    pub local: NaiveDateTime,
    pub zone: FixedOffset,
}

impl Timestamp {
    /// Resolve to an aware instant, attaching `zone` only when none is present.
    pub fn with_default_zone(
        self,
        zone: FixedOffset,
    ) -> Result<DateTime<FixedOffset>, TimestampOutOfRange> {
        match self {
            Timestamp::Zoned(at) => Ok(at),
            Timestamp::Naive(local) => local
                .checked_sub_signed(TimeDelta::seconds(i64::from(zone.local_minus_utc())))
                .map(|utc| zone.from_utc_datetime(&utc))
                .ok_or(TimestampOutOfRange { local, zone }),
        }
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Timestamp::Naive(value)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Timestamp::Zoned(value)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp::Zoned(value.fixed_offset())
    }
}

/// Parses RFC 3339 (`2021-07-10T09:30:00+07:00`), naive ISO 8601
/// (`2021-07-10T09:30:00`) or a bare date (midnight, naive).
impl FromStr for Timestamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(at) = DateTime::parse_from_rfc3339(s) {
            return Ok(Timestamp::Zoned(at));
        }
        for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(local) = NaiveDateTime::parse_from_str(s, layout) {
                return Ok(Timestamp::Naive(local));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Timestamp::Naive(date.and_time(chrono::NaiveTime::MIN)));
        }
        Err(format!("unrecognised timestamp '{}'", s))
    }
}

/// Right-fold `expressions` with `combinator`.
///
/// `[]` renders as the empty string, a single expression as itself, and
/// anything longer as `OP(first,OP(second,...))`. Fragments are inserted
/// verbatim and must already be valid formula syntax.
pub fn chain<S: AsRef<str>>(combinator: Combinator, expressions: &[S]) -> String {
    match expressions.split_last() {
        None => String::new(),
        Some((last, rest)) => rest.iter().rev().fold(last.as_ref().to_string(), |acc, expr| {
            format!("{}({},{})", combinator, expr.as_ref(), acc)
        }),
    }
}

/// Render `at` as a `DATETIME_PARSE(...)` call.
///
/// Naive instants are interpreted in `default_zone`; zoned instants keep their own offset.
pub fn datetime_expression(
    at: impl Into<Timestamp>,
    default_zone: FixedOffset,
    unit: DateTimeUnit,
) -> Result<String, TimestampOutOfRange> {
    let at = at.into().with_default_zone(default_zone)?;
    Ok(instant_expression(at, unit))
}

/// [`datetime_expression`] for an instant that already carries its offset.
pub fn instant_expression(at: DateTime<FixedOffset>, unit: DateTimeUnit) -> String {
    format!(
        "DATETIME_PARSE({},{},{})",
        string_literal(&at.format(RENDER_FORMAT).to_string()),
        string_literal(DATETIME_PARSE_FORMAT),
        string_literal(unit.specifier())
    )
}

/// Double-quoted string literal with `\`, `"` and line breaks escaped.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Field reference, `{Field Name}`.
pub fn field(name: &str) -> String {
    format!("{{{}}}", name.replace('}', "\\}"))
}

/// `{field}="value"`
pub fn equals(field_name: &str, value: &str) -> String {
    format!("{}={}", field(field_name), string_literal(value))
}

/// `{field}!="value"`
pub fn not_equals(field_name: &str, value: &str) -> String {
    format!("{}!={}", field(field_name), string_literal(value))
}

/// `IS_AFTER({field},<instant>)`
pub fn is_after(field_name: &str, instant_expr: &str) -> String {
    format!("IS_AFTER({},{})", field(field_name), instant_expr)
}

/// `IS_BEFORE({field},<instant>)`
pub fn is_before(field_name: &str, instant_expr: &str) -> String {
    format!("IS_BEFORE({},{})", field(field_name), instant_expr)
}

/// Whole `unit`s elapsed from `{field_name}` to `reference`.
pub fn datetime_diff(reference: &str, field_name: &str, unit: DateTimeUnit) -> String {
    format!(
        "DATETIME_DIFF({},{},{})",
        reference,
        field(field_name),
        string_literal(unit.specifier())
    )
}
