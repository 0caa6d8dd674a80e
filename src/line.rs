//! Parsing and rendering of normalized log lines.
//!
//! Every converted log line looks like one of:
//!
//! ```text
//! [01/15/2024 -:- 10:30:45 AM] alice: Hello everyone!
//! [01/15/2024 -:- 10:31:00 AM] bob joined the chat room.
//! ```
//!
//! [`LineParser`] splits such a line into a [`ParsedLine`] (timestamp and
//! body). Lines that do not carry a bracketed prefix are kept as
//! [`LineShape::Bare`], and lines whose prefix is not a valid date-time as
//! [`LineShape::Malformed`]; neither is ever dropped.
//!
//! # Example
//!
//! ```rust
//! use colloquy_logs::line::LineParser;
//!
//! let parser = LineParser::new();
//! let line = parser.parse_line("[01/15/2024 -:- 02:05:00 PM] alice: hi\n", 1);
//!
//! assert_eq!(line.body(), "alice: hi");
//! assert_eq!(line.timestamp().unwrap().to_string(), "2024-01-15 14:05:00");
//! ```

use chrono::{NaiveDateTime, Timelike};
use regex::Regex;

use crate::error::{LogError, Result};

/// Token between the date and time portions of a timestamp.
pub const DATE_TIME_SEPARATOR: &str = "-:-";

/// `[<timestamp>] <body>`; the timestamp is the shortest bracketed prefix.
const LINE_PATTERN: &str = r"^\[(.*?)\] (.*)$";

/// Formats tried after the separator and meridiem are removed.
const DATE_TIME_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"];

/// A line whose bracketed prefix parsed as a date-time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Second-resolution wall-clock time, meridiem already applied.
    pub timestamp: NaiveDateTime,
    /// Everything after `"] "`.
    pub body: String,
}

/// What the parser recognized in a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineShape {
    /// Bracketed timestamp prefix and body.
    Stamped(ParsedLine),

    /// A bracketed prefix whose contents are not a valid date-time.
    Malformed {
        /// Text between the brackets
        stamp: String,
        /// Text after `"] "`
        body: String,
    },

    /// No bracketed prefix; a continuation or foreign line.
    Bare,
}

/// One line of a log file, immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    raw: String,
    number: usize,
    shape: LineShape,
}

impl LogLine {
    /// The line as read, without its line ending.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 1-based position in the source file.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn shape(&self) -> &LineShape {
        &self.shape
    }

    /// The parsed timestamp and body, if the line is stamped.
    pub fn parsed(&self) -> Option<&ParsedLine> {
        match &self.shape {
            LineShape::Stamped(parsed) => Some(parsed),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.parsed().map(|p| p.timestamp)
    }

    /// The text compared by the merge equality rule.
    ///
    /// For bare lines this is the whole line.
    pub fn body(&self) -> &str {
        match &self.shape {
            LineShape::Stamped(parsed) => &parsed.body,
            LineShape::Malformed { body, .. } => body,
            LineShape::Bare => &self.raw,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self.shape, LineShape::Stamped(_))
    }

    /// Returns `true` if both lines carry the same body, ignoring timestamps.
    ///
    /// A bare line only matches another bare line; a line with a bracketed
    /// prefix only matches another prefixed line.
    pub fn same_body(&self, other: &LogLine) -> bool {
        match (&self.shape, &other.shape) {
            (LineShape::Bare, LineShape::Bare) => self.raw == other.raw,
            (LineShape::Bare, _) | (_, LineShape::Bare) => false,
            _ => self.body() == other.body(),
        }
    }

    pub fn into_raw(self) -> String {
        self.raw
    }
}

/// Splits normalized log lines into timestamp and body.
///
/// Holds the compiled prefix pattern, so build one per reader and reuse it.
#[derive(Debug, Clone)]
pub struct LineParser {
    prefix: Regex,
}

impl LineParser {
    pub fn new() -> Self {
        Self {
            prefix: Regex::new(LINE_PATTERN).expect("line prefix pattern is valid"),
        }
    }

    /// Classifies one line. A trailing `\n` or `\r\n` is ignored.
    pub fn parse(&self, line: &str) -> LineShape {
        let line = strip_line_ending(line);

        let Some(caps) = self.prefix.captures(line) else {
            return LineShape::Bare;
        };
        let stamp = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());

        match parse_timestamp(stamp) {
            Ok(timestamp) => LineShape::Stamped(ParsedLine {
                timestamp,
                body: body.to_string(),
            }),
            Err(_) => LineShape::Malformed {
                stamp: stamp.to_string(),
                body: body.to_string(),
            },
        }
    }

    /// Parses one line into a [`LogLine`] numbered `number`.
    pub fn parse_line(&self, line: &str, number: usize) -> LogLine {
        LogLine {
            raw: strip_line_ending(line).to_string(),
            number,
            shape: self.parse(line),
        }
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

/// Parses the text between the brackets, e.g. `01/15/2024 -:- 10:30:45 AM`.
///
/// The hour may be written on a 12-hour clock (`02:05:00 PM`) or as the
/// 24-hour value next to its meridiem (`14:05:00 PM`); both resolve to 14:05.
/// Without a meridiem the hour is read as a 24-hour clock.
///
/// # Errors
///
/// Returns [`LogError::InvalidTimestamp`] if the text is not a valid
/// date-time or the hour contradicts the meridiem.
pub fn parse_timestamp(stamp: &str) -> Result<NaiveDateTime> {
    let normalized = stamp
        .replacen(DATE_TIME_SEPARATOR, " ", 1)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let (clock, meridiem) = split_meridiem(&normalized);

    let naive = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(clock, format).ok())
        .ok_or_else(|| LogError::invalid_timestamp(stamp))?;

    let resolved = match meridiem {
        Some(meridiem) => apply_meridiem(naive, meridiem),
        None => Some(naive),
    };
    resolved.ok_or_else(|| LogError::invalid_timestamp(stamp))
}

fn split_meridiem(text: &str) -> (&str, Option<Meridiem>) {
    match text.rsplit_once(' ') {
        Some((clock, token)) if token.eq_ignore_ascii_case("AM") => (clock, Some(Meridiem::Am)),
        Some((clock, token)) if token.eq_ignore_ascii_case("PM") => (clock, Some(Meridiem::Pm)),
        _ => (text, None),
    }
}

fn apply_meridiem(naive: NaiveDateTime, meridiem: Meridiem) -> Option<NaiveDateTime> {
    let hour = naive.hour();
    let resolved = match (meridiem, hour) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Am, h) if h < 12 => h,
        (Meridiem::Pm, 0) => return None,
        (Meridiem::Pm, h) if h < 12 => h + 12,
        (Meridiem::Pm, h) => h,
        (Meridiem::Am, _) => return None,
    };
    naive.with_hour(resolved)
}

/// Renders the bracketed prefix the way converted logs carry it.
///
/// The hour is the 24-hour value, followed by `AM` before noon and `PM`
/// from noon on, e.g. `[01/15/2024 -:- 14:05:00 PM]`.
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    let meridiem = if timestamp.hour() >= 12 { "PM" } else { "AM" };
    format!(
        "[{} {} {} {}]",
        timestamp.format("%m/%d/%Y"),
        DATE_TIME_SEPARATOR,
        timestamp.format("%H:%M:%S"),
        meridiem
    )
}

/// Renders a chat message line (without line ending).
pub fn render_message(timestamp: &NaiveDateTime, nick: &str, body: &str) -> String {
    format!(
        "{} {}: {}",
        format_timestamp(timestamp),
        nick,
        single_line(body)
    )
}

/// Renders a system event line (without line ending).
pub fn render_event(timestamp: &NaiveDateTime, body: &str) -> String {
    format!("{} {}", format_timestamp(timestamp), single_line(body))
}

/// Collapses a possibly multi-line body onto one line.
fn single_line(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Removes one trailing `\n` or `\r\n`.
pub fn strip_line_ending(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_parse_message_line() {
        let parser = LineParser::new();
        let line = parser.parse_line("[01/01/2024 -:- 10:00:00 AM] alice: hi", 1);

        let parsed = line.parsed().unwrap();
        assert_eq!(parsed.timestamp, at(10, 0, 0));
        assert_eq!(parsed.body, "alice: hi");
        assert_eq!(line.number(), 1);
    }

    #[test]
    fn test_trailing_newline_tolerated() {
        let parser = LineParser::new();
        let line = parser.parse_line("[01/01/2024 -:- 10:00:00 AM] alice: hi\r\n", 4);
        assert_eq!(line.raw(), "[01/01/2024 -:- 10:00:00 AM] alice: hi");
        assert_eq!(line.body(), "alice: hi");
    }

    #[test]
    fn test_twelve_hour_clock() {
        assert_eq!(
            parse_timestamp("01/01/2024 -:- 02:05:00 PM").unwrap(),
            at(14, 5, 0)
        );
        assert_eq!(
            parse_timestamp("01/01/2024 -:- 12:30:00 PM").unwrap(),
            at(12, 30, 0)
        );
        assert_eq!(
            parse_timestamp("01/01/2024 -:- 12:15:00 AM").unwrap(),
            at(0, 15, 0)
        );
    }

    #[test]
    fn test_legacy_twenty_four_hour_with_meridiem() {
        assert_eq!(
            parse_timestamp("01/01/2024 -:- 14:05:00 PM").unwrap(),
            at(14, 5, 0)
        );
        assert_eq!(
            parse_timestamp("01/01/2024 -:- 00:30:00 AM").unwrap(),
            at(0, 30, 0)
        );
    }

    #[test]
    fn test_contradicting_meridiem_is_invalid() {
        let err = parse_timestamp("01/01/2024 -:- 14:05:00 AM").unwrap_err();
        assert!(err.is_timestamp());
    }

    #[test]
    fn test_no_meridiem_is_twenty_four_hour() {
        assert_eq!(
            parse_timestamp("01/01/2024 -:- 18:00:00").unwrap(),
            at(18, 0, 0)
        );
    }

    #[test]
    fn test_malformed_prefix_keeps_body() {
        let parser = LineParser::new();
        let line = parser.parse_line("[not a date] alice: hi", 2);

        assert!(!line.is_parsed());
        assert!(line.timestamp().is_none());
        assert_eq!(line.body(), "alice: hi");
        assert_eq!(
            line.shape(),
            &LineShape::Malformed {
                stamp: "not a date".into(),
                body: "alice: hi".into()
            }
        );
    }

    #[test]
    fn test_bare_line_body_is_whole_line() {
        let parser = LineParser::new();
        let line = parser.parse_line("  continued from above\n", 3);

        assert_eq!(line.shape(), &LineShape::Bare);
        assert_eq!(line.body(), "  continued from above");
    }

    #[test]
    fn test_bracket_without_space_is_bare() {
        let parser = LineParser::new();
        assert_eq!(parser.parse("[01/01/2024 -:- 10:00:00 AM]"), LineShape::Bare);
    }

    #[test]
    fn test_same_body_ignores_timestamp() {
        let parser = LineParser::new();
        let a = parser.parse_line("[01/01/2024 -:- 10:00:00 AM] alice: hi", 1);
        let b = parser.parse_line("[01/01/2024 -:- 10:00:07 AM] alice: hi", 1);
        let c = parser.parse_line("[01/01/2024 -:- 10:00:00 AM] alice: hi!", 1);
        assert!(a.same_body(&b));
        assert!(!a.same_body(&c));
    }

    #[test]
    fn test_same_body_needs_matching_shape() {
        let parser = LineParser::new();
        let stamped = parser.parse_line("[01/01/2024 -:- 10:00:00 AM] alice: hi", 1);
        let bare = parser.parse_line("alice: hi", 2);
        let malformed = parser.parse_line("[99/99/2024 -:- 10:00:00 AM] alice: hi", 3);

        assert!(!stamped.same_body(&bare));
        assert!(!bare.same_body(&stamped));
        assert!(!bare.same_body(&malformed));
        assert!(stamped.same_body(&malformed));
        assert!(bare.same_body(&parser.parse_line("alice: hi", 9)));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(&at(9, 5, 3)), "[01/01/2024 -:- 09:05:03 AM]");
        assert_eq!(format_timestamp(&at(14, 0, 0)), "[01/01/2024 -:- 14:00:00 PM]");
    }

    #[test]
    fn test_render_message_and_event() {
        assert_eq!(
            render_message(&at(10, 0, 0), "alice", "hi"),
            "[01/01/2024 -:- 10:00:00 AM] alice: hi"
        );
        assert_eq!(
            render_event(&at(12, 1, 0), "bob joined the chat room."),
            "[01/01/2024 -:- 12:01:00 PM] bob joined the chat room."
        );
    }

    #[test]
    fn test_render_collapses_newlines() {
        assert_eq!(
            render_message(&at(10, 0, 0), "alice", "line one\n  line two\r\n"),
            "[01/01/2024 -:- 10:00:00 AM] alice: line one line two"
        );
    }

    #[test]
    fn test_rendered_lines_parse_back() {
        let parser = LineParser::new();
        let rendered = render_message(&at(23, 59, 59), "bob", "late");
        let line = parser.parse_line(&rendered, 1);
        assert_eq!(line.timestamp(), Some(at(23, 59, 59)));
        assert_eq!(line.body(), "bob: late");
    }
}
