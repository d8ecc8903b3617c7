use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A 1-based `(line, column)` location in the whole logical document.
///
/// Ordering is lexicographic: line first, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A range in absolute document coordinates, as stored with an annotation.
///
/// Columns are optional: a missing start column means "from the start of the
/// line", a missing end column means "to the end of the line".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsoluteRange {
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_column: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<usize>,
}

impl AbsoluteRange {
    /// Build a validated range.
    pub fn new(
        start_line: usize,
        start_column: Option<usize>,
        end_line: usize,
        end_column: Option<usize>,
    ) -> Result<Self, EngineError> {
        let range = Self {
            start_line,
            end_line,
            start_column,
            end_column,
        };
        if range.is_valid() {
            Ok(range)
        } else {
            Err(EngineError::InvalidRange(range.to_string()))
        }
    }

    /// Whole-line range covering `start_line..=end_line`.
    pub fn lines(start_line: usize, end_line: usize) -> Result<Self, EngineError> {
        Self::new(start_line, None, end_line, None)
    }

    /// Range between two positions given in either order.
    pub fn between(a: Position, b: Position) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Self {
            start_line: start.line,
            end_line: end.line,
            start_column: Some(start.column),
            end_column: Some(end.column),
        }
    }

    pub fn is_valid(&self) -> bool {
        if self.start_line == 0 || self.start_line > self.end_line {
            return false;
        }
        if matches!(self.start_column, Some(0)) || matches!(self.end_column, Some(0)) {
            return false;
        }
        match (self.start_line == self.end_line, self.start_column, self.end_column) {
            (true, Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    /// First position covered by the range.
    pub fn start(&self) -> Position {
        Position::new(self.start_line, self.start_column.unwrap_or(1))
    }

    /// Whether `pos` falls inside the range, inclusive at both ends.
    pub fn contains(&self, pos: Position) -> bool {
        if pos < self.start() || pos.line > self.end_line {
            return false;
        }
        match self.end_column {
            Some(end) if pos.line == self.end_line => pos.column <= end,
            _ => true,
        }
    }

    pub fn overlaps_lines(&self, start_line: usize, end_line: usize) -> bool {
        !(self.end_line < start_line || end_line < self.start_line)
    }
}

impl fmt::Display for AbsoluteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let col = |c: Option<usize>| c.map_or_else(|| "*".to_string(), |c| c.to_string());
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line,
            col(self.start_column),
            self.end_line,
            col(self.end_column)
        )
    }
}

/// Fully specified source span attached to rendered markup, written as
/// `startLine:startCol-endLine:endCol`. The end column is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

static SOURCE_POS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+):(\d+)-(\d+):(\d+)").expect("static pattern"));

impl SourceRange {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Lenient parse: finds the first `l:c-l:c` group anywhere in `s`.
    /// Returns `None` for anything malformed instead of failing.
    pub fn parse(s: &str) -> Option<Self> {
        let caps = SOURCE_POS.captures(s)?;
        let num = |i: usize| caps.get(i)?.as_str().parse::<usize>().ok();
        let range = Self {
            start: Position::new(num(1)?, num(2)?),
            end: Position::new(num(3)?, num(4)?),
        };
        if range.start.line == 0 || range.start.column == 0 || range.end < range.start {
            log::warn!("Ignoring malformed source position {s:?}");
            return None;
        }
        Some(range)
    }
}

impl FromStr for SourceRange {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| EngineError::InvalidRange(s.to_string()))
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl From<SourceRange> for AbsoluteRange {
    fn from(sr: SourceRange) -> Self {
        Self {
            start_line: sr.start.line,
            end_line: sr.end.line,
            start_column: Some(sr.start.column),
            end_column: Some(sr.end.column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn positions_order_lexicographically() {
        assert!(Position::new(1, 9) < Position::new(2, 1));
        assert!(Position::new(3, 2) < Position::new(3, 5));
        assert_eq!(Position::new(4, 4), Position::new(4, 4));
    }

    #[rstest]
    #[case(1, Some(1), 1, Some(1), true)]
    #[case(1, Some(5), 1, Some(2), false)]
    #[case(2, Some(5), 3, Some(2), true)]
    #[case(3, None, 2, None, false)]
    #[case(0, None, 2, None, false)]
    #[case(1, Some(0), 1, Some(2), false)]
    fn validation(
        #[case] sl: usize,
        #[case] sc: Option<usize>,
        #[case] el: usize,
        #[case] ec: Option<usize>,
        #[case] ok: bool,
    ) {
        assert_eq!(AbsoluteRange::new(sl, sc, el, ec).is_ok(), ok);
    }

    #[test]
    fn between_orders_reversed_endpoints() {
        let r = AbsoluteRange::between(Position::new(7, 3), Position::new(2, 9));
        assert_eq!(r.start_line, 2);
        assert_eq!(r.start_column, Some(9));
        assert_eq!(r.end_line, 7);
        assert_eq!(r.end_column, Some(3));
        assert!(r.is_valid());
    }

    #[test]
    fn contains_is_inclusive_and_open_end_covers_line() {
        let r = AbsoluteRange::new(2, Some(4), 3, Some(6)).unwrap();
        assert!(r.contains(Position::new(2, 4)));
        assert!(r.contains(Position::new(3, 6)));
        assert!(!r.contains(Position::new(2, 3)));
        assert!(!r.contains(Position::new(3, 7)));

        let open = AbsoluteRange::lines(5, 5).unwrap();
        assert!(open.contains(Position::new(5, 1)));
        assert!(open.contains(Position::new(5, 400)));
        assert!(!open.contains(Position::new(6, 1)));
    }

    #[test]
    fn source_range_parses_and_displays() {
        let sr = SourceRange::parse("10:1-10:20").unwrap();
        assert_eq!(sr.start, Position::new(10, 1));
        assert_eq!(sr.end, Position::new(10, 20));
        assert_eq!(sr.to_string(), "10:1-10:20");
        assert_eq!("3:2-4:1".parse::<SourceRange>().unwrap().end, Position::new(4, 1));
    }

    #[rstest]
    #[case("")]
    #[case("10:1")]
    #[case("a:b-c:d")]
    #[case("5:3-4:1")]
    #[case("0:1-1:1")]
    fn malformed_source_range_is_none(#[case] input: &str) {
        assert!(SourceRange::parse(input).is_none());
    }

    #[test]
    fn absolute_range_serializes_camel_case_without_missing_columns() {
        let r = AbsoluteRange::lines(3, 4).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"startLine":3,"endLine":4}"#);
    }
}
