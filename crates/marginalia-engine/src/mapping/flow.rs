use std::str::Chars;

use crate::models::Position;

/// Walks a run's text one character at a time while tracking the source
/// `(line, column)` each character starts at.
///
/// A `\n` moves to column 1 of the next line; every other character moves
/// one column right.
#[derive(Clone)]
pub struct PositionCursor<'a> {
    /// Source position of the first character.
    pub base: Position,
    chars: Chars<'a>,
    at: Position,
    consumed: usize,
}

impl<'a> PositionCursor<'a> {
    pub fn new(s: &'a str, base: Position) -> Self {
        Self {
            base,
            chars: s.chars(),
            at: base,
            consumed: 0,
        }
    }

    /// Source position of the next character.
    pub fn pos(&self) -> Position {
        self.at
    }

    /// Characters consumed so far.
    pub fn offset(&self) -> usize {
        self.consumed
    }

    pub fn eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    pub fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.at.line += 1;
            self.at.column = 1;
        } else {
            self.at.column += 1;
        }
        self.consumed += 1;
        Some(ch)
    }

    /// Advance until the cursor sits at or past `target`, or runs out.
    pub fn advance_to(&mut self, target: Position) {
        while self.at < target && self.bump().is_some() {}
    }
}

/// Character offset inside `text` (which starts at source position `origin`)
/// of `target`. Targets at or before `origin` map to 0; targets beyond the
/// text map to its length.
pub fn position_to_offset(text: &str, origin: Position, target: Position) -> usize {
    if target <= origin {
        return 0;
    }
    let mut cursor = PositionCursor::new(text, origin);
    cursor.advance_to(target);
    cursor.offset()
}

/// Source position reached after walking `substring` from `origin`.
pub fn offset_to_position(origin: Position, substring: &str) -> Position {
    let mut cursor = PositionCursor::new(substring, origin);
    while cursor.bump().is_some() {}
    cursor.pos()
}

/// The first `chars` characters of `text`.
pub fn char_prefix(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// Characters `start..end` of `text`, clamped to its length.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let from = char_prefix(text, start).len();
    let to = char_prefix(text, end.max(start)).len();
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn cursor_tracks_lines_and_columns() {
        let mut cur = PositionCursor::new("ab\nc", Position::new(3, 7));
        assert_eq!(cur.peek(), Some('a'));
        cur.bump();
        cur.bump();
        assert_eq!(cur.pos(), Position::new(3, 9));
        cur.bump();
        assert_eq!(cur.pos(), Position::new(4, 1));
        cur.bump();
        assert!(cur.eof());
        assert_eq!(cur.bump(), None);
        assert_eq!(cur.offset(), 4);
    }

    #[rstest]
    #[case(Position::new(10, 1), 0)]
    #[case(Position::new(9, 40), 0)]
    #[case(Position::new(10, 5), 4)]
    #[case(Position::new(10, 12), 11)]
    #[case(Position::new(10, 99), 15)]
    fn offsets_on_one_line(#[case] target: Position, #[case] expected: usize) {
        assert_eq!(
            position_to_offset("function foo(x)", Position::new(10, 1), target),
            expected
        );
    }

    #[test]
    fn offsets_across_line_breaks() {
        let text = "ab\ncd\nef";
        let origin = Position::new(1, 3);
        assert_eq!(position_to_offset(text, origin, Position::new(2, 1)), 3);
        assert_eq!(position_to_offset(text, origin, Position::new(2, 2)), 4);
        assert_eq!(position_to_offset(text, origin, Position::new(3, 2)), 7);
        assert_eq!(offset_to_position(origin, "ab\nc"), Position::new(2, 2));
    }

    #[test]
    fn round_trip_for_every_reachable_position() {
        let text = "héllo\n\nwörld\n";
        let origin = Position::new(42, 5);
        for k in 0..=text.chars().count() {
            let pos = offset_to_position(origin, char_prefix(text, k));
            assert_eq!(position_to_offset(text, origin, pos), k, "offset {k}");
        }
    }

    #[test]
    fn char_slicing_respects_multibyte() {
        assert_eq!(char_prefix("wörld", 2), "wö");
        assert_eq!(char_slice("wörld", 1, 3), "ör");
        assert_eq!(char_slice("wörld", 3, 99), "ld");
        assert_eq!(char_slice("abc", 2, 1), "");
    }
}
