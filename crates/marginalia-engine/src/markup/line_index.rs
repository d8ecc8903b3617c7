use crate::models::Position;

/// Byte offset to `(line, column)` lookup over a source string. Columns count
/// characters, starting at 1.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    /// Position of the character starting at byte `offset`, shifted so the
    /// text's first line is `first_line`.
    pub fn position(&self, offset: usize, first_line: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line];
        let column = self.text[start..offset].chars().count() + 1;
        Position::new(line + first_line, column)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_count_characters() {
        let idx = LineIndex::new("héllo\nwörld\n");
        assert_eq!(idx.position(0, 1), Position::new(1, 1));
        assert_eq!(idx.position(3, 1), Position::new(1, 3));
        assert_eq!(idx.position(7, 1), Position::new(2, 1));
        assert_eq!(idx.position(7, 40), Position::new(41, 1));
        assert_eq!(idx.position(13, 1), Position::new(2, 6));
        assert_eq!(idx.position(14, 1), Position::new(3, 1));
        assert_eq!(idx.line_count(), 3);
    }
}
