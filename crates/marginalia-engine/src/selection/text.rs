use crate::mapping::char_slice;
use crate::models::AbsoluteRange;
use crate::paging::DocumentWindow;

/// Text covered by `range` in a whole document.
///
/// The end column is exclusive; a missing start column means column 1 and a
/// missing end column means the rest of the line. Lines outside the content
/// are skipped.
pub fn extract_text(content: &str, range: &AbsoluteRange) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    collect(range, |line| {
        lines
            .get(line.checked_sub(1)?)
            .map(|s| s.trim_end_matches('\r').to_string())
    })
}

/// Text covered by `range` among the window's materialized lines.
pub fn window_text(window: &DocumentWindow, range: &AbsoluteRange) -> String {
    collect(range, |line| window.line(line).map(|l| l.into_owned()))
}

fn collect(range: &AbsoluteRange, line_at: impl Fn(usize) -> Option<String>) -> String {
    let mut parts = Vec::new();
    for line in range.start_line..=range.end_line {
        let Some(text) = line_at(line) else {
            continue;
        };
        let from = match range.start_column {
            Some(col) if line == range.start_line => col - 1,
            _ => 0,
        };
        let to = match range.end_column {
            Some(col) if line == range.end_line => col - 1,
            _ => usize::MAX,
        };
        parts.push(char_slice(&text, from, to).to_string());
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileChunk;
    use pretty_assertions::assert_eq;

    const DOC: &str = "fn main() {\n    println!(\"hi\");\n}";

    #[test]
    fn single_line_columns() {
        let range = AbsoluteRange::new(2, Some(5), 2, Some(13)).unwrap();
        assert_eq!(extract_text(DOC, &range), "println!");
    }

    #[test]
    fn spans_lines_with_open_ends() {
        let range = AbsoluteRange::new(1, Some(4), 3, None).unwrap();
        assert_eq!(extract_text(DOC, &range), "main() {\n    println!(\"hi\");\n}");
        let whole = AbsoluteRange::lines(3, 9).unwrap();
        assert_eq!(extract_text(DOC, &whole), "}");
    }

    #[test]
    fn window_lines_use_absolute_numbers() {
        let window = DocumentWindow::from_chunk(FileChunk {
            path: "w.rs".into(),
            language: "rust".into(),
            size: 0,
            total_lines: 60,
            start_line: 50,
            end_line: 51,
            content: "alpha beta\ngamma".into(),
            truncated: false,
        });
        let range = AbsoluteRange::new(50, Some(7), 51, Some(3)).unwrap();
        assert_eq!(window_text(&window, &range), "beta\nga");
    }
}
