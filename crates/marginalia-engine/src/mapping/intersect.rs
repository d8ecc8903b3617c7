use crate::models::AbsoluteRange;

/// Overlap of two ranges, or `None` if they share nothing.
///
/// On a line where a range begins or ends, that range's column bounds the
/// result (a missing column means the whole line); the tighter bound of the
/// two wins at each end. The result always has a start column; an end column
/// of `None` means "to the end of the line". `intersect(a, b) == intersect(b, a)`.
pub fn intersect(a: &AbsoluteRange, b: &AbsoluteRange) -> Option<AbsoluteRange> {
    if a.end_line < b.start_line || b.end_line < a.start_line {
        return None;
    }
    let start_line = a.start_line.max(b.start_line);
    let end_line = a.end_line.min(b.end_line);

    let start_bound = |r: &AbsoluteRange| {
        if r.start_line == start_line {
            r.start_column.unwrap_or(1)
        } else {
            1
        }
    };
    let end_bound = |r: &AbsoluteRange| {
        if r.end_line == end_line {
            r.end_column
        } else {
            None
        }
    };

    let start_column = start_bound(a).max(start_bound(b));
    let end_column = match (end_bound(a), end_bound(b)) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    };

    if start_line == end_line
        && let Some(end) = end_column
        && start_column > end
    {
        return None;
    }

    Some(AbsoluteRange {
        start_line,
        end_line,
        start_column: Some(start_column),
        end_column,
    })
}
