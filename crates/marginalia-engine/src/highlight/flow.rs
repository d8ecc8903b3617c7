use crate::mapping::{char_prefix, char_slice, intersect, offset_to_position, position_to_offset};
use crate::markup::Run;
use crate::models::{AnnotationId, Mark, Position, Rect, SourceRange};

/// Split runs so every annotated stretch of text becomes its own run.
///
/// Overlapping annotations partition a run at every boundary; each piece
/// carries the ids of all annotations covering it. Runs without a source
/// range pass through untouched, and the input is never modified.
pub fn apply_marks(runs: &[Run], marks: &[Mark]) -> Vec<Run> {
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        match run.source {
            Some(source) if run.is_text_wrapper() && !marks.is_empty() => {
                split_run(run, source, marks, &mut out)
            }
            _ => out.push(run.clone()),
        }
    }
    out
}

/// Character interval `[start, end)` of a run covered by one annotation.
struct Covered {
    start: usize,
    end: usize,
    id: AnnotationId,
}

fn split_run(run: &Run, source: SourceRange, marks: &[Mark], out: &mut Vec<Run>) {
    let run_range = source.into();
    let covered: Vec<Covered> = marks
        .iter()
        .filter_map(|mark| {
            let overlap = intersect(&run_range, &mark.range)?;
            let end = Position::new(overlap.end_line, overlap.end_column.unwrap_or(usize::MAX));
            let start = position_to_offset(&run.text, source.start, overlap.start());
            let end = position_to_offset(&run.text, source.start, end);
            (start < end).then_some(Covered {
                start,
                end,
                id: mark.id,
            })
        })
        .collect();
    if covered.is_empty() {
        out.push(run.clone());
        return;
    }

    let len = run.text.chars().count();
    let mut cuts: Vec<usize> = vec![0, len];
    for c in &covered {
        cuts.push(c.start);
        cuts.push(c.end);
    }
    cuts.sort_unstable();
    cuts.dedup();

    for pair in cuts.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let start = offset_to_position(source.start, char_prefix(&run.text, from));
        let end = if to == len {
            source.end
        } else {
            offset_to_position(source.start, char_prefix(&run.text, to))
        };
        let mut piece = run.clone();
        piece.text = char_slice(&run.text, from, to).to_string();
        piece.source = Some(SourceRange::new(start, end));
        for c in covered.iter().filter(|c| c.start <= from && to <= c.end) {
            if !piece.marks.contains(&c.id) {
                piece.marks.push(c.id);
            }
        }
        out.push(piece);
    }
}

/// Bounding rectangle of every laid-out run carrying `id`.
///
/// The left edge is `base_left` when given, otherwise the left of the
/// top-most (then left-most) piece. Width and height are at least 1.
pub fn mark_rect<'a>(
    placed: impl IntoIterator<Item = (&'a Run, Rect)>,
    id: AnnotationId,
    base_left: Option<f64>,
) -> Option<Rect> {
    let mut first: Option<Rect> = None;
    let mut top = f64::INFINITY;
    let mut right = f64::NEG_INFINITY;
    let mut bottom = f64::NEG_INFINITY;
    for (run, rect) in placed {
        if !run.marks.contains(&id) {
            continue;
        }
        top = top.min(rect.top());
        right = right.max(rect.right());
        bottom = bottom.max(rect.bottom());
        let earlier = first.is_none_or(|f| {
            rect.top() < f.top() || (rect.top() == f.top() && rect.left() < f.left())
        });
        if earlier {
            first = Some(rect);
        }
    }
    let first = first?;
    let left = base_left.unwrap_or(first.left());
    Some(Rect::new(
        left,
        top,
        (right - left).max(1.0),
        (bottom - top).max(1.0),
    ))
}
