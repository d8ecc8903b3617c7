use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use super::line_index::LineIndex;
use super::run::{Run, RunKind, RunStyle};
use crate::models::SourceRange;

/// Render markdown into positioned runs, numbering source lines from 1.
pub fn render_markup(text: &str) -> Vec<Run> {
    render_markup_at(text, 1)
}

/// Render markdown whose first line is document line `first_line`.
///
/// Every non-blank text run whose characters can be matched back to the
/// source carries a [`SourceRange`]; block structure is emitted as
/// [`RunKind::Boundary`] runs. Raw HTML is dropped.
pub fn render_markup_at(text: &str, first_line: usize) -> Vec<Run> {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut renderer = MarkupRenderer::new(text, first_line.max(1));
    for (event, range) in Parser::new_ext(text, options).into_offset_iter() {
        renderer.process_event(event, range);
    }
    renderer.finish()
}

struct MarkupRenderer<'a> {
    source: &'a str,
    index: LineIndex<'a>,
    first_line: usize,
    runs: Vec<Run>,
    block: usize,
    emphasis_depth: usize,
    strong_depth: usize,
    heading: u8,
    /// Next number for each open list, `None` for bullet lists.
    list_stack: Vec<Option<u64>>,
}

impl<'a> MarkupRenderer<'a> {
    fn new(source: &'a str, first_line: usize) -> Self {
        Self {
            source,
            index: LineIndex::new(source),
            first_line,
            runs: Vec::new(),
            block: 0,
            emphasis_depth: 0,
            strong_depth: 0,
            heading: 0,
            list_stack: Vec::new(),
        }
    }

    fn process_event(&mut self, event: Event, range: Range<usize>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => self.heading = level as u8,
            Event::End(TagEnd::Heading(_)) => {
                self.heading = 0;
                self.end_block();
            }
            Event::Start(Tag::Emphasis) => self.emphasis_depth += 1,
            Event::End(TagEnd::Emphasis) => {
                self.emphasis_depth = self.emphasis_depth.saturating_sub(1)
            }
            Event::Start(Tag::Strong) => self.strong_depth += 1,
            Event::End(TagEnd::Strong) => self.strong_depth = self.strong_depth.saturating_sub(1),
            Event::Start(Tag::List(first_number)) => self.list_stack.push(first_number),
            Event::End(TagEnd::List(_)) => {
                self.list_stack.pop();
            }
            Event::Start(Tag::Item) => self.start_item(),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::BlockQuote(_)
                | TagEnd::TableHead
                | TagEnd::TableRow,
            ) => self.end_block(),
            Event::End(TagEnd::TableCell) => self.runs.push(Run::boundary(" | ", self.block)),
            Event::Text(text) => self.push_text(&text, range, false),
            Event::Code(code) => self.push_text(&code, range, true),
            Event::SoftBreak | Event::HardBreak => self.push_text("\n", range, false),
            Event::Rule => {
                self.runs.push(Run::boundary("----", self.block));
                self.end_block();
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.runs.push(Run::boundary(marker, self.block));
            }
            _ => {}
        }
    }

    fn start_item(&mut self) {
        let depth = self.list_stack.len().saturating_sub(1);
        let bullet = match self.list_stack.last_mut() {
            Some(Some(n)) => {
                let b = format!("{n}. ");
                *n += 1;
                b
            }
            _ => "- ".to_string(),
        };
        self.runs
            .push(Run::boundary(format!("{}{bullet}", "  ".repeat(depth)), self.block));
    }

    fn end_block(&mut self) {
        let already_broken = self
            .runs
            .last()
            .is_none_or(|r| r.kind == RunKind::Boundary && r.text == "\n");
        if !already_broken {
            self.runs.push(Run::boundary("\n", self.block));
        }
        self.block += 1;
    }

    fn push_text(&mut self, text: &str, range: Range<usize>, code: bool) {
        if text.is_empty() {
            return;
        }
        // Blank text is shown but never mapped back to the source.
        let source = if text.trim().is_empty() {
            None
        } else {
            self.locate(text, range)
        };
        let mut run = Run::text(text, source);
        run.block = self.block;
        run.style = RunStyle {
            emphasis: self.emphasis_depth > 0,
            strong: self.strong_depth > 0,
            code,
            heading: self.heading,
        };
        self.runs.push(run);
    }

    /// Find where `text` sits inside the event's byte range. Text that was
    /// transformed by the parser (entities, escapes) only maps when it still
    /// appears verbatim.
    fn locate(&self, text: &str, range: Range<usize>) -> Option<SourceRange> {
        let slice = self.source.get(range.clone())?;
        let start = if slice == text {
            range.start
        } else {
            range.start + slice.find(text)?
        };
        Some(SourceRange::new(
            self.index.position(start, self.first_line),
            self.index.position(start + text.len(), self.first_line),
        ))
    }

    fn finish(self) -> Vec<Run> {
        self.runs
    }
}
