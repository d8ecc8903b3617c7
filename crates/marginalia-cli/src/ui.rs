use marginalia_config::Theme;
use marginalia_engine::mapping::{GridMapper, char_slice};
use marginalia_engine::markup::{Run, RunKind};
use marginalia_engine::{
    AnnotationStore, EditorState, FrameInput, PanelVisibility, Point, Position, Rect, Renderer,
    Size,
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, Focus, ViewArea};
use crate::geometry::{FlowMeasure, GridMeasure};

const PANEL_WIDTH: u16 = 48;
const PANEL_HEIGHT: u16 = 6;

fn mark_style(theme: Theme) -> Style {
    match theme {
        Theme::Dark => Style::default().bg(Color::Rgb(90, 70, 0)),
        Theme::Light | Theme::System => Style::default().bg(Color::Yellow).fg(Color::Black),
    }
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)].as_ref())
        .split(rows[0]);

    draw_files(f, app, columns[0]);
    draw_document(f, app, columns[1]);
    draw_panel(f, app);
    draw_help(f, app, rows[1]);
}

fn focused_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn draw_files(f: &mut Frame, app: &mut App, area: ratatui::layout::Rect) {
    let items: Vec<ListItem> = app
        .entries
        .iter()
        .map(|entry| {
            let icon = match (entry.is_dir, app.prefs.is_expanded(&entry.path)) {
                (true, true) => "📂",
                (true, false) => "📁",
                (false, _) => "📄",
            };
            let indent = "  ".repeat(entry.depth);
            ListItem::new(Line::from(vec![Span::raw(format!(
                "{indent}{icon} {}",
                entry.name()
            ))]))
        })
        .collect();
    let title = format!("Files ({})", app.root.display());
    let list = List::new(items)
        .block(focused_block(title, app.focus == Focus::Files))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(list, area, &mut app.file_list_state);
}

fn draw_document(f: &mut Frame, app: &mut App, area: ratatui::layout::Rect) {
    let document = app.session.document();
    let title = match (document.path(), document.window()) {
        (_, Some(window)) => format!(
            "{} [{}] lines {}-{} of {}",
            window.path(),
            window.language(),
            window.start_line(),
            window.end_line(),
            window.total_lines()
        ),
        (Some(path), None) => format!("{path}"),
        (None, None) => "Document".to_string(),
    };
    let block = focused_block(title, matches!(app.focus, Focus::Document | Focus::Comment));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = if let Some(reason) = document.blocked() {
        vec![Line::from(Span::styled(
            format!("Cannot preview: {reason}"),
            Style::default().fg(Color::Red),
        ))]
    } else {
        match app.renderer() {
            Renderer::Grid => grid_lines(app, inner),
            Renderer::Flowed => {
                app.view = ViewArea {
                    x: inner.x,
                    y: inner.y,
                    width: inner.width,
                    height: inner.height,
                    gutter: 0,
                };
                flow_lines(app)
            }
        }
    };
    if lines.is_empty() && app.session.document().window().is_none() {
        f.render_widget(Paragraph::new("Select a file to view its content"), inner);
        return;
    }

    let mut paragraph = Paragraph::new(lines);
    if app.prefs.prefs().wrap {
        paragraph = paragraph.wrap(Wrap { trim: false });
    }
    f.render_widget(paragraph, inner);
}

fn grid_lines(app: &mut App, inner: ratatui::layout::Rect) -> Vec<Line<'static>> {
    let Some(window) = app.session.document().window() else {
        return Vec::new();
    };
    let number_width = window.end_line().to_string().len();
    let gutter = number_width as u16 + 1;
    app.view = ViewArea {
        x: inner.x,
        y: inner.y,
        width: inner.width,
        height: inner.height,
        gutter,
    };

    let decorations = app.session.decorations();
    let mapper = GridMapper::for_window(window);
    // Local [start, end) of the keyboard or mouse selection
    let selection = app.grid_selection().filter(|s| !s.is_empty()).map(|s| {
        if s.anchor <= s.active {
            (s.anchor, s.active)
        } else {
            (s.active, s.anchor)
        }
    });
    let mark = mark_style(app.prefs.prefs().theme);
    let show_cursor = app.focus == Focus::Document;

    let first = app.scroll + 1;
    let last = (app.scroll + inner.height as usize).min(window.line_count());
    let mut lines = Vec::new();
    for local in first..=last {
        let absolute = mapper.local_to_absolute(local);
        let text = window.line(absolute).unwrap_or_default();
        let max_col = text.chars().count() + 1;
        let painted: Vec<(usize, usize)> = decorations
            .on_line(local)
            .filter_map(|d| d.columns_on(local, max_col))
            .collect();

        let mut spans = vec![Span::styled(
            format!("{absolute:>number_width$} "),
            Style::default().fg(Color::DarkGray),
        )];
        let cells = text.chars().chain(std::iter::once(' '));
        for (i, ch) in cells.enumerate() {
            let column = i + 1;
            let mut style = Style::default();
            if painted.iter().any(|&(from, to)| column >= from && column < to) {
                style = mark;
            }
            let here = Position::new(local, column);
            if selection.is_some_and(|(start, end)| here >= start && here < end) {
                style = style.add_modifier(Modifier::REVERSED);
            }
            if show_cursor && app.cursor == here {
                style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
            }
            spans.push(Span::styled(ch.to_string(), style));
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn run_style(run: &Run, mark: Style) -> Style {
    let mut style = Style::default();
    if run.kind == RunKind::Boundary {
        return style.fg(Color::DarkGray);
    }
    if run.style.strong || run.style.heading > 0 {
        style = style.add_modifier(Modifier::BOLD);
    }
    if run.style.emphasis {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if run.style.code {
        style = style.fg(Color::Cyan);
    }
    if run.style.heading > 0 {
        style = style.fg(Color::LightBlue);
    }
    if run.is_marked() {
        style = style.patch(mark);
    }
    style
}

fn flow_lines(app: &App) -> Vec<Line<'static>> {
    let mark = mark_style(app.prefs.prefs().theme);
    let last = (app.scroll + app.view.height as usize).min(app.flow.rows);
    (app.scroll..last)
        .map(|row| {
            let spans: Vec<Span> = app
                .flow
                .segments_on(row)
                .map(|seg| {
                    let run = &app.flow.runs[seg.run];
                    let text = char_slice(&run.text, seg.char_start, seg.char_start + seg.len);
                    Span::styled(text.to_string(), run_style(run, mark))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn draw_panel(f: &mut Frame, app: &mut App) {
    if !app.session.editor().is_open() {
        return;
    }
    let view = app.view;
    let origin = Point::new(f64::from(view.x + view.gutter), f64::from(view.y));
    let panel = Size::new(
        f64::from(PANEL_WIDTH.min(view.width.saturating_sub(2)).max(10)),
        f64::from(PANEL_HEIGHT),
    );
    let boundary = Rect::new(
        f64::from(view.x),
        f64::from(view.y),
        f64::from(view.width),
        f64::from(view.height),
    );
    let scroll = Point::new(0.0, app.scroll as f64);

    let visibility = match app.renderer() {
        Renderer::Grid => {
            let decorations = app.session.decorations();
            let Some(mapper) = app.session.document().window().map(GridMapper::for_window) else {
                return;
            };
            let measure = GridMeasure {
                mapper,
                decorations: &decorations,
                origin,
                scroll: app.scroll,
                view_rows: view.height as usize,
            };
            app.session.frame(&FrameInput {
                measure: &measure,
                scroll,
                panel,
                boundary,
            })
        }
        Renderer::Flowed => {
            let measure = FlowMeasure {
                layout: &app.flow,
                origin,
                scroll: app.scroll,
                view_rows: view.height as usize,
            };
            app.session.frame(&FrameInput {
                measure: &measure,
                scroll,
                panel,
                boundary,
            })
        }
    };
    let PanelVisibility::Visible(position) = visibility else {
        return;
    };

    let area = f.area();
    let x = (position.x.max(0.0) as u16).min(area.width.saturating_sub(1));
    let y = (position.y.max(0.0) as u16).min(area.height.saturating_sub(1));
    let rect = ratatui::layout::Rect::new(
        x,
        y,
        (panel.width as u16).min(area.width - x),
        (panel.height as u16).min(area.height - y),
    );

    let quoted = match app.session.editor() {
        EditorState::Drafting { selected_text, .. } => selected_text.clone(),
        EditorState::Editing { annotation_id } => app
            .session
            .store()
            .get(*annotation_id)
            .map(|a| a.selected_text.clone())
            .unwrap_or_default(),
        EditorState::Closed => String::new(),
    };
    let quoted: String = quoted.lines().next().unwrap_or_default().chars().take(40).collect();
    let content = vec![
        Line::from(Span::styled(
            format!("\u{201c}{quoted}\u{201d}"),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(format!("{}▏", app.comment)),
    ];
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(content)
            .wrap(Wrap { trim: false })
            .block(focused_block(app.editor_title().to_string(), true)),
        rect,
    );
}

fn draw_help(f: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let help = match app.focus {
        Focus::Files => "q: Quit | ↑/k ↓/j: Move | Enter: Open | ←/h →/l: Fold | Tab: Document",
        Focus::Document => {
            "q: Quit | Arrows: Move | Shift+Arrows: Select | a: Annotate | Enter: Open note | n/p: Next/Prev | m: Markup | w: Wrap | t: Theme"
        }
        Focus::Comment => "Type your comment | Enter: Save | Esc: Cancel",
    };
    let lines = vec![
        Line::from(Span::raw(help)),
        Line::from(Span::styled(
            app.status.clone(),
            Style::default().fg(Color::Yellow),
        )),
    ];
    f.render_widget(Paragraph::new(lines), area);
}
