pub mod board_view;
pub mod screen;
pub mod timeline_view;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use roundplan::{board::MAX_MARKERS, interaction::Interaction, timeline::format_clock};

use crate::{
    ui::{board_view::BoardView, timeline_view::TimelineView},
    App,
};

const TIMELINE_HEIGHT: u16 = 5;
const STATUS_HEIGHT: u16 = 1;

const HELP_TEXT: &[(&str, &str)] = &[
    ("arrows", "move cursor (shift: faster)"),
    ("enter/space", "place marker / select marker / commit segment"),
    ("g", "grab and drop a marker or waypoint"),
    ("x/del", "delete waypoint or marker under cursor"),
    ("esc", "stop drawing"),
    ("[ ]", "scrub timeline by 1s"),
    ("{ }", "scrub timeline by 5s"),
    ("home/end", "timeline start / end"),
    ("p", "play / pause the round"),
    ("?", "this help"),
    ("q", "quit"),
];

/// Split the screen into map, timeline and status rows
pub fn plan_layout(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(TIMELINE_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

pub fn render_plan(app: &mut App, f: &mut Frame) {
    let (board_chunk, timeline_chunk, status_chunk) = plan_layout(f.area());

    let board_block = Block::default()
        .borders(Borders::ALL)
        .title(" Map ")
        .title_alignment(Alignment::Left);
    let board_inner = board_block.inner(board_chunk);
    f.render_widget(board_block, board_chunk);

    let timeline_block = Block::default().borders(Borders::ALL).title(format!(
        " Round {} ",
        format_clock(app.store.state().round_duration())
    ));
    let timeline_inner = timeline_block.inner(timeline_chunk);
    f.render_widget(timeline_block, timeline_chunk);

    // remembered for mouse hit mapping
    app.board_area = board_inner;
    app.timeline_area = timeline_inner;

    f.render_widget(
        BoardView {
            board: app.store.state(),
            interaction: app.interaction,
            cursor: app.cursor,
            caret_time: app.timeline.caret_time,
            map_size: app.map_size(),
        },
        board_inner,
    );
    f.render_widget(
        TimelineView {
            board: app.store.state(),
            timeline: app.timeline,
        },
        timeline_inner,
    );
    f.render_widget(Paragraph::new(status_line(app)), status_chunk);
}

fn status_line(app: &App) -> Line<'static> {
    let board = app.store.state();
    let dim = Style::default().add_modifier(Modifier::DIM);
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let mode = match app.interaction {
        Interaction::Idle | Interaction::JustDropped => "idle".to_string(),
        Interaction::Drawing { marker } => format!("drawing #{marker}"),
        Interaction::DraggingMarker { marker, .. } => format!("moving #{marker}"),
        Interaction::DraggingVertex {
            marker, path_idx, ..
        } => format!("moving #{marker} waypoint {}", path_idx + 1),
    };

    let forward = board
        .most_forward()
        .filter(|m| !m.paths.is_empty())
        .map(|m| format!(" (#{} furthest)", m.id))
        .unwrap_or_default();

    let mut spans = vec![
        Span::styled(" plan ", dim),
        Span::styled(format_clock(board.round_time()), bold),
        Span::raw(forward),
        Span::styled("  markers ", dim),
        Span::raw(format!("{}/{}", board.marker_count(), MAX_MARKERS)),
        Span::styled("  mode ", dim),
        Span::raw(mode),
        Span::styled("  caret ", dim),
        Span::raw(format_clock(board.round_duration() - app.timeline.caret_time)),
    ];
    if app.timeline.playing {
        spans.push(Span::styled(" ▶", Style::default().fg(Color::Green)));
    }
    if let Some(status) = &app.status {
        spans.push(Span::styled(format!("  {status}"), Style::default().fg(Color::Red)));
    }
    spans.push(Span::styled("  ? help", dim));
    Line::from(spans)
}

pub fn render_help(f: &mut Frame) {
    let area = centered(f.area(), 60, HELP_TEXT.len() as u16 + 2);
    let lines: Vec<Line> = HELP_TEXT
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(
                    format!("{keys:>12}  "),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*what),
            ])
        })
        .collect();

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" Keys "))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
