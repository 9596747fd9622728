use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols,
    text::Span,
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Widget,
    },
};

use roundplan::{
    board::{BoardState, MarkerId},
    geometry::Point,
    interaction::Interaction,
    timeline::positions_at,
};

const PALETTE: [Color; 10] = [
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
    Color::Green,
    Color::LightRed,
    Color::LightBlue,
    Color::LightYellow,
    Color::LightMagenta,
    Color::LightGreen,
    Color::White,
];

pub fn marker_color(id: MarkerId) -> Color {
    PALETTE[(id.0 as usize).saturating_sub(1) % PALETTE.len()]
}

/// Map the terminal cell under the mouse to map coordinates.
/// `area` is the region the canvas was drawn into.
pub fn cell_to_map(area: Rect, map_size: (f64, f64), column: u16, row: u16) -> Option<Point> {
    if area.width == 0
        || area.height == 0
        || column < area.x
        || row < area.y
        || column >= area.x + area.width
        || row >= area.y + area.height
    {
        return None;
    }

    let (map_w, map_h) = map_size;
    let x = (f64::from(column - area.x) + 0.5) / f64::from(area.width) * map_w;
    let y = (f64::from(row - area.y) + 0.5) / f64::from(area.height) * map_h;
    Some(Point::new(x, y))
}

/// The tactical map: committed paths, the preview line, markers, the cursor
/// and, when the caret is off zero, where everyone stands at that instant.
pub struct BoardView<'a> {
    pub board: &'a BoardState,
    pub interaction: Interaction,
    pub cursor: Point,
    pub caret_time: f64,
    pub map_size: (f64, f64),
}

impl Widget for BoardView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (map_w, map_h) = self.map_size;
        // terminal rows grow downwards like map y, canvas y grows upwards
        let flip = |y: f64| map_h - y;
        let active = self.interaction.active_marker();
        let board = self.board;
        let cursor = self.cursor;
        let ghosts = if self.caret_time > 0.0 {
            positions_at(board, self.caret_time)
        } else {
            vec![]
        };

        Canvas::default()
            .marker(symbols::Marker::Braille)
            .x_bounds([0.0, map_w])
            .y_bounds([0.0, map_h])
            .paint(|ctx| {
                for marker in board.markers() {
                    let color = marker_color(marker.id);
                    for segment in &marker.paths {
                        ctx.draw(&CanvasLine::new(
                            segment.x1,
                            flip(segment.y1),
                            segment.x2,
                            flip(segment.y2),
                            color,
                        ));
                    }
                }
                if let Some(line) = board.preview_line() {
                    ctx.draw(&CanvasLine::new(
                        line.x1,
                        flip(line.y1),
                        line.x2,
                        flip(line.y2),
                        Color::DarkGray,
                    ));
                }

                ctx.layer();

                for marker in board.markers() {
                    let color = marker_color(marker.id);
                    for segment in &marker.paths {
                        ctx.print(
                            segment.x2,
                            flip(segment.y2),
                            Span::styled("•", Style::default().fg(color)),
                        );
                    }

                    let mut style = Style::default()
                        .fg(Color::Black)
                        .bg(color)
                        .add_modifier(Modifier::BOLD);
                    if active == Some(marker.id) {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    ctx.print(
                        marker.x,
                        flip(marker.y),
                        Span::styled(marker.id.to_string(), style),
                    );
                }

                for (id, pos) in &ghosts {
                    ctx.print(
                        pos.x,
                        flip(pos.y),
                        Span::styled(
                            "◆",
                            Style::default()
                                .fg(marker_color(*id))
                                .add_modifier(Modifier::BOLD),
                        ),
                    );
                }

                ctx.print(
                    cursor.x,
                    flip(cursor.y),
                    Span::styled("+", Style::default().fg(Color::White)),
                );
            })
            .render(area, buf);
    }
}
