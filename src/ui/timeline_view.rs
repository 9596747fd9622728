use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use roundplan::{
    board::BoardState,
    timeline::{
        format_clock, ratio_for_time, ruler_ticks, timeline_markers, TickKind, TimelineState,
    },
};

use super::board_view::marker_color;

/// Column of the ruler that shows `ratio` of the round
fn column_for(area: Rect, ratio: f64) -> u16 {
    let span = f64::from(area.width.saturating_sub(1));
    area.x + (ratio.clamp(0.0, 1.0) * span).round() as u16
}

/// Inverse of the ruler layout: which fraction of the round a column shows.
/// The caret's pixel-to-time mapping is this ratio times the round duration.
pub fn ratio_at_column(area: Rect, column: u16, row: u16) -> Option<f64> {
    if area.width == 0
        || column < area.x
        || column >= area.x + area.width
        || row < area.y
        || row >= area.y + area.height
    {
        return None;
    }
    if area.width == 1 {
        return Some(0.0);
    }
    Some(f64::from(column - area.x) / f64::from(area.width - 1))
}

/// Three rows: marker arrivals, the ruler, the caret with its clock
pub struct TimelineView<'a> {
    pub board: &'a BoardState,
    pub timeline: TimelineState,
}

impl Widget for TimelineView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 3 || area.width < 2 {
            return;
        }
        let round_duration = self.board.round_duration();
        let markers_row = area.y;
        let ruler_row = area.y + 1;
        let caret_row = area.y + 2;

        for (id, ratio) in timeline_markers(self.board) {
            let label = id.to_string();
            let col = column_for(area, ratio).min(area.x + area.width - label.len() as u16);
            buf.set_string(
                col,
                markers_row,
                label,
                Style::default()
                    .fg(marker_color(id))
                    .add_modifier(Modifier::BOLD),
            );
        }

        let ticks = ruler_ticks(round_duration);
        // minor first so that half and major ticks win shared columns
        for kind in [TickKind::Minor, TickKind::Half, TickKind::Major] {
            let (symbol, style) = match kind {
                TickKind::Minor => ("·", Style::default().fg(Color::DarkGray)),
                TickKind::Half => ("│", Style::default().fg(Color::Gray)),
                TickKind::Major => ("┃", Style::default().fg(Color::White)),
            };
            for tick in ticks.iter().filter(|t| t.kind == kind) {
                let col = column_for(area, ratio_for_time(tick.time, round_duration));
                buf.set_string(col, ruler_row, symbol, style);
            }
        }

        let caret_col = column_for(area, self.timeline.caret_pos);
        let clock = format_clock(round_duration - self.timeline.caret_time);
        let caret_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        buf.set_string(caret_col, caret_row, "▲", caret_style);

        let label_col = if caret_col + 2 + clock.len() as u16 <= area.x + area.width {
            caret_col + 2
        } else {
            caret_col.saturating_sub(clock.len() as u16 + 1).max(area.x)
        };
        buf.set_string(label_col, caret_row, clock, caret_style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundplan::board::{Action, BoardState, MAX_ROUND_DURATION};

    #[test]
    fn test_ratio_at_column() {
        let area = Rect::new(2, 10, 11, 3);
        assert_eq!(ratio_at_column(area, 2, 10), Some(0.0));
        assert_eq!(ratio_at_column(area, 7, 11), Some(0.5));
        assert_eq!(ratio_at_column(area, 12, 12), Some(1.0));
        assert_eq!(ratio_at_column(area, 13, 11), None);
        assert_eq!(ratio_at_column(area, 5, 9), None);
    }

    #[test]
    fn test_column_for_roundtrips_with_ratio() {
        let area = Rect::new(2, 0, 11, 3);
        for col in 2..13 {
            let ratio = ratio_at_column(area, col, 0).unwrap();
            assert_eq!(column_for(area, ratio), col);
        }
    }

    #[test]
    fn test_render_draws_caret_and_clock() {
        let board = BoardState::default().reduce(&Action::AddMarker { x: 1.0, y: 1.0 });
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);

        TimelineView {
            board: &board,
            timeline: TimelineState::default(),
        }
        .render(area, &mut buf);

        assert_eq!(buf[(0, 0)].symbol(), "1");
        assert_eq!(buf[(0, 1)].symbol(), "┃");
        assert_eq!(buf[(0, 2)].symbol(), "▲");
        let caret_line: String = (0..area.width)
            .map(|x| buf[(x, 2)].symbol().to_string())
            .collect();
        assert!(caret_line.contains("1:27"));
    }

    #[test]
    fn test_render_longest_round() {
        let board = BoardState::new(MAX_ROUND_DURATION).unwrap();
        let area = Rect::new(0, 0, 80, 3);
        let mut buf = Buffer::empty(area);

        TimelineView {
            board: &board,
            timeline: TimelineState::default(),
        }
        .render(area, &mut buf);

        assert_eq!(buf[(0, 1)].symbol(), "┃");
        assert_eq!(buf[(79, 1)].symbol(), "┃");
    }
}
