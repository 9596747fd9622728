use crate::board::{BoardState, Marker, MarkerId, MAX_ROUND_DURATION};
use crate::geometry::{interpolate, Point};

/// Caret position on the round timeline.
///
/// `caret_pos` is the fraction of the ruler left of the caret, `caret_time`
/// the elapsed round seconds it selects.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimelineState {
    pub caret_pos: f64,
    pub caret_time: f64,
    pub playing: bool,
}

impl TimelineState {
    pub fn update_caret(&self, pos: f64, time: f64) -> TimelineState {
        TimelineState {
            caret_pos: pos,
            caret_time: time,
            ..*self
        }
    }

    /// Move the caret to a fraction of the ruler
    pub fn seek_ratio(&self, ratio: f64, round_duration: f64) -> TimelineState {
        let time = time_at_ratio(ratio, round_duration);
        self.update_caret(ratio_for_time(time, round_duration), time)
    }

    /// Move the caret by `delta` seconds, staying inside the round
    pub fn nudge(&self, delta: f64, round_duration: f64) -> TimelineState {
        let time = (self.caret_time + delta).clamp(0.0, round_duration);
        self.update_caret(ratio_for_time(time, round_duration), time)
    }

    pub fn toggle_playback(&self, round_duration: f64) -> TimelineState {
        if self.playing {
            return TimelineState {
                playing: false,
                ..*self
            };
        }
        // replay from the start once the end was reached
        let from = if self.caret_time >= round_duration {
            self.update_caret(0.0, 0.0)
        } else {
            *self
        };
        TimelineState {
            playing: true,
            ..from
        }
    }

    /// Advance a running playback by `dt` wall-clock seconds
    pub fn tick(&self, dt: f64, speed: f64, round_duration: f64) -> TimelineState {
        if !self.playing {
            return *self;
        }
        let next = self.nudge(dt * speed, round_duration);
        TimelineState {
            playing: next.caret_time < round_duration,
            ..next
        }
    }
}

pub fn time_at_ratio(ratio: f64, round_duration: f64) -> f64 {
    ratio.clamp(0.0, 1.0) * round_duration
}

pub fn ratio_for_time(time: f64, round_duration: f64) -> f64 {
    if round_duration <= 0.0 {
        return 0.0;
    }
    (time / round_duration).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    Major,
    Half,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub time: f64,
    pub kind: TickKind,
}

/// One tick per second: major every 10s, half every 5s. Nothing past
/// [`MAX_ROUND_DURATION`] gets a tick.
pub fn ruler_ticks(round_duration: f64) -> Vec<Tick> {
    let last = round_duration.clamp(0.0, MAX_ROUND_DURATION).floor() as u32;
    (0..=last)
        .map(|s| Tick {
            time: s as f64,
            kind: match s {
                s if s % 10 == 0 => TickKind::Major,
                s if s % 5 == 0 => TickKind::Half,
                _ => TickKind::Minor,
            },
        })
        .collect()
}

/// Where `marker` stands after walking for `elapsed` seconds
pub fn marker_position_at(marker: &Marker, elapsed: f64) -> Point {
    let mut prev_time = 0.0;
    for segment in &marker.paths {
        if elapsed <= segment.time {
            let span = segment.time - prev_time;
            let progress = if span > 0.0 {
                (elapsed - prev_time) / span
            } else {
                1.0
            };
            return interpolate(segment.start(), segment.end(), progress);
        }
        prev_time = segment.time;
    }
    marker.path_end()
}

/// Every marker's position at the given elapsed time, in id order
pub fn positions_at(board: &BoardState, elapsed: f64) -> Vec<(MarkerId, Point)> {
    board
        .markers()
        .map(|m| (m.id, marker_position_at(m, elapsed)))
        .collect()
}

/// Where each marker's arrival sits on the ruler, as a fraction of the round
pub fn timeline_markers(board: &BoardState) -> Vec<(MarkerId, f64)> {
    board
        .markers()
        .map(|m| (m.id, ratio_for_time(m.elapsed(), board.round_duration())))
        .collect()
}

/// Round clock label, e.g. `1:27`
pub fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
