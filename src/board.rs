use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::geometry::{segment_duration, Point};

/// Markers allowed on the board at once
pub const MAX_MARKERS: usize = 10;

pub const DEFAULT_ROUND_DURATION: f64 = 87.0;

/// Longest round the board accepts, in seconds
pub const MAX_ROUND_DURATION: f64 = 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub u32);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A straight line between two map points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Line {
    /// Zero-length line anchored at `p`
    pub fn at(p: Point) -> Self {
        Self {
            x1: p.x,
            y1: p.y,
            x2: p.x,
            y2: p.y,
        }
    }

    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    pub fn duration(&self) -> f64 {
        segment_duration(self.x1, self.y1, self.x2, self.y2)
    }
}

/// One leg of a marker's movement.
///
/// `time` is the cumulative number of seconds walked when the leg's end point
/// is reached, so it grows with the segment index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub time: f64,
}

impl PathSegment {
    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    pub fn line(&self) -> Line {
        Line {
            x1: self.x1,
            y1: self.y1,
            x2: self.x2,
            y2: self.y2,
        }
    }

    /// Walking cost derived from the segment geometry
    pub fn duration(&self) -> f64 {
        segment_duration(self.x1, self.y1, self.x2, self.y2)
    }

    fn set_start(&mut self, p: Point) {
        self.x1 = p.x;
        self.y1 = p.y;
    }

    fn set_end(&mut self, p: Point) {
        self.x2 = p.x;
        self.y2 = p.y;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub x: f64,
    pub y: f64,
    /// Seconds left on the round clock once every committed segment is walked
    pub time: f64,
    pub paths: Vec<PathSegment>,
}

impl Marker {
    pub fn new(id: MarkerId, x: f64, y: f64, round_duration: f64) -> Self {
        Self {
            id,
            x,
            y,
            time: round_duration,
            paths: vec![],
        }
    }

    pub fn anchor(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Where the next segment starts: last segment end, or the anchor
    pub fn path_end(&self) -> Point {
        self.paths
            .last()
            .map(PathSegment::end)
            .unwrap_or_else(|| self.anchor())
    }

    /// Seconds spent walking all committed segments
    pub fn elapsed(&self) -> f64 {
        self.paths.last().map_or(0.0, |p| p.time)
    }

    /// Start point of segment `idx`
    fn start_of(&self, idx: usize) -> Point {
        match idx.checked_sub(1).and_then(|prev| self.paths.get(prev)) {
            Some(prev) => prev.end(),
            None => self.anchor(),
        }
    }

    /// Cumulative time at the start of segment `idx`
    fn time_before(&self, idx: usize) -> f64 {
        idx.checked_sub(1)
            .and_then(|prev| self.paths.get(prev))
            .map_or(0.0, |p| p.time)
    }

    fn sync_time(&mut self, round_duration: f64) {
        self.time = round_duration - self.elapsed();
    }

    fn check_timing(&self, round_duration: f64) -> Result<(), Rejection> {
        let in_round = |t: f64| (0.0..=round_duration).contains(&t);
        let consistent = in_round(self.time)
            && self.paths.iter().all(|p| in_round(p.time))
            && self
                .paths
                .iter()
                .tuple_windows()
                .all(|(a, b)| a.time <= b.time)
            && self.time == round_duration - self.elapsed();

        if consistent {
            Ok(())
        } else {
            Err(Rejection::OutOfRound { marker: self.id })
        }
    }
}

/// Why an action left the board untouched
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Rejection {
    #[error("marker cap of {} reached", MAX_MARKERS)]
    MarkerCapReached,
    #[error("unknown marker {0}")]
    UnknownMarker(MarkerId),
    #[error("marker {marker} has no path segment {path_idx}")]
    PathIndexOutOfRange { marker: MarkerId, path_idx: usize },
    #[error("no preview line is active")]
    NoPreviewLine,
    #[error("marker {marker} needs {needed}s but only {remaining}s remain")]
    ExceedsRound {
        marker: MarkerId,
        needed: f64,
        remaining: f64,
    },
    #[error("marker {marker} timing would leave the round")]
    OutOfRound { marker: MarkerId },
    #[error("no marker ids left")]
    IdsExhausted,
}

impl Rejection {
    /// The action named a marker or segment that no longer exists
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            Rejection::UnknownMarker(_) | Rejection::PathIndexOutOfRange { .. }
        )
    }

    /// The action ran into the marker cap or the round length
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            Rejection::MarkerCapReached
                | Rejection::IdsExhausted
                | Rejection::ExceedsRound { .. }
                | Rejection::OutOfRound { .. }
        )
    }

    pub(crate) fn log(&self, action: &Action) {
        if self.is_stale() {
            warn!(action = %action, rejection = %self, "ignoring action");
        } else {
            debug!(action = %action, rejection = %self, "action rejected");
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoardError {
    #[error("round duration must be a positive number of seconds, got {0}")]
    InvalidRoundDuration(f64),
    #[error("round duration {0} is longer than the {}s limit", MAX_ROUND_DURATION)]
    RoundTooLong(f64),
    #[error("marker {0} has inconsistent path timing")]
    InconsistentMarker(MarkerId),
    #[error("marker {0} appears more than once")]
    DuplicateMarker(MarkerId),
    #[error("at most {} markers are allowed", MAX_MARKERS)]
    TooManyMarkers,
}

/// Everything the board reducer understands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, strum_macros::Display)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    AddMarker {
        x: f64,
        y: f64,
    },
    UpdateMarker {
        id: MarkerId,
        x: f64,
        y: f64,
    },
    AddPath {
        marker_id: MarkerId,
    },
    AddIntermediatePath {
        marker_id: MarkerId,
        path_idx: usize,
        x: f64,
        y: f64,
    },
    UpdatePath {
        marker_id: MarkerId,
        path_idx: usize,
        x: f64,
        y: f64,
    },
    RemovePath {
        marker_id: MarkerId,
        path_idx: usize,
    },
    RemoveMarker {
        marker_id: MarkerId,
    },
    SetPreviewLine {
        marker_id: MarkerId,
    },
    UpdatePreviewLine {
        x: f64,
        y: f64,
    },
    ResetPreviewLine,
}

/// Immutable snapshot of the tactics board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardState {
    round_duration: f64,
    round_time: f64,
    markers: BTreeMap<MarkerId, Marker>,
    preview_line: Option<Line>,
    next_id: u32,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::empty(DEFAULT_ROUND_DURATION)
    }
}

impl BoardState {
    pub fn new(round_duration: f64) -> Result<Self, BoardError> {
        if !round_duration.is_finite() || round_duration <= 0.0 {
            return Err(BoardError::InvalidRoundDuration(round_duration));
        }
        if round_duration > MAX_ROUND_DURATION {
            return Err(BoardError::RoundTooLong(round_duration));
        }
        Ok(Self::empty(round_duration))
    }

    /// Build a board around already planned markers
    pub fn with_markers(
        round_duration: f64,
        markers: impl IntoIterator<Item = Marker>,
    ) -> Result<Self, BoardError> {
        let mut state = Self::new(round_duration)?;
        for marker in markers {
            if marker.check_timing(round_duration).is_err() {
                return Err(BoardError::InconsistentMarker(marker.id));
            }
            if state.markers.contains_key(&marker.id) {
                return Err(BoardError::DuplicateMarker(marker.id));
            }
            state.next_id = state.next_id.max(marker.id.0.saturating_add(1));
            state.markers.insert(marker.id, marker);
        }
        if state.markers.len() > MAX_MARKERS {
            return Err(BoardError::TooManyMarkers);
        }
        state.refresh_round_time();
        Ok(state)
    }

    fn empty(round_duration: f64) -> Self {
        Self {
            round_duration,
            round_time: round_duration,
            markers: BTreeMap::new(),
            preview_line: None,
            next_id: 1,
        }
    }

    pub fn round_duration(&self) -> f64 {
        self.round_duration
    }

    pub fn round_time(&self) -> f64 {
        self.round_time
    }

    /// Markers in id order
    pub fn markers(&self) -> impl Iterator<Item = &Marker> + '_ {
        self.markers.values()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn preview_line(&self) -> Option<&Line> {
        self.preview_line.as_ref()
    }

    /// The marker that has used the most seconds, lowest id on ties
    pub fn most_forward(&self) -> Option<&Marker> {
        self.markers
            .values()
            .min_by(|a, b| a.time.total_cmp(&b.time))
    }

    /// Apply `action`, returning the next snapshot. Rejected actions return an
    /// unchanged copy; `self` is never modified.
    pub fn reduce(&self, action: &Action) -> BoardState {
        match self.apply(action) {
            Ok(next) => next,
            Err(rejection) => {
                rejection.log(action);
                self.clone()
            }
        }
    }

    /// Like [`BoardState::reduce`] but reports why an action was rejected
    pub fn apply(&self, action: &Action) -> Result<BoardState, Rejection> {
        let mut next = self.clone();
        match *action {
            Action::AddMarker { x, y } => next.add_marker(x, y)?,
            Action::UpdateMarker { id, x, y } => next.update_marker(id, x, y)?,
            Action::AddPath { marker_id } => next.add_path(marker_id)?,
            Action::AddIntermediatePath {
                marker_id,
                path_idx,
                x,
                y,
            } => next.add_intermediate_path(marker_id, path_idx, Point::new(x, y))?,
            Action::UpdatePath {
                marker_id,
                path_idx,
                x,
                y,
            } => next.update_path(marker_id, path_idx, Point::new(x, y))?,
            Action::RemovePath {
                marker_id,
                path_idx,
            } => next.remove_path(marker_id, path_idx)?,
            Action::RemoveMarker { marker_id } => next.remove_marker(marker_id)?,
            Action::SetPreviewLine { marker_id } => next.set_preview_line(marker_id)?,
            Action::UpdatePreviewLine { x, y } => next.update_preview_line(x, y)?,
            Action::ResetPreviewLine => next.preview_line = None,
        }
        Ok(next)
    }

    fn marker_mut(&mut self, id: MarkerId) -> Result<&mut Marker, Rejection> {
        self.markers
            .get_mut(&id)
            .ok_or(Rejection::UnknownMarker(id))
    }

    fn refresh_round_time(&mut self) {
        self.round_time = self
            .markers
            .values()
            .map(|m| m.time)
            .fold(self.round_duration, f64::min);
    }

    fn add_marker(&mut self, x: f64, y: f64) -> Result<(), Rejection> {
        if self.markers.len() >= MAX_MARKERS {
            return Err(Rejection::MarkerCapReached);
        }

        let id = MarkerId(self.next_id);
        self.next_id = self.next_id.checked_add(1).ok_or(Rejection::IdsExhausted)?;
        self.markers
            .insert(id, Marker::new(id, x, y, self.round_duration));
        Ok(())
    }

    fn update_marker(&mut self, id: MarkerId, x: f64, y: f64) -> Result<(), Rejection> {
        let round_duration = self.round_duration;
        let marker = self.marker_mut(id)?;
        marker.x = x;
        marker.y = y;

        if let Some(first) = marker.paths.first_mut() {
            let old_duration = first.duration();
            first.set_start(Point::new(x, y));
            let duration_diff = old_duration - first.duration();

            for segment in marker.paths.iter_mut() {
                segment.time -= duration_diff;
            }
            marker.time += duration_diff;
            marker.check_timing(round_duration)?;
        }

        self.refresh_round_time();
        Ok(())
    }

    fn add_path(&mut self, id: MarkerId) -> Result<(), Rejection> {
        let preview = self.preview_line.ok_or(Rejection::NoPreviewLine)?;
        let round_duration = self.round_duration;
        let marker = self.marker_mut(id)?;

        let start = marker.path_end();
        let duration = segment_duration(start.x, start.y, preview.x2, preview.y2);
        let remaining = marker.time - duration;
        if remaining < 0.0 {
            return Err(Rejection::ExceedsRound {
                marker: id,
                needed: duration,
                remaining: marker.time,
            });
        }

        marker.time = remaining;
        marker.paths.push(PathSegment {
            x1: start.x,
            y1: start.y,
            x2: preview.x2,
            y2: preview.y2,
            time: round_duration - remaining,
        });
        self.round_time = self.round_time.min(remaining);
        Ok(())
    }

    fn add_intermediate_path(
        &mut self,
        id: MarkerId,
        path_idx: usize,
        waypoint: Point,
    ) -> Result<(), Rejection> {
        let round_duration = self.round_duration;
        let marker = self.marker_mut(id)?;
        let segment = *marker
            .paths
            .get(path_idx)
            .ok_or(Rejection::PathIndexOutOfRange {
                marker: id,
                path_idx,
            })?;

        let mut head = segment;
        head.set_end(waypoint);
        // the split never pushes the waypoint past the original arrival time
        head.time = (marker.time_before(path_idx) + head.duration()).min(segment.time);

        let tail = PathSegment {
            x1: waypoint.x,
            y1: waypoint.y,
            x2: segment.x2,
            y2: segment.y2,
            time: segment.time,
        };

        marker.paths[path_idx] = head;
        marker.paths.insert(path_idx + 1, tail);
        marker.check_timing(round_duration)
    }

    fn update_path(&mut self, id: MarkerId, path_idx: usize, to: Point) -> Result<(), Rejection> {
        let round_duration = self.round_duration;
        let marker = self.marker_mut(id)?;
        if path_idx >= marker.paths.len() {
            return Err(Rejection::PathIndexOutOfRange {
                marker: id,
                path_idx,
            });
        }

        let start = marker.start_of(path_idx);
        let prev_time = marker.time_before(path_idx);

        let segment = &mut marker.paths[path_idx];
        segment.set_start(start);
        segment.set_end(to);
        segment.time = prev_time + segment.duration();
        let new_time = segment.time;

        if let Some(next) = marker.paths.get_mut(path_idx + 1) {
            let old_next_time = next.time;
            next.set_start(to);
            next.time = new_time + next.duration();
            let shift = next.time - old_next_time;

            for later in marker.paths.iter_mut().skip(path_idx + 2) {
                later.time += shift;
            }
        }

        marker.sync_time(round_duration);
        marker.check_timing(round_duration)?;
        self.refresh_round_time();
        Ok(())
    }

    fn remove_path(&mut self, id: MarkerId, path_idx: usize) -> Result<(), Rejection> {
        let round_duration = self.round_duration;
        let marker = self.marker_mut(id)?;
        if path_idx >= marker.paths.len() {
            return Err(Rejection::PathIndexOutOfRange {
                marker: id,
                path_idx,
            });
        }

        marker.paths.remove(path_idx);

        if path_idx < marker.paths.len() {
            let start = marker.start_of(path_idx);
            let prev_time = marker.time_before(path_idx);

            let reattached = &mut marker.paths[path_idx];
            let old_time = reattached.time;
            reattached.set_start(start);
            reattached.time = prev_time + reattached.duration();
            let shift = reattached.time - old_time;

            for later in marker.paths.iter_mut().skip(path_idx + 1) {
                later.time += shift;
            }
        }

        marker.sync_time(round_duration);
        marker.check_timing(round_duration)?;
        self.refresh_round_time();
        Ok(())
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<(), Rejection> {
        self.markers
            .remove(&id)
            .ok_or(Rejection::UnknownMarker(id))?;
        self.refresh_round_time();
        Ok(())
    }

    fn set_preview_line(&mut self, id: MarkerId) -> Result<(), Rejection> {
        let end = self
            .marker(id)
            .ok_or(Rejection::UnknownMarker(id))?
            .path_end();
        self.preview_line = Some(Line::at(end));
        Ok(())
    }

    fn update_preview_line(&mut self, x: f64, y: f64) -> Result<(), Rejection> {
        let line = self.preview_line.as_mut().ok_or(Rejection::NoPreviewLine)?;
        line.x2 = x;
        line.y2 = y;
        Ok(())
    }
}
