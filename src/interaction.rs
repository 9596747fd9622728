use crate::board::{Action, BoardState, MarkerId};
use crate::geometry::{distance_to_segment, Point};

/// Pointer input in map coordinates, whatever device produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Click(Point),
    Move(Point),
    Press(Point),
    Release(Point),
    Erase(Point),
    Cancel,
}

/// What sits under the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Marker(MarkerId),
    /// End point of a path segment
    Vertex { marker: MarkerId, path_idx: usize },
    /// Body of a path segment
    Segment { marker: MarkerId, path_idx: usize },
}

/// Find the closest thing under `p`. Vertices win over markers, markers over
/// segment bodies.
pub fn hit_test(board: &BoardState, p: Point, radius: f64) -> Option<Hit> {
    let nearest = |candidates: Vec<(f64, Hit)>| {
        candidates
            .into_iter()
            .filter(|(d, _)| *d <= radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, hit)| hit)
    };

    let vertices = board
        .markers()
        .flat_map(|m| {
            m.paths.iter().enumerate().map(move |(path_idx, s)| {
                (
                    p.distance_to(s.end()),
                    Hit::Vertex {
                        marker: m.id,
                        path_idx,
                    },
                )
            })
        })
        .collect();
    if let Some(hit) = nearest(vertices) {
        return Some(hit);
    }

    let markers = board
        .markers()
        .map(|m| (p.distance_to(m.anchor()), Hit::Marker(m.id)))
        .collect();
    if let Some(hit) = nearest(markers) {
        return Some(hit);
    }

    let segments = board
        .markers()
        .flat_map(|m| {
            m.paths.iter().enumerate().map(move |(path_idx, s)| {
                (
                    distance_to_segment(p, s.start(), s.end()),
                    Hit::Segment {
                        marker: m.id,
                        path_idx,
                    },
                )
            })
        })
        .collect();
    nearest(segments)
}

/// Pointer state of the board view. Exactly one of these holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    /// A preview line follows the pointer from this marker's path end
    Drawing { marker: MarkerId },
    DraggingMarker { marker: MarkerId, moved: bool },
    DraggingVertex {
        marker: MarkerId,
        path_idx: usize,
        moved: bool,
    },
    /// A drag just ended; the click that follows the release is swallowed
    JustDropped,
}

impl Interaction {
    pub fn active_marker(&self) -> Option<MarkerId> {
        match *self {
            Interaction::Drawing { marker }
            | Interaction::DraggingMarker { marker, .. }
            | Interaction::DraggingVertex { marker, .. } => Some(marker),
            Interaction::Idle | Interaction::JustDropped => None,
        }
    }

    fn has_moved(&self) -> bool {
        match *self {
            Interaction::DraggingMarker { moved, .. }
            | Interaction::DraggingVertex { moved, .. } => moved,
            _ => false,
        }
    }

    fn mark_moved(mut self) -> Interaction {
        match &mut self {
            Interaction::DraggingMarker { moved, .. }
            | Interaction::DraggingVertex { moved, .. } => *moved = true,
            _ => {}
        }
        self
    }

    /// The edit that puts whatever is being dragged at `p`
    fn drag_to(&self, p: Point) -> Vec<Action> {
        match *self {
            Interaction::DraggingMarker { marker, .. } => vec![Action::UpdateMarker {
                id: marker,
                x: p.x,
                y: p.y,
            }],
            Interaction::DraggingVertex {
                marker, path_idx, ..
            } => vec![Action::UpdatePath {
                marker_id: marker,
                path_idx,
                x: p.x,
                y: p.y,
            }],
            _ => vec![],
        }
    }

    /// Advance the state machine, returning the actions to dispatch in order
    pub fn handle(
        self,
        board: &BoardState,
        event: PointerEvent,
        radius: f64,
    ) -> (Interaction, Vec<Action>) {
        use Interaction::*;
        use PointerEvent::*;

        // the marker we were working on may have been removed meanwhile
        let current = match self.active_marker() {
            Some(id) if board.marker(id).is_none() => Idle,
            _ => self,
        };

        match (current, event) {
            (_, Cancel) => {
                let actions = if board.preview_line().is_some() {
                    vec![Action::ResetPreviewLine]
                } else {
                    vec![]
                };
                (Idle, actions)
            }

            (Idle, Click(p)) => match hit_test(board, p, radius) {
                Some(Hit::Marker(marker)) => (
                    Drawing { marker },
                    vec![Action::SetPreviewLine { marker_id: marker }],
                ),
                Some(_) => (Idle, vec![]),
                None => (Idle, vec![Action::AddMarker { x: p.x, y: p.y }]),
            },
            (Idle, Press(p)) => match hit_test(board, p, radius) {
                Some(Hit::Vertex { marker, path_idx }) => (
                    DraggingVertex {
                        marker,
                        path_idx,
                        moved: false,
                    },
                    vec![],
                ),
                Some(Hit::Marker(marker)) => (
                    DraggingMarker {
                        marker,
                        moved: false,
                    },
                    vec![],
                ),
                Some(Hit::Segment { marker, path_idx }) => (
                    DraggingVertex {
                        marker,
                        path_idx,
                        moved: true,
                    },
                    vec![Action::AddIntermediatePath {
                        marker_id: marker,
                        path_idx,
                        x: p.x,
                        y: p.y,
                    }],
                ),
                None => (Idle, vec![]),
            },
            (Idle, Erase(p)) => match hit_test(board, p, radius) {
                Some(Hit::Vertex { marker, path_idx }) => (
                    Idle,
                    vec![Action::RemovePath {
                        marker_id: marker,
                        path_idx,
                    }],
                ),
                Some(Hit::Marker(marker)) => {
                    (Idle, vec![Action::RemoveMarker { marker_id: marker }])
                }
                _ => (Idle, vec![]),
            },
            (Idle, Move(_)) | (Idle, Release(_)) => (Idle, vec![]),

            (Drawing { .. }, Move(p)) => {
                (current, vec![Action::UpdatePreviewLine { x: p.x, y: p.y }])
            }
            (Drawing { marker }, Click(p)) => match hit_test(board, p, radius) {
                Some(Hit::Marker(hit)) if hit == marker => (Idle, vec![Action::ResetPreviewLine]),
                _ => (
                    current,
                    vec![
                        Action::UpdatePreviewLine { x: p.x, y: p.y },
                        Action::AddPath { marker_id: marker },
                        Action::SetPreviewLine { marker_id: marker },
                    ],
                ),
            },
            (Drawing { marker }, Erase(p)) => match hit_test(board, p, radius) {
                Some(Hit::Vertex {
                    marker: hit,
                    path_idx,
                }) if hit == marker => (
                    current,
                    vec![
                        Action::RemovePath {
                            marker_id: marker,
                            path_idx,
                        },
                        Action::SetPreviewLine { marker_id: marker },
                        Action::UpdatePreviewLine { x: p.x, y: p.y },
                    ],
                ),
                Some(Hit::Marker(hit)) if hit == marker => (
                    Idle,
                    vec![
                        Action::ResetPreviewLine,
                        Action::RemoveMarker { marker_id: marker },
                    ],
                ),
                _ => (current, vec![]),
            },
            (Drawing { .. }, Press(_)) | (Drawing { .. }, Release(_)) => (current, vec![]),

            (DraggingMarker { .. }, Move(p)) | (DraggingVertex { .. }, Move(p)) => {
                (current.mark_moved(), current.drag_to(p))
            }
            (DraggingMarker { .. }, Release(p)) | (DraggingVertex { .. }, Release(p)) => {
                if current.has_moved() {
                    (JustDropped, current.drag_to(p))
                } else {
                    (Idle, vec![])
                }
            }
            (DraggingMarker { .. }, _) | (DraggingVertex { .. }, _) => (current, vec![]),

            (JustDropped, Click(_)) => (Idle, vec![]),
            (JustDropped, other) => Idle.handle(board, other, radius),
        }
    }
}
