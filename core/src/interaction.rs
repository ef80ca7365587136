//! Pointer handling: press, drag to scrub, release to click.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Selects the message under the pointer; dragging with it scrubs the ticker.
    Primary,
    /// Asks the host to open the attachment under the pointer.
    Secondary,
}

/// Pointer input in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Down { x: i32, button: PointerButton },
    Move { x: i32 },
    Up { x: i32, button: PointerButton },
}

/// What the engine should do in response to a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DragAction {
    Ignore,
    /// The press left the dead zone: pause the clock and scroll by `delta`.
    Begin { delta: i32 },
    Scroll { delta: i32 },
    /// Release after dragging: scroll the remaining `delta`, then resume.
    End { delta: i32 },
    Click { x: i32, button: PointerButton },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragState {
    Idle,
    Pressed { anchor: i32, button: PointerButton },
    Dragging { last_x: i32 },
}

#[derive(Debug)]
pub(crate) struct DragTracker {
    state: DragState,
    dead_zone: i32,
}

impl DragTracker {
    pub(crate) fn new(dead_zone: i32) -> Self {
        Self {
            state: DragState::Idle,
            dead_zone: dead_zone.max(0),
        }
    }

    pub(crate) fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Dragging moves content with the pointer, so a pointer moving left scrolls left.
    pub(crate) fn handle(&mut self, event: PointerEvent) -> DragAction {
        match (self.state, event) {
            (DragState::Dragging { last_x }, PointerEvent::Down { x, button }) => {
                self.state = DragState::Pressed { anchor: x, button };
                DragAction::End { delta: last_x - x }
            }
            (_, PointerEvent::Down { x, button }) => {
                self.state = DragState::Pressed { anchor: x, button };
                DragAction::Ignore
            }
            (DragState::Pressed { anchor, button }, PointerEvent::Move { x }) => {
                if button != PointerButton::Primary || (x - anchor).abs() <= self.dead_zone {
                    return DragAction::Ignore;
                }
                self.state = DragState::Dragging { last_x: x };
                DragAction::Begin { delta: anchor - x }
            }
            (DragState::Dragging { last_x }, PointerEvent::Move { x }) => {
                self.state = DragState::Dragging { last_x: x };
                DragAction::Scroll { delta: last_x - x }
            }
            (DragState::Idle, PointerEvent::Move { .. }) => DragAction::Ignore,
            (DragState::Pressed { button, .. }, PointerEvent::Up { x, .. }) => {
                self.state = DragState::Idle;
                DragAction::Click { x, button }
            }
            (DragState::Dragging { last_x }, PointerEvent::Up { x, .. }) => {
                self.state = DragState::Idle;
                DragAction::End { delta: last_x - x }
            }
            (DragState::Idle, PointerEvent::Up { .. }) => DragAction::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn release_inside_dead_zone_is_a_click() {
        let mut tracker = DragTracker::new(5);
        let button = PointerButton::Primary;
        assert_eq!(
            tracker.handle(PointerEvent::Down { x: 40, button }),
            DragAction::Ignore
        );
        assert_eq!(tracker.handle(PointerEvent::Move { x: 44 }), DragAction::Ignore);
        assert_eq!(
            tracker.handle(PointerEvent::Up { x: 44, button }),
            DragAction::Click { x: 44, button }
        );
        assert!(!tracker.is_dragging());
    }

    #[test]
    fn drag_reports_deltas_from_the_anchor() {
        let mut tracker = DragTracker::new(5);
        let button = PointerButton::Primary;
        tracker.handle(PointerEvent::Down { x: 100, button });

        assert_eq!(
            tracker.handle(PointerEvent::Move { x: 70 }),
            DragAction::Begin { delta: 30 }
        );
        assert!(tracker.is_dragging());
        assert_eq!(
            tracker.handle(PointerEvent::Move { x: 80 }),
            DragAction::Scroll { delta: -10 }
        );
        assert_eq!(
            tracker.handle(PointerEvent::Up { x: 80, button }),
            DragAction::End { delta: 0 }
        );
        assert!(!tracker.is_dragging());
    }

    #[test]
    fn secondary_button_never_drags() {
        let mut tracker = DragTracker::new(2);
        let button = PointerButton::Secondary;
        tracker.handle(PointerEvent::Down { x: 10, button });
        assert_eq!(tracker.handle(PointerEvent::Move { x: 50 }), DragAction::Ignore);
        assert_eq!(
            tracker.handle(PointerEvent::Up { x: 50, button }),
            DragAction::Click { x: 50, button }
        );
    }

    #[test]
    fn stray_moves_and_releases_are_ignored() {
        let mut tracker = DragTracker::new(2);
        assert_eq!(tracker.handle(PointerEvent::Move { x: 3 }), DragAction::Ignore);
        assert_eq!(
            tracker.handle(PointerEvent::Up {
                x: 3,
                button: PointerButton::Primary
            }),
            DragAction::Ignore
        );
    }
}
