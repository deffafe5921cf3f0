//! Shelf DragDrop Utilities
//!
//! Framework-free drag-and-drop gesture tracking for shelf slots.
//! Uses movement threshold to distinguish click from drag, debounces duplicate
//! drop events fired by nested drop targets, and force-clears drags that never
//! receive an end event.
//!
//! All time inputs are passed in by the caller so the state machine can be
//! driven by any event loop (and by tests).

use std::time::{Duration, Instant};

/// Movement threshold in pixels to start dragging
pub const DRAG_THRESHOLD_PX: i32 = 5;
pub const DROP_DEBOUNCE: Duration = Duration::from_millis(300);
pub const SAFETY_TIMEOUT: Duration = Duration::from_secs(5);

/// Gesture phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragPhase<I> {
    Idle,
    /// Pointer pressed on an item but not moved far enough yet
    Pending { id: I, start_x: i32, start_y: i32 },
    Dragging { id: I, since: Instant },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DndConfig {
    pub drag_threshold_px: i32,
    pub drop_debounce: Duration,
    pub safety_timeout: Duration,
}

impl Default for DndConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: DRAG_THRESHOLD_PX,
            drop_debounce: DROP_DEBOUNCE,
            safety_timeout: SAFETY_TIMEOUT,
        }
    }
}

/// Result of a drop event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropOutcome<I> {
    /// Drop should be processed; carries the dragged id if a drag was active
    Accepted(Option<I>),
    /// Duplicate of a drop processed inside the debounce window
    Debounced,
}

/// DnD state for one pointer
#[derive(Clone, Debug)]
pub struct DndState<I, T> {
    phase: DragPhase<I>,
    drop_target: Option<T>,
    /// Last accepted drop of the current gesture; a new drag clears it
    last_drop: Option<Instant>,
    config: DndConfig,
}

impl<I: Copy + PartialEq, T: Copy> Default for DndState<I, T> {
    fn default() -> Self {
        Self::new(DndConfig::default())
    }
}

impl<I: Copy + PartialEq, T: Copy> DndState<I, T> {
    pub fn new(config: DndConfig) -> Self {
        Self {
            phase: DragPhase::Idle,
            drop_target: None,
            last_drop: None,
            config,
        }
    }

    pub fn config(&self) -> &DndConfig {
        &self.config
    }

    pub fn phase(&self) -> DragPhase<I> {
        self.phase
    }

    /// Item currently being dragged
    pub fn dragging(&self) -> Option<I> {
        match self.phase {
            DragPhase::Dragging { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn drop_target(&self) -> Option<T> {
        self.drop_target
    }

    /// Record a pending drag with its start position (mousedown)
    pub fn press(&mut self, id: I, x: i32, y: i32) {
        if self.dragging().is_none() {
            self.phase = DragPhase::Pending { id, start_x: x, start_y: y };
        }
    }

    /// Start dragging if the pointer moved past the threshold.
    /// Returns true when this call started the drag.
    pub fn pointer_move(&mut self, x: i32, y: i32, now: Instant) -> bool {
        if let DragPhase::Pending { id, start_x, start_y } = self.phase {
            let dx = (x - start_x).abs();
            let dy = (y - start_y).abs();
            if dx > self.config.drag_threshold_px || dy > self.config.drag_threshold_px {
                self.start(id, now);
                return true;
            }
        }
        false
    }

    /// Start dragging immediately (native dragstart)
    pub fn begin(&mut self, id: I, now: Instant) {
        self.start(id, now);
    }

    fn start(&mut self, id: I, now: Instant) {
        self.phase = DragPhase::Dragging { id, since: now };
        self.drop_target = None;
        self.last_drop = None;
    }

    /// Pointer entered a drop target while dragging
    pub fn hover(&mut self, target: T) {
        if self.dragging().is_some() {
            self.drop_target = Some(target);
        }
    }

    pub fn leave(&mut self) {
        if self.dragging().is_some() {
            self.drop_target = None;
        }
    }

    /// Handle a drop event. Repeats of the same gesture inside the debounce
    /// window are reported as duplicates; otherwise the dragged reference is
    /// cleared.
    pub fn drop(&mut self, now: Instant) -> DropOutcome<I> {
        if let Some(last) = self.last_drop {
            if now.saturating_duration_since(last) < self.config.drop_debounce {
                log::debug!("ignoring duplicate drop event");
                return DropOutcome::Debounced;
            }
        }
        self.last_drop = Some(now);
        let dragged = self.dragging();
        self.end_drag();
        DropOutcome::Accepted(dragged)
    }

    /// Mouse-up: returns the dragged id and hovered target if both exist.
    /// Always ends the gesture; a plain click yields `None`.
    pub fn release(&mut self, now: Instant) -> Option<(I, T)> {
        let target = self.drop_target;
        match (self.dragging(), target) {
            (Some(_), Some(target)) => match self.drop(now) {
                DropOutcome::Accepted(Some(dragged)) => Some((dragged, target)),
                _ => None,
            },
            _ => {
                self.end_drag();
                None
            }
        }
    }

    /// End drag operation; unconditionally clears all gesture state
    pub fn end_drag(&mut self) {
        self.phase = DragPhase::Idle;
        self.drop_target = None;
    }

    /// Gesture cancelled (escape, pointer left the window)
    pub fn cancel(&mut self) {
        self.end_drag();
    }

    /// Force-clear a drag that has outlived the safety timeout.
    /// Returns true if a drag was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        if let DragPhase::Dragging { since, .. } = self.phase {
            if now.saturating_duration_since(since) >= self.config.safety_timeout {
                log::warn!("drag gesture timed out without an end event");
                self.end_drag();
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type State = DndState<u32, (u32, usize)>;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_press_then_small_move_stays_pending() {
        let mut dnd = State::default();
        let t0 = Instant::now();
        dnd.press(7, 100, 100);

        assert!(!dnd.pointer_move(103, 104, t0));
        assert_eq!(dnd.dragging(), None);
        assert!(matches!(dnd.phase(), DragPhase::Pending { id: 7, .. }));
    }

    #[test]
    fn test_move_past_threshold_starts_drag() {
        let mut dnd = State::default();
        let t0 = Instant::now();
        dnd.press(7, 100, 100);

        assert!(dnd.pointer_move(100, 110, t0));
        assert_eq!(dnd.dragging(), Some(7));
        // Further movement does not restart
        assert!(!dnd.pointer_move(100, 130, t0));
    }

    #[test]
    fn test_hover_only_while_dragging() {
        let mut dnd = State::default();
        dnd.hover((1, 3));
        assert_eq!(dnd.drop_target(), None);

        dnd.begin(7, Instant::now());
        dnd.hover((1, 3));
        assert_eq!(dnd.drop_target(), Some((1, 3)));
        dnd.leave();
        assert_eq!(dnd.drop_target(), None);
    }

    #[test]
    fn test_drop_clears_dragged_reference() {
        let mut dnd = State::default();
        let t0 = Instant::now();
        dnd.begin(7, t0);

        assert_eq!(dnd.drop(t0 + ms(10)), DropOutcome::Accepted(Some(7)));
        assert_eq!(dnd.dragging(), None);
        assert_eq!(dnd.phase(), DragPhase::Idle);
    }

    #[test]
    fn test_duplicate_drop_is_debounced() {
        let mut dnd = State::default();
        let t0 = Instant::now();
        dnd.begin(7, t0);

        assert_eq!(dnd.drop(t0), DropOutcome::Accepted(Some(7)));
        assert_eq!(dnd.drop(t0 + ms(120)), DropOutcome::Debounced);
        assert_eq!(dnd.drop(t0 + ms(300)), DropOutcome::Accepted(None));
    }

    #[test]
    fn test_drop_without_drag_is_accepted_empty() {
        let mut dnd = State::default();
        assert_eq!(dnd.drop(Instant::now()), DropOutcome::Accepted(None));
    }

    #[test]
    fn test_release_returns_target() {
        let mut dnd = State::default();
        let t0 = Instant::now();
        dnd.press(7, 0, 0);
        dnd.pointer_move(20, 0, t0);
        dnd.hover((2, 5));

        assert_eq!(dnd.release(t0 + ms(5)), Some((7, (2, 5))));
        assert_eq!(dnd.dragging(), None);
        assert_eq!(dnd.drop_target(), None);
    }

    #[test]
    fn test_release_after_click_is_none() {
        let mut dnd = State::default();
        let t0 = Instant::now();
        dnd.press(7, 0, 0);

        assert_eq!(dnd.release(t0), None);
        assert_eq!(dnd.phase(), DragPhase::Idle);
    }

    #[test]
    fn test_new_gesture_inside_window_is_not_debounced() {
        let mut dnd = State::default();
        let t0 = Instant::now();
        dnd.begin(7, t0);
        assert_eq!(dnd.drop(t0), DropOutcome::Accepted(Some(7)));

        dnd.begin(8, t0 + ms(150));
        assert_eq!(dnd.drop(t0 + ms(250)), DropOutcome::Accepted(Some(8)));
        assert_eq!(dnd.dragging(), None);
        // the repeat of that second drop is still a duplicate
        assert_eq!(dnd.drop(t0 + ms(260)), DropOutcome::Debounced);

        // a threshold-started drag also opens a new gesture
        dnd.press(9, 0, 0);
        assert!(dnd.pointer_move(20, 0, t0 + ms(270)));
        assert_eq!(dnd.drop(t0 + ms(280)), DropOutcome::Accepted(Some(9)));
    }

    #[test]
    fn test_safety_timeout_force_clears() {
        let mut dnd = State::default();
        let t0 = Instant::now();
        dnd.begin(7, t0);

        assert!(!dnd.expire(t0 + Duration::from_secs(4)));
        assert_eq!(dnd.dragging(), Some(7));
        assert!(dnd.expire(t0 + Duration::from_secs(5)));
        assert_eq!(dnd.dragging(), None);
    }

    #[test]
    fn test_end_drag_is_unconditional() {
        let mut dnd = State::default();
        dnd.begin(7, Instant::now());
        dnd.hover((1, 1));

        dnd.end_drag();
        assert_eq!(dnd.dragging(), None);
        assert_eq!(dnd.drop_target(), None);
        // Safe to call when idle
        dnd.end_drag();

        dnd.press(3, 0, 0);
        dnd.cancel();
        assert_eq!(dnd.phase(), DragPhase::Idle);
    }
}
