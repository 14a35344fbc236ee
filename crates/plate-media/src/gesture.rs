use std::rc::Rc;

use crate::input::{InputSurface, ListenerGuard, ListenerKind, OwnerId, PointerEvent};

/// One continuous resize interaction, from pointer-down to pointer-up.
#[derive(Debug)]
pub struct DragSession {
    anchor: f32,
    baseline: u32,
    value: u32,
    live: bool,
    listeners: Option<ListenerGuard>,
}

impl DragSession {
    pub fn anchor(&self) -> f32 {
        self.anchor
    }

    pub fn baseline(&self) -> u32 {
        self.baseline
    }

    /// The last value produced by the session.
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

/// Drives a clamped horizontal value (a width) from pointer movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureTracker {
    floor: u32,
}

impl GestureTracker {
    pub fn new(floor: u32) -> Self {
        Self { floor }
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }

    pub fn clamp(&self, value: u32) -> u32 {
        value.max(self.floor)
    }

    /// Starts a session anchored at the origin event. Move and end listeners
    /// are attached to the whole surface so the drag survives the pointer
    /// leaving the element. Returns `None` for events without a coordinate.
    pub fn begin(
        &self,
        origin: &PointerEvent,
        baseline: u32,
        owner: OwnerId,
        surface: Rc<dyn InputSurface>,
    ) -> Option<DragSession> {
        let anchor = origin.x()?;
        let listeners =
            ListenerGuard::acquire(surface, owner, &[ListenerKind::Move, ListenerKind::End]);
        tracing::debug!(?owner, anchor, baseline, "drag began");
        Some(DragSession {
            anchor,
            baseline,
            value: baseline,
            live: true,
            listeners: Some(listeners),
        })
    }

    /// `max(floor, baseline + (x - anchor))`. Ignored for finished sessions
    /// and for events without a coordinate.
    pub fn on_move(&self, session: &mut DragSession, event: &PointerEvent) -> Option<u32> {
        if !session.live {
            return None;
        }
        let x = event.x()?;
        let raw = f64::from(session.baseline) + f64::from(x - session.anchor);
        let value = if raw <= f64::from(self.floor) {
            self.floor
        } else {
            raw.round().min(f64::from(u32::MAX)) as u32
        };
        session.value = value;
        tracing::trace!(value, "drag moved");
        Some(value)
    }

    /// Finishes the session and releases its listeners. Returns false when
    /// the session had already ended.
    pub fn end(&self, session: &mut DragSession) -> bool {
        if !session.live {
            return false;
        }
        session.live = false;
        if let Some(mut listeners) = session.listeners.take() {
            listeners.release();
        }
        tracing::debug!(value = session.value, "drag ended");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointerSurface;

    #[test]
    fn move_tracks_delta_with_floor() {
        let surface = PointerSurface::new();
        let tracker = GestureTracker::new(100);
        let mut session = tracker
            .begin(&PointerEvent::mouse_down(500.0), 300, OwnerId(1), surface.clone())
            .unwrap();

        assert_eq!(tracker.on_move(&mut session, &PointerEvent::mouse_move(560.0)), Some(360));
        assert_eq!(tracker.on_move(&mut session, &PointerEvent::mouse_move(0.0)), Some(100));
        assert_eq!(tracker.on_move(&mut session, &PointerEvent::mouse_move(450.0)), Some(250));
        assert_eq!(session.value(), 250);
    }

    #[test]
    fn end_is_idempotent() {
        let surface = PointerSurface::new();
        let tracker = GestureTracker::new(100);
        let mut session = tracker
            .begin(&PointerEvent::touch_start(vec![10.0]), 200, OwnerId(7), surface.clone())
            .unwrap();
        assert_eq!(surface.active_count(), 2);

        assert!(tracker.end(&mut session));
        assert!(!tracker.end(&mut session));
        assert_eq!(surface.detached_total(), 2);
        assert_eq!(tracker.on_move(&mut session, &PointerEvent::touch_move(vec![90.0])), None);
        assert_eq!(session.value(), 200);
    }

    #[test]
    fn begin_without_coordinate_does_not_attach() {
        let surface = PointerSurface::new();
        let tracker = GestureTracker::new(100);
        assert!(tracker
            .begin(&PointerEvent::touch_end(), 200, OwnerId(1), surface.clone())
            .is_none());
        assert_eq!(surface.attached_total(), 0);
    }

    #[test]
    fn dropping_a_live_session_releases_listeners() {
        let surface = PointerSurface::new();
        let tracker = GestureTracker::new(320);
        let session = tracker.begin(&PointerEvent::mouse_down(0.0), 640, OwnerId(2), surface.clone());
        assert_eq!(surface.active_count(), 2);
        drop(session);
        assert_eq!(surface.active_count(), 0);
    }
}
