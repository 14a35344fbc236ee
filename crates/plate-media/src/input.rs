//! Pointer input normalized at the boundary, plus the surface-wide listener
//! registry that drag sessions subscribe to.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Where a pointer event came from. Touch events carry every active contact;
/// only the first one drives a drag.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerSource {
    Mouse { x: f32 },
    Touch { contacts: Vec<f32> },
}

impl PointerSource {
    /// The single horizontal coordinate used by drags, if the event has one.
    /// `touchend` usually reports no remaining contacts.
    pub fn x(&self) -> Option<f32> {
        match self {
            PointerSource::Mouse { x } => Some(*x),
            PointerSource::Touch { contacts } => contacts.first().copied(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

impl PointerPhase {
    pub fn is_end(self) -> bool {
        matches!(self, PointerPhase::Up | PointerPhase::Cancel)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub source: PointerSource,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, source: PointerSource) -> Self {
        Self { phase, source }
    }

    pub fn mouse_down(x: f32) -> Self {
        Self::new(PointerPhase::Down, PointerSource::Mouse { x })
    }

    pub fn mouse_move(x: f32) -> Self {
        Self::new(PointerPhase::Move, PointerSource::Mouse { x })
    }

    pub fn mouse_up(x: f32) -> Self {
        Self::new(PointerPhase::Up, PointerSource::Mouse { x })
    }

    pub fn touch_start(contacts: impl Into<Vec<f32>>) -> Self {
        Self::new(
            PointerPhase::Down,
            PointerSource::Touch {
                contacts: contacts.into(),
            },
        )
    }

    pub fn touch_move(contacts: impl Into<Vec<f32>>) -> Self {
        Self::new(
            PointerPhase::Move,
            PointerSource::Touch {
                contacts: contacts.into(),
            },
        )
    }

    pub fn touch_end() -> Self {
        Self::new(
            PointerPhase::Up,
            PointerSource::Touch {
                contacts: Vec::new(),
            },
        )
    }

    pub fn touch_cancel() -> Self {
        Self::new(
            PointerPhase::Cancel,
            PointerSource::Touch {
                contacts: Vec::new(),
            },
        )
    }

    pub fn x(&self) -> Option<f32> {
        self.source.x()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Move,
    End,
}

impl ListenerKind {
    pub fn for_phase(phase: PointerPhase) -> Option<Self> {
        match phase {
            PointerPhase::Down => None,
            PointerPhase::Move => Some(ListenerKind::Move),
            PointerPhase::Up | PointerPhase::Cancel => Some(ListenerKind::End),
        }
    }
}

/// Registration seam for listeners bound to the whole input surface rather
/// than to one element.
pub trait InputSurface {
    fn attach(&self, owner: OwnerId, kind: ListenerKind) -> ListenerId;
    /// Returns false when `id` was not attached.
    fn detach(&self, id: ListenerId) -> bool;
}

/// Listeners held for the lifetime of a drag. Dropping the guard (or calling
/// `release`) detaches each listener exactly once.
pub struct ListenerGuard {
    surface: Rc<dyn InputSurface>,
    ids: Vec<ListenerId>,
}

impl ListenerGuard {
    pub fn acquire(surface: Rc<dyn InputSurface>, owner: OwnerId, kinds: &[ListenerKind]) -> Self {
        let ids = kinds.iter().map(|kind| surface.attach(owner, *kind)).collect();
        Self { surface, ids }
    }

    pub fn is_held(&self) -> bool {
        !self.ids.is_empty()
    }

    pub fn release(&mut self) {
        for id in self.ids.drain(..) {
            if !self.surface.detach(id) {
                tracing::warn!(?id, "listener was already detached");
            }
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard").field("ids", &self.ids).finish()
    }
}

#[derive(Debug, Default)]
struct SurfaceState {
    next_id: u64,
    listeners: BTreeMap<ListenerId, (OwnerId, ListenerKind)>,
    attached_total: usize,
    detached_total: usize,
}

/// In-process listener registry for one editing surface.
#[derive(Debug, Default)]
pub struct PointerSurface {
    state: RefCell<SurfaceState>,
}

impl PointerSurface {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Owners with at least one listener of `kind`, in registration order.
    pub fn listeners(&self, kind: ListenerKind) -> Vec<OwnerId> {
        let state = self.state.borrow();
        let mut owners: Vec<OwnerId> = Vec::new();
        for (owner, k) in state.listeners.values() {
            if *k == kind && !owners.contains(owner) {
                owners.push(*owner);
            }
        }
        owners
    }

    pub fn active_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    pub fn attached_total(&self) -> usize {
        self.state.borrow().attached_total
    }

    pub fn detached_total(&self) -> usize {
        self.state.borrow().detached_total
    }
}

impl InputSurface for PointerSurface {
    fn attach(&self, owner: OwnerId, kind: ListenerKind) -> ListenerId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = ListenerId(state.next_id);
        state.listeners.insert(id, (owner, kind));
        state.attached_total += 1;
        id
    }

    fn detach(&self, id: ListenerId) -> bool {
        let mut state = self.state.borrow_mut();
        if state.listeners.remove(&id).is_some() {
            state.detached_total += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_uses_first_contact() {
        assert_eq!(PointerEvent::touch_move(vec![40.0, 900.0]).x(), Some(40.0));
        assert_eq!(PointerEvent::touch_end().x(), None);
        assert_eq!(PointerEvent::mouse_move(12.5).x(), Some(12.5));
    }

    #[test]
    fn guard_detaches_once_on_release_and_drop() {
        let surface = PointerSurface::new();
        let mut guard = ListenerGuard::acquire(
            surface.clone(),
            OwnerId(1),
            &[ListenerKind::Move, ListenerKind::End],
        );
        assert_eq!(surface.active_count(), 2);
        assert_eq!(surface.listeners(ListenerKind::Move), vec![OwnerId(1)]);

        guard.release();
        assert!(!guard.is_held());
        drop(guard);

        assert_eq!(surface.active_count(), 0);
        assert_eq!(surface.detached_total(), 2);
    }
}
