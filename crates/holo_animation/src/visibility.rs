//! Visibility observation
//!
//! A registry mapping surface identity to visibility callbacks, plus the
//! document-level visible/hidden signal. The host feeds intersection and
//! document changes in; channels read a [`VisibilityGate`] to decide
//! whether stepping should be suspended.

use holo_platform::SurfaceId;
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Callback invoked with the new visibility
pub type VisibilityCallback = Rc<dyn Fn(bool)>;

/// Shared flag telling whether a surface is on screen
#[derive(Clone, Debug)]
pub struct VisibilityGate {
    visible: Rc<Cell<bool>>,
}

impl VisibilityGate {
    pub fn new(visible: bool) -> Self {
        Self {
            visible: Rc::new(Cell::new(visible)),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Work on the gated surface should be suspended
    pub fn is_paused(&self) -> bool {
        !self.visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SubscriptionKey {
    Surface(SurfaceId, u64),
    Document(u64),
}

struct SurfaceEntry {
    intersecting: bool,
    callbacks: Vec<(u64, VisibilityCallback)>,
}

struct ObserverInner {
    next_id: u64,
    surfaces: FxHashMap<SurfaceId, SurfaceEntry>,
    /// Last known state for surfaces nobody currently observes
    known: FxHashMap<SurfaceId, bool>,
    document_visible: bool,
    document_callbacks: Vec<(u64, VisibilityCallback)>,
}

impl ObserverInner {
    fn remove(&mut self, key: SubscriptionKey) {
        match key {
            SubscriptionKey::Surface(surface, id) => {
                let now_empty = match self.surfaces.get_mut(&surface) {
                    Some(entry) => {
                        entry.callbacks.retain(|(cb_id, _)| *cb_id != id);
                        entry.callbacks.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    if let Some(entry) = self.surfaces.remove(&surface) {
                        self.known.insert(surface, entry.intersecting);
                    }
                }
            }
            SubscriptionKey::Document(id) => {
                self.document_callbacks.retain(|(cb_id, _)| *cb_id != id);
            }
        }
    }
}

/// Registry of surface and document visibility observers
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct VisibilityObserver {
    inner: Rc<RefCell<ObserverInner>>,
}

impl VisibilityObserver {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObserverInner {
                next_id: 0,
                surfaces: FxHashMap::default(),
                known: FxHashMap::default(),
                document_visible: true,
                document_callbacks: Vec::new(),
            })),
        }
    }

    /// Observe intersection changes of one surface
    pub fn observe<F>(&self, surface: SurfaceId, callback: F) -> VisibilitySubscription
    where
        F: Fn(bool) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;

        let intersecting = inner.known.remove(&surface).unwrap_or(true);
        inner
            .surfaces
            .entry(surface)
            .or_insert_with(|| SurfaceEntry {
                intersecting,
                callbacks: Vec::new(),
            })
            .callbacks
            .push((id, Rc::new(callback)));

        VisibilitySubscription {
            observer: Rc::downgrade(&self.inner),
            key: Some(SubscriptionKey::Surface(surface, id)),
        }
    }

    /// Create a gate that follows one surface's intersection state
    pub fn gate(&self, surface: SurfaceId) -> (VisibilityGate, VisibilitySubscription) {
        let gate = VisibilityGate::new(self.is_intersecting(surface));
        let follower = gate.clone();
        let subscription = self.observe(surface, move |visible| follower.set_visible(visible));
        (gate, subscription)
    }

    /// Observe document visibility changes
    pub fn observe_document<F>(&self, callback: F) -> VisibilitySubscription
    where
        F: Fn(bool) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.document_callbacks.push((id, Rc::new(callback)));

        VisibilitySubscription {
            observer: Rc::downgrade(&self.inner),
            key: Some(SubscriptionKey::Document(id)),
        }
    }

    /// Report a surface's intersection state; observers hear about changes only
    pub fn set_intersecting(&self, surface: SurfaceId, intersecting: bool) {
        let callbacks: Vec<VisibilityCallback> = {
            let mut inner = self.inner.borrow_mut();
            match inner.surfaces.get_mut(&surface) {
                Some(entry) if entry.intersecting != intersecting => {
                    entry.intersecting = intersecting;
                    entry.callbacks.iter().map(|(_, cb)| Rc::clone(cb)).collect()
                }
                Some(_) => return,
                None => {
                    inner.known.insert(surface, intersecting);
                    return;
                }
            }
        };

        tracing::trace!(?surface, intersecting, "surface visibility changed");
        for callback in callbacks {
            callback(intersecting);
        }
    }

    /// Report document visibility; observers hear about changes only
    pub fn set_document_visible(&self, visible: bool) {
        let callbacks: Vec<VisibilityCallback> = {
            let mut inner = self.inner.borrow_mut();
            if inner.document_visible == visible {
                return;
            }
            inner.document_visible = visible;
            inner
                .document_callbacks
                .iter()
                .map(|(_, cb)| Rc::clone(cb))
                .collect()
        };

        tracing::debug!(visible, "document visibility changed");
        for callback in callbacks {
            callback(visible);
        }
    }

    pub fn is_document_visible(&self) -> bool {
        self.inner.borrow().document_visible
    }

    /// Last reported intersection state (surfaces start out visible)
    pub fn is_intersecting(&self, surface: SurfaceId) -> bool {
        let inner = self.inner.borrow();
        inner
            .surfaces
            .get(&surface)
            .map(|e| e.intersecting)
            .or_else(|| inner.known.get(&surface).copied())
            .unwrap_or(true)
    }

    /// Number of live observers of one surface
    pub fn observer_count(&self, surface: SurfaceId) -> usize {
        self.inner
            .borrow()
            .surfaces
            .get(&surface)
            .map(|e| e.callbacks.len())
            .unwrap_or(0)
    }

    /// Number of live document observers
    pub fn document_observer_count(&self) -> usize {
        self.inner.borrow().document_callbacks.len()
    }
}

impl Default for VisibilityObserver {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration handle; dropping it unobserves
pub struct VisibilitySubscription {
    observer: Weak<RefCell<ObserverInner>>,
    key: Option<SubscriptionKey>,
}

impl VisibilitySubscription {
    /// Stop observing now
    pub fn unobserve(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let (Some(key), Some(inner)) = (self.key.take(), self.observer.upgrade()) {
            inner.borrow_mut().remove(key);
        }
    }
}

impl Drop for VisibilitySubscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_follows_intersection() {
        let observer = VisibilityObserver::new();
        let surface = SurfaceId(1);
        let (gate, _sub) = observer.gate(surface);

        assert!(gate.is_visible());
        observer.set_intersecting(surface, false);
        assert!(gate.is_paused());
        observer.set_intersecting(surface, true);
        assert!(gate.is_visible());
    }

    #[test]
    fn test_gate_starts_from_known_state() {
        let observer = VisibilityObserver::new();
        observer.set_intersecting(SurfaceId(3), false);

        let (gate, _sub) = observer.gate(SurfaceId(3));
        assert!(gate.is_paused());
    }

    #[test]
    fn test_unobserve_is_symmetric() {
        let observer = VisibilityObserver::new();
        let surface = SurfaceId(2);

        let a = observer.observe(surface, |_| {});
        let b = observer.observe(surface, |_| {});
        assert_eq!(observer.observer_count(surface), 2);

        a.unobserve();
        assert_eq!(observer.observer_count(surface), 1);
        drop(b);
        assert_eq!(observer.observer_count(surface), 0);
    }

    #[test]
    fn test_document_callbacks_fire_on_change_only() {
        let observer = VisibilityObserver::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = observer.observe_document(move |v| sink.borrow_mut().push(v));

        observer.set_document_visible(true);
        observer.set_document_visible(false);
        observer.set_document_visible(false);
        observer.set_document_visible(true);

        assert_eq!(*seen.borrow(), vec![false, true]);
    }

    #[test]
    fn test_subscription_outliving_observer() {
        let sub = {
            let observer = VisibilityObserver::new();
            observer.observe_document(|_| {})
        };
        // Dropping after the registry is gone is a no-op
        drop(sub);
    }
}
