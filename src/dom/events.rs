//! Listener registry and event dispatch
//!
//! A trimmed-down rendition of DOM event flow: capture phase from the
//! document down, target phase in registration order, bubble phase back up
//! for the event kinds that bubble. Dispatch does not call into handlers;
//! it produces an ordered list of [`Delivery`] records that the engine
//! routes to the owning player sessions. This keeps the document free of
//! callbacks and the whole pipeline inspectable in tests.
//!
//! The registry also supports *suppressor* entries: capturing listeners
//! that stop the event for everyone registered after them. The host page
//! offers no way to enumerate or remove its own listeners, so on embedded
//! pages the engine cuts off the host's `ended` and `visibilitychange`
//! handlers this way instead.

use super::{Document, NodeId};

/// Native event kinds the engine cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Play,
    Pause,
    Ended,
    TimeUpdate,
    VolumeChange,
    RateChange,
    FullscreenChange,
    EnterPictureInPicture,
    LeavePictureInPicture,
    VisibilityChange,
    MouseEnter,
    MouseLeave,
    Click,
}

impl EventKind {
    /// Whether the event travels up through ancestors after the target phase
    ///
    /// Media and pointer enter/leave events do not bubble; `click` does.
    fn bubbles(self) -> bool {
        matches!(self, EventKind::Click)
    }
}

/// Dispatch target of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// The document itself (fullscreen and visibility changes)
    Document,
    /// A specific element
    Node(NodeId),
}

/// One native event instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEvent {
    pub target: EventTarget,
    pub kind: EventKind,
}

/// Handle of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Opaque token identifying who registered a listener
///
/// The engine mints one token per player session (and one for the autoplay
/// probe) and routes deliveries back by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner(pub u64);

/// A registered listener
#[derive(Debug)]
pub struct Listener {
    id: ListenerId,
    target: EventTarget,
    kind: EventKind,
    capture: bool,
    suppress: bool,
    owner: Owner,
}

/// One event delivered to one listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub listener: ListenerId,
    pub owner: Owner,
    pub event: PageEvent,
}

impl Document {
    /// Register a listener; returns its handle for later removal
    pub fn add_listener(
        &mut self,
        target: EventTarget,
        kind: EventKind,
        capture: bool,
        owner: Owner,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push(Listener {
            id,
            target,
            kind,
            capture,
            suppress: false,
            owner,
        });
        id
    }

    /// Register a capturing suppressor that stops the event for every
    /// listener that would run after it
    pub fn add_suppressor(&mut self, target: EventTarget, kind: EventKind, owner: Owner) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push(Listener {
            id,
            target,
            kind,
            capture: true,
            suppress: true,
            owner,
        });
        id
    }

    /// Remove a previously registered listener; safe to call twice
    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|l| l.id != id);
    }

    /// Number of registered listeners (suppressors included)
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn enqueue(&mut self, event: PageEvent) {
        self.queue.push_back(event);
    }

    /// Whether undispatched events are pending
    pub fn has_pending_events(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Drain all pending events and dispatch each through the listener
    /// registry, returning the deliveries in order
    pub fn drain_deliveries(&mut self) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        while let Some(event) = self.queue.pop_front() {
            self.dispatch(event, &mut deliveries);
        }
        deliveries
    }

    fn dispatch(&self, event: PageEvent, out: &mut Vec<Delivery>) {
        match event.target {
            EventTarget::Document => self.dispatch_to_document(event, out),
            EventTarget::Node(node) => self.dispatch_to_node(event, node, out),
        }
    }

    fn dispatch_to_document(&self, event: PageEvent, out: &mut Vec<Delivery>) {
        for listener in &self.listeners {
            if listener.target != EventTarget::Document || listener.kind != event.kind {
                continue;
            }
            if listener.suppress {
                return;
            }
            out.push(Delivery {
                listener: listener.id,
                owner: listener.owner,
                event,
            });
        }
    }

    fn dispatch_to_node(&self, event: PageEvent, node: NodeId, out: &mut Vec<Delivery>) {
        // Ancestor chain from the document root down to (excluding) the target.
        let mut path = Vec::new();
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();

        // Capture phase: document first, then ancestors from the top down.
        for listener in self.matching(EventTarget::Document, event.kind) {
            if listener.capture && !self.deliver(listener, event, out) {
                return;
            }
        }
        for ancestor in &path {
            for listener in self.matching(EventTarget::Node(*ancestor), event.kind) {
                if listener.capture && !self.deliver(listener, event, out) {
                    return;
                }
            }
        }

        // Target phase: registration order, the capture flag does not matter.
        for listener in self.matching(EventTarget::Node(node), event.kind) {
            if !self.deliver(listener, event, out) {
                return;
            }
        }

        // Bubble phase, for the kinds that bubble.
        if !event.kind.bubbles() {
            return;
        }
        for ancestor in path.iter().rev() {
            for listener in self.matching(EventTarget::Node(*ancestor), event.kind) {
                if !listener.capture && !self.deliver(listener, event, out) {
                    return;
                }
            }
        }
        for listener in self.matching(EventTarget::Document, event.kind) {
            if !listener.capture && !self.deliver(listener, event, out) {
                return;
            }
        }
    }

    fn matching(&self, target: EventTarget, kind: EventKind) -> impl Iterator<Item = &Listener> {
        self.listeners
            .iter()
            .filter(move |l| l.target == target && l.kind == kind)
    }

    /// Returns false when propagation must stop
    fn deliver(&self, listener: &Listener, event: PageEvent, out: &mut Vec<Delivery>) -> bool {
        if listener.suppress {
            return false;
        }
        out.push(Delivery {
            listener: listener.id,
            owner: listener.owner,
            event,
        });
        true
    }
}
