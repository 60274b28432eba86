//! Change notifications for the state tree.
//!
//! Listeners are closures registered with a filter; the returned
//! [`Subscription`] unregisters them when dropped. Dispatch walks a snapshot
//! of the registrations, so a listener may add or drop other listeners while
//! being notified. Callbacks only get a shared view of the tree.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use strata_types::NodeId;

use crate::tree::StateTree;

/// Both halves of a re-parenting move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveInfo {
    pub child: NodeId,
    pub old_parent: NodeId,
    pub old_index: usize,
    pub new_parent: NodeId,
    pub new_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    PropertyChanged { node: NodeId, key: String },
    ChildAdded { parent: NodeId, child: NodeId, index: usize },
    ChildRemoved { parent: NodeId, child: NodeId, index: usize },
    ChildOrderChanged { parent: NodeId, old_index: usize, new_index: usize },
    /// Sent before the move; the child is still under its old parent.
    ChildWillMoveToNewParent(MoveInfo),
    ChildMovedToNewParent(MoveInfo),
    /// A track, processor or clip was added or became selected.
    ItemSelected { node: NodeId },
    /// A track, processor or clip left the project.
    ItemRemoved { node: NodeId },
}

impl Notification {
    pub fn is_project_item_event(&self) -> bool {
        matches!(
            self,
            Notification::ItemSelected { .. } | Notification::ItemRemoved { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerFilter {
    Everything,
    /// Property and structure changes at or below the node.
    Subtree(NodeId),
    /// Property changes on exactly this node.
    Properties(NodeId),
    /// Only item selected/removed events.
    ProjectItems,
}

impl ListenerFilter {
    pub fn matches(&self, n: &Notification, tree: &StateTree) -> bool {
        let within = |root: NodeId, node: NodeId| root == node || tree.is_ancestor_of(root, node);
        match *self {
            ListenerFilter::Everything => true,
            ListenerFilter::ProjectItems => n.is_project_item_event(),
            ListenerFilter::Properties(node) => {
                matches!(n, Notification::PropertyChanged { node: changed, .. } if *changed == node)
            }
            ListenerFilter::Subtree(root) => match n {
                Notification::PropertyChanged { node, .. } => within(root, *node),
                Notification::ChildAdded { parent, .. }
                | Notification::ChildRemoved { parent, .. }
                | Notification::ChildOrderChanged { parent, .. } => within(root, *parent),
                Notification::ChildWillMoveToNewParent(m)
                | Notification::ChildMovedToNewParent(m) => {
                    within(root, m.old_parent) || within(root, m.new_parent)
                }
                Notification::ItemSelected { .. } | Notification::ItemRemoved { .. } => false,
            },
        }
    }
}

type Callback = Rc<RefCell<dyn FnMut(&Notification, &StateTree)>>;

struct Listener {
    id: u64,
    filter: ListenerFilter,
    callback: Callback,
}

#[derive(Default)]
struct BusInner {
    listeners: RefCell<Vec<Listener>>,
    next_id: Cell<u64>,
}

impl BusInner {
    fn is_registered(&self, id: u64) -> bool {
        self.listeners.borrow().iter().any(|l| l.id == id)
    }

    fn remove(&self, id: u64) {
        self.listeners.borrow_mut().retain(|l| l.id != id);
    }
}

/// Cheap to clone; clones share the same registrations.
#[derive(Clone, Default)]
pub struct NotificationBus {
    inner: Rc<BusInner>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, filter: ListenerFilter, callback: F) -> Subscription
    where
        F: FnMut(&Notification, &StateTree) + 'static,
    {
        let id = self.inner.next_id.get() + 1;
        self.inner.next_id.set(id);
        let callback: Callback = Rc::new(RefCell::new(callback));
        self.inner.listeners.borrow_mut().push(Listener {
            id,
            filter,
            callback,
        });
        Subscription {
            bus: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Notify matching listeners in registration order.
    pub(crate) fn dispatch(&self, n: &Notification, tree: &StateTree) {
        let snapshot: Vec<(u64, ListenerFilter, Callback)> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|l| (l.id, l.filter, l.callback.clone()))
            .collect();

        for (id, filter, callback) in snapshot {
            if !self.inner.is_registered(id) || !filter.matches(n, tree) {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut cb) => (&mut *cb)(n, tree),
                Err(_) => {
                    log::warn!(target: "notify", "listener {} is already running, skipping {:?}", id, n)
                }
            }
        }
    }
}

/// Keeps a listener registered for as long as it lives.
pub struct Subscription {
    bus: Weak<BusInner>,
    id: u64,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.bus
            .upgrade()
            .map(|inner| inner.is_registered(self.id))
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
