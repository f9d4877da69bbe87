//! Live render tree
//!
//! A [`Document`] is a tree of container nodes under a well-known `body`
//! node. Each node can host at most one isolated rendering [`Root`], which
//! owns a single [`View`]. Rendering walks the tree depth first, so later
//! siblings are drawn on top of earlier ones, and key events go to the
//! topmost rendered root.

use crate::view::View;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifier of a container node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Render tree errors
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("node {0} is not attached to the document")]
    NodeNotFound(NodeId),

    #[error("node {0} already hosts a rendering root")]
    RootExists(NodeId),

    #[error("rendering root on {0} was already unmounted")]
    RootUnmounted(NodeId),

    #[error("the body node cannot be removed")]
    BodyRemoval,
}

enum RootState {
    Empty,
    Rendered(Box<dyn View>),
    Unmounted,
}

type RootSlot = Arc<Mutex<RootState>>;

struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    root: Option<RootSlot>,
}

impl Node {
    fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            root: None,
        }
    }
}

struct DocumentInner {
    nodes: HashMap<NodeId, Node>,
    body: NodeId,
    next_id: u64,
}

/// Shared handle to a render tree
#[derive(Clone)]
pub struct Document {
    inner: Arc<Mutex<DocumentInner>>,
}

impl Document {
    /// Create an empty document holding only the body node
    pub fn new() -> Self {
        let body = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(body, Node::new(None));

        Self {
            inner: Arc::new(Mutex::new(DocumentInner {
                nodes,
                body,
                next_id: 1,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DocumentInner> {
        // Poisoning only means a view panicked mid-render; the tree itself is intact.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The top-level node every other node descends from
    pub fn body(&self) -> NodeId {
        self.lock().body
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.lock().nodes.contains_key(&node)
    }

    /// Create a new container node as the last child of `parent`
    pub fn create_element(&self, parent: NodeId) -> Result<NodeId, TreeError> {
        let mut inner = self.lock();
        if !inner.nodes.contains_key(&parent) {
            return Err(TreeError::NodeNotFound(parent));
        }

        let id = NodeId(inner.next_id);
        inner.next_id += 1;
        inner.nodes.insert(id, Node::new(Some(parent)));
        if let Some(parent_node) = inner.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
        Ok(id)
    }

    /// Detach `node` and its whole subtree from the document
    pub fn remove_node(&self, node: NodeId) -> Result<(), TreeError> {
        let mut inner = self.lock();
        if node == inner.body {
            return Err(TreeError::BodyRemoval);
        }
        let parent = inner
            .nodes
            .get(&node)
            .ok_or(TreeError::NodeNotFound(node))?
            .parent;

        if let Some(parent) = parent.and_then(|p| inner.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != node);
        }

        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = inner.nodes.remove(&id) {
                stack.extend(removed.children);
            }
        }
        Ok(())
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.lock()
            .nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Number of attached nodes, body included
    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    /// Create an isolated rendering root bound to `node`
    pub fn create_root(&self, node: NodeId) -> Result<Root, TreeError> {
        let mut inner = self.lock();
        let target = inner.nodes.get_mut(&node).ok_or(TreeError::NodeNotFound(node))?;
        if target.root.is_some() {
            return Err(TreeError::RootExists(node));
        }

        let slot: RootSlot = Arc::new(Mutex::new(RootState::Empty));
        target.root = Some(slot.clone());
        Ok(Root {
            node,
            document: self.clone(),
            slot,
        })
    }

    /// Handle to the root hosted by `node`, if any
    pub fn root_at(&self, node: NodeId) -> Option<Root> {
        let inner = self.lock();
        let slot = inner.nodes.get(&node)?.root.clone()?;
        Some(Root {
            node,
            document: self.clone(),
            slot,
        })
    }

    /// Rendered roots in paint order
    fn rendered_slots(&self) -> Vec<RootSlot> {
        let inner = self.lock();
        let mut slots = Vec::new();
        let mut stack = vec![inner.body];
        while let Some(id) = stack.pop() {
            let Some(node) = inner.nodes.get(&id) else {
                continue;
            };
            if let Some(slot) = &node.root {
                slots.push(slot.clone());
            }
            stack.extend(node.children.iter().rev().copied());
        }
        slots
    }

    /// Number of roots currently holding a view
    pub fn rendered_count(&self) -> usize {
        self.rendered_slots()
            .iter()
            .filter(|slot| matches!(*lock_slot(slot), RootState::Rendered(_)))
            .count()
    }

    /// Draw every rendered root into `area`
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        for slot in self.rendered_slots() {
            if let RootState::Rendered(view) = &mut *lock_slot(&slot) {
                if view.is_visible() {
                    view.render(frame, area);
                }
            }
        }
    }

    /// Route a key event to the topmost visible root
    pub fn handle_key_event(&self, event: KeyEvent) -> Result<bool> {
        for slot in self.rendered_slots().iter().rev() {
            if let RootState::Rendered(view) = &mut *lock_slot(slot) {
                if view.is_visible() {
                    return view.handle_key_event(event);
                }
            }
        }
        Ok(false)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .finish()
    }
}

fn lock_slot(slot: &RootSlot) -> MutexGuard<'_, RootState> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Isolated rendering root bound to one container node
#[derive(Clone)]
pub struct Root {
    node: NodeId,
    document: Document,
    slot: RootSlot,
}

impl Root {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Replace whatever the root currently shows with `view`
    pub fn render(&self, view: Box<dyn View>) -> Result<(), TreeError> {
        let mut state = lock_slot(&self.slot);
        if matches!(*state, RootState::Unmounted) {
            return Err(TreeError::RootUnmounted(self.node));
        }
        *state = RootState::Rendered(view);
        Ok(())
    }

    pub fn is_unmounted(&self) -> bool {
        matches!(*lock_slot(&self.slot), RootState::Unmounted)
    }

    /// Drop the rendered view and release the root from its node
    pub fn unmount(&self) -> Result<(), TreeError> {
        let previous = std::mem::replace(&mut *lock_slot(&self.slot), RootState::Unmounted);
        if matches!(previous, RootState::Unmounted) {
            return Err(TreeError::RootUnmounted(self.node));
        }

        let mut inner = self.document.lock();
        if let Some(node) = inner.nodes.get_mut(&self.node) {
            if node.root.as_ref().is_some_and(|slot| Arc::ptr_eq(slot, &self.slot)) {
                node.root = None;
            }
        }
        drop(inner);
        // The view is dropped outside both locks so its destructor may touch the tree.
        drop(previous);
        Ok(())
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root").field("node", &self.node).finish()
    }
}
