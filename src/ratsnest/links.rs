//! Node registry and connection storage for a single net
//!
//! Nodes are deduplicated by coordinate: every item that touches the same
//! point shares one node, which is reference counted and erased when the
//! last item releases it. Nodes and edges live in generational arenas, so a
//! handle that outlives its slot is detected instead of aliasing a newer one.

use super::types::Point;
use std::collections::HashMap;
use std::marker::PhantomData;

/// Generational handle into a slot arena
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation, _marker: PhantomData }
    }

    /// Slot index, stable while the handle is live
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

// Manual impls: derives would put bounds on T.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot arena with a free list
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new(), free: Vec::new(), len: 0 }
    }

    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, value: Some(value) });
        Handle::new(index, 0)
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_mut())
    }

    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Live entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.value.as_ref().map(|v| (Handle::new(i as u32, s.generation), v))
        })
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A connectivity node: one distinct coordinate used by items of a net
#[derive(Debug, Clone)]
pub struct Node {
    position: Point,
    flag: bool,
    refs: u32,
}

impl Node {
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn x(&self) -> i32 {
        self.position.x
    }

    pub fn y(&self) -> i32 {
        self.position.y
    }

    /// Set while the node is drawn in simple (drag) mode
    pub fn flag(&self) -> bool {
        self.flag
    }

    pub(crate) fn set_flag(&mut self, flag: bool) {
        self.flag = flag;
    }

    /// Number of item references currently holding this node
    pub fn ref_count(&self) -> u32 {
        self.refs
    }
}

/// Unordered node pair with a weight. 0 means existing copper.
#[derive(Debug, Clone)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
}

impl Edge {
    pub fn is_real(&self) -> bool {
        self.weight == 0.0
    }
}

pub type NodeId = Handle<Node>;
pub type EdgeId = Handle<Edge>;

/// Nodes and connections of one net
#[derive(Default)]
pub struct RatsnestLinks {
    nodes: Arena<Node>,
    by_position: HashMap<Point, NodeId>,
    edges: Arena<Edge>,
}

impl RatsnestLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node at (x, y), creating it if needed. Each call adds one reference.
    pub fn add_node(&mut self, x: i32, y: i32) -> NodeId {
        self.add_node_at(Point::new(x, y))
    }

    pub fn add_node_at(&mut self, position: Point) -> NodeId {
        if let Some(&id) = self.by_position.get(&position) {
            if let Some(node) = self.nodes.get_mut(id) {
                node.refs += 1;
                return id;
            }
        }
        let id = self.nodes.insert(Node { position, flag: false, refs: 1 });
        self.by_position.insert(position, id);
        id
    }

    /// Drops one reference; erases the node when none remain. Returns true if erased.
    pub fn release_node(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.refs = node.refs.saturating_sub(1);
        if node.refs > 0 {
            return false;
        }
        self.remove_node(id);
        true
    }

    /// Erases a node regardless of its reference count. Unknown handles are ignored.
    pub fn remove_node(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(id) {
            if self.by_position.get(&node.position) == Some(&id) {
                self.by_position.remove(&node.position);
            }
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn find_node(&self, position: Point) -> Option<NodeId> {
        self.by_position.get(&position).copied()
    }

    /// Live nodes in a deterministic order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter()
    }

    /// Snapshot of the current node handles
    pub fn get_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|(id, _)| id).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Adds a connection between two nodes of this net.
    ///
    /// # Panics
    /// If either node is not live in this registry: an edge may never span nets.
    pub fn add_connection(&mut self, source: NodeId, target: NodeId, weight: f64) -> EdgeId {
        assert!(
            self.nodes.get(source).is_some() && self.nodes.get(target).is_some(),
            "connection {:?}-{:?} references a node outside this net",
            source,
            target
        );
        debug_assert!(weight >= 0.0);
        self.edges.insert(Edge { source, target, weight })
    }

    pub fn remove_connection(&mut self, id: EdgeId) -> Option<Edge> {
        self.edges.remove(id)
    }

    pub fn connection(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn connections(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges.iter()
    }

    pub fn connection_count(&self) -> usize {
        self.edges.len()
    }
}
