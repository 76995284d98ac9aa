//! Ratsnest for a single net
//!
//! Owns the net's nodes and connections, the item lookup tables needed to
//! undo an item's contribution, and the last computed set of missing
//! connections. Mutations only mark the net dirty; [`RatsnestNet::update`]
//! rebuilds the result from scratch.

use super::links::{EdgeId, Node, NodeId, RatsnestLinks};
use super::mst::spanning_edges;
use super::poly::ZonePolygon;
use super::types::{BoundingBox, CandidateStrategy, ItemId, PadId, Point, TrackId, ViaId, ZoneId};
use crate::board::{BoardItem, Pad, Track, Via, Zone};
use indexmap::IndexMap;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::collections::HashMap;
use std::time::Instant;

type NodePoint = GeomWithData<[f64; 2], NodeId>;

/// Selects which nodes a closest-node query may return
pub trait NodeFilter {
    fn accepts(&self, node: &Node) -> bool;
}

/// Passes every node
pub struct AllNodes;

impl NodeFilter for AllNodes {
    fn accepts(&self, _node: &Node) -> bool {
        true
    }
}

/// Passes nodes that are not in simple (drag) mode
pub struct WithoutFlag;

impl NodeFilter for WithoutFlag {
    fn accepts(&self, node: &Node) -> bool {
        !node.flag()
    }
}

impl<F: Fn(&Node) -> bool> NodeFilter for F {
    fn accepts(&self, node: &Node) -> bool {
        self(node)
    }
}

/// A connection between two nodes of a net, with endpoint positions resolved
#[derive(Clone, Debug, PartialEq)]
pub struct RatsnestEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub source_pos: Point,
    pub target_pos: Point,
    pub weight: f64,
}

#[derive(Clone, Copy, Debug)]
struct TrackLink {
    edge: EdgeId,
    start: NodeId,
    end: NodeId,
}

pub struct RatsnestNet {
    links: RatsnestLinks,
    unconnected: Vec<RatsnestEdge>,
    simple_nodes: Vec<NodeId>,
    dirty: bool,
    visible: bool,
    recompute_count: u64,
    strategy: CandidateStrategy,
    pads: IndexMap<PadId, NodeId>,
    vias: IndexMap<ViaId, NodeId>,
    tracks: IndexMap<TrackId, TrackLink>,
    zone_polygons: IndexMap<ZoneId, Vec<ZonePolygon>>,
    zone_connections: IndexMap<ZoneId, Vec<EdgeId>>,
}

impl RatsnestNet {
    pub fn new() -> Self {
        Self::with_strategy(CandidateStrategy::default())
    }

    pub fn with_strategy(strategy: CandidateStrategy) -> Self {
        Self {
            links: RatsnestLinks::new(),
            unconnected: Vec::new(),
            simple_nodes: Vec::new(),
            dirty: true,
            visible: true,
            recompute_count: 0,
            strategy,
            pads: IndexMap::new(),
            vias: IndexMap::new(),
            tracks: IndexMap::new(),
            zone_polygons: IndexMap::new(),
            zone_connections: IndexMap::new(),
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of completed recomputations
    pub fn recompute_count(&self) -> u64 {
        self.recompute_count
    }

    pub fn links(&self) -> &RatsnestLinks {
        &self.links
    }

    /// Missing connections from the last update
    pub fn unconnected(&self) -> &[RatsnestEdge] {
        &self.unconnected
    }

    /// True when the net is up to date and needs no further routing
    pub fn is_connected(&self) -> bool {
        !self.dirty && self.unconnected.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.links.node_count() == 0
    }

    pub fn add_item(&mut self, item: &BoardItem) {
        match item {
            BoardItem::Pad(pad) => self.add_pad(pad),
            BoardItem::Via(via) => self.add_via(via),
            BoardItem::Track(track) => self.add_track(track),
            BoardItem::Zone(zone) => self.add_zone(zone),
        }
    }

    pub fn remove_item(&mut self, id: ItemId) {
        match id {
            ItemId::Pad(id) => self.remove_pad(id),
            ItemId::Via(id) => self.remove_via(id),
            ItemId::Track(id) => self.remove_track(id),
            ItemId::Zone(id) => self.remove_zone(id),
        }
    }

    pub fn add_pad(&mut self, pad: &Pad) {
        self.remove_pad(pad.id);
        let node = self.links.add_node_at(pad.position);
        self.pads.insert(pad.id, node);
        self.dirty = true;
    }

    pub fn add_via(&mut self, via: &Via) {
        self.remove_via(via.id);
        let node = self.links.add_node_at(via.position);
        self.vias.insert(via.id, node);
        self.dirty = true;
    }

    pub fn add_track(&mut self, track: &Track) {
        self.remove_track(track.id);
        let start = self.links.add_node_at(track.start);
        let end = self.links.add_node_at(track.end);
        let edge = self.links.add_connection(start, end, 0.0);
        self.tracks.insert(track.id, TrackLink { edge, start, end });
        self.dirty = true;
    }

    pub fn add_zone(&mut self, zone: &Zone) {
        self.remove_zone(zone.id);

        let polygons: Vec<ZonePolygon> = zone
            .polygons
            .iter()
            .filter_map(|outline| {
                let bbox = BoundingBox::from_points(outline)?;
                ZonePolygon::new(outline, zone.id, bbox, &mut self.links)
            })
            .collect();

        self.zone_polygons.insert(zone.id, polygons);
        let tree = self.node_tree();
        self.connect_zone(zone.id, &tree);
        self.dirty = true;
    }

    pub fn remove_pad(&mut self, id: PadId) {
        if let Some(node) = self.pads.shift_remove(&id) {
            self.release(node);
            self.dirty = true;
        }
    }

    pub fn remove_via(&mut self, id: ViaId) {
        if let Some(node) = self.vias.shift_remove(&id) {
            self.release(node);
            self.dirty = true;
        }
    }

    pub fn remove_track(&mut self, id: TrackId) {
        if let Some(link) = self.tracks.shift_remove(&id) {
            self.links.remove_connection(link.edge);
            self.release(link.start);
            self.release(link.end);
            self.dirty = true;
        }
    }

    pub fn remove_zone(&mut self, id: ZoneId) {
        self.disconnect_zone(id);
        if let Some(polygons) = self.zone_polygons.shift_remove(&id) {
            for poly in polygons {
                self.release(poly.node());
            }
            self.dirty = true;
        }
    }

    /// Nodes contributed by a tracked item
    pub fn get_nodes(&self, id: ItemId) -> Vec<NodeId> {
        match id {
            ItemId::Pad(id) => self.pads.get(&id).copied().into_iter().collect(),
            ItemId::Via(id) => self.vias.get(&id).copied().into_iter().collect(),
            ItemId::Track(id) => self
                .tracks
                .get(&id)
                .map(|l| vec![l.start, l.end])
                .unwrap_or_default(),
            ItemId::Zone(id) => self
                .zone_polygons
                .get(&id)
                .map(|polys| polys.iter().map(|p| p.node()).collect())
                .unwrap_or_default(),
        }
    }

    pub fn zone_polygons(&self, id: ZoneId) -> &[ZonePolygon] {
        self.zone_polygons.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Closest node to `node` accepted by `filter`, excluding `node` itself
    pub fn closest_node(&self, node: NodeId, filter: &dyn NodeFilter) -> Option<NodeId> {
        let origin = self.links.node(node)?.position();
        self.links
            .nodes()
            .filter(|(id, n)| *id != node && filter.accepts(n))
            .min_by(|(_, a), (_, b)| {
                origin
                    .distance_2(&a.position())
                    .total_cmp(&origin.distance_2(&b.position()))
            })
            .map(|(id, _)| id)
    }

    /// Nodes sorted by distance from `node`, at most `count` of them (all if None)
    pub fn closest_nodes(
        &self,
        node: NodeId,
        filter: &dyn NodeFilter,
        count: Option<usize>,
    ) -> Vec<NodeId> {
        let Some(origin) = self.links.node(node).map(|n| n.position()) else {
            return Vec::new();
        };
        let mut found: Vec<(f64, NodeId)> = self
            .links
            .nodes()
            .filter(|(id, n)| *id != node && filter.accepts(n))
            .map(|(id, n)| (origin.distance_2(&n.position()), id))
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(count) = count {
            found.truncate(count);
        }
        found.into_iter().map(|(_, id)| id).collect()
    }

    /// Draws a node in simple mode: one line to its closest unflagged node
    pub fn add_simple_node(&mut self, node: NodeId) {
        let Some(n) = self.links.node_mut(node) else {
            return;
        };
        if !n.flag() {
            n.set_flag(true);
            self.simple_nodes.push(node);
        }
    }

    pub fn simple_nodes(&self) -> &[NodeId] {
        &self.simple_nodes
    }

    pub fn clear_simple(&mut self) {
        for node in self.simple_nodes.drain(..) {
            if let Some(n) = self.links.node_mut(node) {
                n.set_flag(false);
            }
        }
    }

    /// One edge per simple-mode node to its closest unflagged node
    pub fn simple_connections(&self) -> Vec<RatsnestEdge> {
        self.simple_nodes
            .iter()
            .filter_map(|&node| {
                let target = self.closest_node(node, &WithoutFlag)?;
                self.resolve_edge(node, target)
            })
            .collect()
    }

    /// Recomputes the missing connections if the net is dirty.
    /// Returns true if a recomputation happened.
    pub fn update(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        let start = Instant::now();

        self.process_zones();
        self.compute();

        self.dirty = false;
        self.recompute_count += 1;

        tracing::debug!(
            "[Ratsnest] Net updated: {} nodes, {} connections, {} unconnected in {:?}",
            self.links.node_count(),
            self.links.connection_count(),
            self.unconnected.len(),
            start.elapsed()
        );
        true
    }

    fn compute(&mut self) {
        self.unconnected.clear();
        if self.links.node_count() <= 1 {
            return;
        }

        let mut ids = Vec::with_capacity(self.links.node_count());
        let mut points = Vec::with_capacity(self.links.node_count());
        let mut index: HashMap<NodeId, usize> = HashMap::new();
        for (id, node) in self.links.nodes() {
            index.insert(id, ids.len());
            ids.push(id);
            points.push(node.position().as_array());
        }

        let lookup = |id: NodeId| match index.get(&id) {
            Some(&i) => i,
            None => panic!("connection references node {:?} missing from its net", id),
        };
        let real: Vec<(usize, usize)> = self
            .links
            .connections()
            .filter(|(_, e)| e.is_real())
            .map(|(_, e)| (lookup(e.source), lookup(e.target)))
            .collect();

        let accepted = spanning_edges(&points, &real, self.strategy);

        self.unconnected = accepted
            .into_iter()
            .filter_map(|c| self.resolve_edge(ids[c.a], ids[c.b]))
            .collect();
    }

    fn resolve_edge(&self, source: NodeId, target: NodeId) -> Option<RatsnestEdge> {
        let source_pos = self.links.node(source)?.position();
        let target_pos = self.links.node(target)?.position();
        Some(RatsnestEdge {
            source,
            target,
            source_pos,
            target_pos,
            weight: source_pos.distance(&target_pos),
        })
    }

    /// Releases an item's reference; drops zone connections to the node if it was erased
    fn release(&mut self, node: NodeId) {
        if !self.links.release_node(node) {
            return;
        }
        self.simple_nodes.retain(|&n| n != node);
        for edges in self.zone_connections.values_mut() {
            let links = &mut self.links;
            edges.retain(|&e| {
                let touches = links
                    .connection(e)
                    .map(|edge| edge.source == node || edge.target == node);
                match touches {
                    Some(true) => {
                        links.remove_connection(e);
                        false
                    }
                    Some(false) => true,
                    None => false,
                }
            });
        }
    }

    fn node_tree(&self) -> RTree<NodePoint> {
        RTree::bulk_load(
            self.links
                .nodes()
                .map(|(id, n)| NodePoint::new(n.position().as_array(), id))
                .collect(),
        )
    }

    /// Ties every node inside the zone's polygons to the polygon's node
    fn connect_zone(&mut self, id: ZoneId, tree: &RTree<NodePoint>) {
        let Some(polygons) = self.zone_polygons.get(&id) else {
            return;
        };

        let mut pairs = Vec::new();
        for poly in polygons {
            for candidate in tree.locate_in_envelope(&poly.bbox().envelope()) {
                let node = candidate.data;
                if node != poly.node() && poly.hit_test(&self.links, node) {
                    pairs.push((node, poly.node()));
                }
            }
        }

        let edges: Vec<EdgeId> = pairs
            .into_iter()
            .map(|(node, rep)| self.links.add_connection(node, rep, 0.0))
            .collect();
        self.zone_connections.entry(id).or_default().extend(edges);
    }

    fn disconnect_zone(&mut self, id: ZoneId) {
        if let Some(edges) = self.zone_connections.shift_remove(&id) {
            for edge in edges {
                self.links.remove_connection(edge);
            }
        }
    }

    /// Rebuilds zone connections so items added after a zone are absorbed by it
    fn process_zones(&mut self) {
        if self.zone_polygons.is_empty() {
            return;
        }
        let zones: Vec<ZoneId> = self.zone_polygons.keys().copied().collect();
        for &id in &zones {
            self.disconnect_zone(id);
        }
        let tree = self.node_tree();
        for id in zones {
            self.connect_zone(id, &tree);
        }
    }
}

impl Default for RatsnestNet {
    fn default() -> Self {
        Self::new()
    }
}
