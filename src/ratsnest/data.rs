//! Board-level ratsnest store
//!
//! Keeps one [`RatsnestNet`] per net number and routes item changes to the
//! net that owns them. Changes only mark nets dirty; the expensive
//! triangulation and spanning tree run in [`RatsnestData::recalculate`].

use super::net::RatsnestNet;
use super::types::{ItemId, ModuleId, NetCode, PadId, Point, RatsnestOptions, NO_NET};
use crate::board::{Board, BoardItem, Module};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

/// A missing connection ready for drawing
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Airwire {
    pub net: NetCode,
    pub start: Point,
    pub end: Point,
    pub weight: f64,
    /// Drawn for a node in simple (drag) mode rather than taken from the spanning tree
    pub simple: bool,
}

#[derive(Default)]
pub struct RatsnestData {
    nets: Vec<RatsnestNet>,
    item_nets: HashMap<ItemId, NetCode>,
    modules: HashMap<ModuleId, Vec<PadId>>,
    options: RatsnestOptions,
}

impl RatsnestData {
    pub fn new(options: RatsnestOptions) -> Self {
        Self {
            nets: Vec::new(),
            item_nets: HashMap::new(),
            modules: HashMap::new(),
            options,
        }
    }

    pub fn options(&self) -> &RatsnestOptions {
        &self.options
    }

    /// Builds the connectivity model from scratch. Required once after loading a board.
    pub fn process_board(&mut self, board: &Board) {
        let start = Instant::now();

        self.nets.clear();
        self.item_nets.clear();
        self.modules.clear();
        self.ensure_net(board.max_net().min(self.options.max_net));

        for module in &board.modules {
            self.modules
                .insert(module.id, module.pads.iter().map(|p| p.id).collect());
        }
        for item in board.items() {
            self.add(&item);
        }

        tracing::info!(
            "[Ratsnest] Processed board: {} items on {} nets in {:?}",
            self.item_nets.len(),
            self.nets.len().saturating_sub(1),
            start.elapsed()
        );
    }

    /// Whether items on `net` can be tracked under the configured `max_net`
    pub fn accepts_net(&self, net: NetCode) -> bool {
        net <= self.options.max_net
    }

    fn ensure_net(&mut self, net: NetCode) -> Option<&mut RatsnestNet> {
        if !self.accepts_net(net) {
            return None;
        }
        let len = net.checked_add(1)?;
        let strategy = self.options.candidates;
        if self.nets.len() < len {
            self.nets
                .resize_with(len, || RatsnestNet::with_strategy(strategy));
        }
        self.nets.get_mut(net)
    }

    /// Adds an item to its net, removing it from the net it was last seen on.
    /// Items on nets above `max_net` are skipped.
    pub fn add(&mut self, item: &BoardItem) {
        let id = item.id();
        let net = item.net();

        if self.item_nets.get(&id).is_some_and(|&old| old != net) {
            self.remove(id);
        }
        if net == NO_NET {
            return;
        }

        match self.ensure_net(net) {
            Some(n) => {
                n.add_item(item);
                self.item_nets.insert(id, net);
            }
            None => tracing::warn!(
                "[Ratsnest] Skipping {:?}: net {} exceeds max_net {}",
                id,
                net,
                self.options.max_net
            ),
        }
    }

    /// Removes an item from whichever net holds it. Unknown items are ignored.
    pub fn remove(&mut self, id: ItemId) {
        if let Some(net) = self.item_nets.remove(&id) {
            if let Some(n) = self.nets.get_mut(net) {
                n.remove_item(id);
            }
        }
    }

    /// Replaces an item's contribution with its current geometry and net
    pub fn update(&mut self, item: &BoardItem) {
        self.remove(item.id());
        self.add(item);
    }

    /// Updates every pad of a module; pads the module no longer has are removed.
    /// A pad listed here leaves whichever module held it before.
    pub fn update_module(&mut self, module: &Module) {
        let current: Vec<PadId> = module.pads.iter().map(|p| p.id).collect();
        for (id, pads) in self.modules.iter_mut() {
            if *id != module.id {
                pads.retain(|p| !current.contains(p));
            }
        }
        if let Some(previous) = self.modules.insert(module.id, current.clone()) {
            for pad in previous.into_iter().filter(|p| !current.contains(p)) {
                self.remove(ItemId::Pad(pad));
            }
        }
        for pad in &module.pads {
            self.update(&BoardItem::Pad(pad.clone()));
        }
    }

    pub fn remove_module(&mut self, id: ModuleId) {
        if let Some(pads) = self.modules.remove(&id) {
            for pad in pads {
                self.remove(ItemId::Pad(pad));
            }
        }
    }

    /// Net number an item was last added to
    pub fn item_net(&self, id: ItemId) -> Option<NetCode> {
        self.item_nets.get(&id).copied()
    }

    /// Draws an item's nodes in simple mode (one line per node)
    pub fn add_simple(&mut self, id: ItemId) {
        let Some(net) = self.item_net(id) else {
            return;
        };
        let net = &mut self.nets[net];
        for node in net.get_nodes(id) {
            net.add_simple_node(node);
        }
    }

    pub fn add_simple_module(&mut self, id: ModuleId) {
        let pads = self.modules.get(&id).cloned().unwrap_or_default();
        for pad in pads {
            self.add_simple(ItemId::Pad(pad));
        }
    }

    pub fn clear_simple(&mut self) {
        for net in &mut self.nets {
            net.clear_simple();
        }
    }

    /// Recomputes one net, or every dirty net when `net` is None
    pub fn recalculate(&mut self, net: Option<NetCode>) {
        if let Some(code) = net {
            if let Some(n) = self.nets.get_mut(code) {
                n.update();
            }
            return;
        }

        let start = Instant::now();
        let dirty = self.nets.iter().filter(|n| n.is_dirty()).count();
        if dirty == 0 {
            return;
        }

        if dirty >= self.options.parallel_threshold {
            self.nets
                .par_iter_mut()
                .filter(|n| n.is_dirty())
                .for_each(|n| {
                    n.update();
                });
        } else {
            for n in self.nets.iter_mut().filter(|n| n.is_dirty()) {
                n.update();
            }
        }

        tracing::debug!(
            "[Ratsnest] Recalculated {} dirty nets in {:?}",
            dirty,
            start.elapsed()
        );
    }

    /// Per-net ratsnest, indexed by net number
    pub fn nets(&self) -> &[RatsnestNet] {
        &self.nets
    }

    pub fn net(&self, net: NetCode) -> Option<&RatsnestNet> {
        self.nets.get(net)
    }

    pub fn set_visible(&mut self, net: NetCode, visible: bool) {
        if let Some(n) = self.nets.get_mut(net) {
            n.set_visible(visible);
        }
    }

    pub fn is_dirty(&self, net: NetCode) -> bool {
        self.nets.get(net).is_some_and(|n| n.is_dirty())
    }

    pub fn is_connected(&self, net: NetCode) -> bool {
        self.nets.get(net).map_or(true, |n| n.is_connected())
    }

    /// Total missing connections over all nets, as of their last update
    pub fn unconnected_count(&self) -> usize {
        self.nets
            .iter()
            .skip(1)
            .map(|n| n.unconnected().len())
            .sum()
    }

    /// Lines for the renderer: spanning tree edges of visible nets that do not
    /// touch a node in simple mode, followed by the simple mode lines
    pub fn airwires(&self) -> Vec<Airwire> {
        let mut wires = Vec::new();

        for (code, net) in self.nets.iter().enumerate().skip(1) {
            if !net.is_visible() {
                continue;
            }
            let links = net.links();
            let steady = |id| links.node(id).is_some_and(|n| !n.flag());

            for edge in net.unconnected() {
                if edge.weight > 0.0 && steady(edge.source) && steady(edge.target) {
                    wires.push(Airwire {
                        net: code,
                        start: edge.source_pos,
                        end: edge.target_pos,
                        weight: edge.weight,
                        simple: false,
                    });
                }
            }

            for edge in net.simple_connections() {
                wires.push(Airwire {
                    net: code,
                    start: edge.source_pos,
                    end: edge.target_pos,
                    weight: edge.weight,
                    simple: true,
                });
            }
        }

        wires
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Pad, Track, Via};
    use crate::ratsnest::{TrackId, ViaId};

    fn pad(id: u64, net: NetCode, x: i32, y: i32) -> BoardItem {
        BoardItem::Pad(Pad { id: PadId(id), net, position: Point::new(x, y) })
    }

    #[test]
    fn test_no_net_items_are_ignored() {
        let mut data = RatsnestData::default();
        data.add(&pad(1, NO_NET, 0, 0));
        assert!(data.item_net(ItemId::Pad(PadId(1))).is_none());
        assert!(data.nets().is_empty());
    }

    #[test]
    fn test_update_moves_item_between_nets() {
        let mut data = RatsnestData::default();
        data.add(&pad(1, 1, 0, 0));
        data.add(&pad(2, 1, 10, 0));
        data.recalculate(None);
        assert_eq!(data.net(1).unwrap().unconnected().len(), 1);

        data.update(&pad(2, 2, 10, 0));
        assert!(data.is_dirty(1));
        assert_eq!(data.item_net(ItemId::Pad(PadId(2))), Some(2));
        data.recalculate(None);
        assert!(data.is_connected(1));
        assert!(data.is_connected(2));
        assert_eq!(data.net(1).unwrap().links().node_count(), 1);
    }

    #[test]
    fn test_recalculate_single_net() {
        let mut data = RatsnestData::default();
        data.add(&pad(1, 1, 0, 0));
        data.add(&pad(2, 2, 0, 0));
        data.recalculate(Some(2));
        assert!(data.is_dirty(1));
        assert!(!data.is_dirty(2));
        data.recalculate(Some(42));
    }

    #[test]
    fn test_parallel_recalculate() {
        let mut data = RatsnestData::new(RatsnestOptions {
            parallel_threshold: 1,
            ..Default::default()
        });
        for net in 1..=8 {
            for i in 0..5 {
                data.add(&pad(net as u64 * 100 + i, net, i as i32 * 10, net as i32 * 7));
            }
        }
        data.recalculate(None);
        assert!((1..=8).all(|n| !data.is_dirty(n)));
        assert_eq!(data.unconnected_count(), 8 * 4);
    }

    #[test]
    fn test_airwires_skip_hidden_nets() {
        let mut data = RatsnestData::default();
        data.add(&pad(1, 1, 0, 0));
        data.add(&pad(2, 1, 10, 0));
        data.add(&BoardItem::Via(Via { id: ViaId(3), net: 2, position: Point::new(0, 50) }));
        data.add(&pad(4, 2, 0, 80));
        data.recalculate(None);
        assert_eq!(data.airwires().len(), 2);

        data.set_visible(2, false);
        let wires = data.airwires();
        assert_eq!(wires.len(), 1);
        assert_eq!(wires[0].net, 1);
    }

    #[test]
    fn test_simple_mode_replaces_edges_of_moving_item() {
        let mut data = RatsnestData::default();
        data.add(&pad(1, 1, 0, 0));
        data.add(&pad(2, 1, 10, 0));
        data.add(&pad(3, 1, 100, 0));
        data.recalculate(None);

        data.update(&pad(3, 1, 50, 0));
        data.add_simple(ItemId::Pad(PadId(3)));
        let wires = data.airwires();
        assert_eq!(wires.iter().filter(|w| w.simple).count(), 1);
        assert!(wires.iter().all(|w| w.start != Point::new(100, 0) || w.simple));

        data.clear_simple();
        data.recalculate(None);
        let wires = data.airwires();
        assert_eq!(wires.len(), 2);
        assert!(wires.iter().all(|w| !w.simple));
    }

    #[test]
    fn test_remove_module_drops_its_pads() {
        let mut data = RatsnestData::default();
        let board = Board {
            modules: vec![
                Module {
                    id: ModuleId(1),
                    pads: vec![
                        Pad { id: PadId(1), net: 1, position: Point::new(0, 0) },
                        Pad { id: PadId(2), net: 2, position: Point::new(0, 5) },
                    ],
                },
                Module {
                    id: ModuleId(2),
                    pads: vec![Pad { id: PadId(3), net: 1, position: Point::new(9, 0) }],
                },
            ],
            ..Default::default()
        };
        data.process_board(&board);
        data.recalculate(None);
        assert_eq!(data.unconnected_count(), 1);

        data.remove_module(ModuleId(2));
        assert!(data.item_net(ItemId::Pad(PadId(3))).is_none());
        data.recalculate(None);
        assert_eq!(data.unconnected_count(), 0);
        data.remove_module(ModuleId(2));
    }

    #[test]
    fn test_out_of_range_net_is_skipped() {
        let mut data = RatsnestData::default();
        data.add(&pad(1, 1, 0, 0));
        data.add(&pad(2, 1, 10, 0));

        data.add(&pad(3, usize::MAX, 5, 5));
        data.add(&pad(4, 1_000_000_000_000, 5, 5));
        assert!(data.item_net(ItemId::Pad(PadId(3))).is_none());
        assert!(data.item_net(ItemId::Pad(PadId(4))).is_none());
        assert_eq!(data.nets().len(), 2);

        // Moving a tracked pad to an invalid net drops it from its old net
        data.update(&pad(2, usize::MAX, 10, 0));
        assert!(data.item_net(ItemId::Pad(PadId(2))).is_none());
        data.recalculate(None);
        assert_eq!(data.net(1).unwrap().links().node_count(), 1);
        assert!(!data.accepts_net(usize::MAX));
        assert!(data.accepts_net(1));
    }

    #[test]
    fn test_max_net_is_configurable() {
        let mut data = RatsnestData::new(RatsnestOptions { max_net: 3, ..Default::default() });
        let board = Board {
            modules: vec![Module {
                id: ModuleId(1),
                pads: vec![
                    Pad { id: PadId(1), net: 3, position: Point::new(0, 0) },
                    Pad { id: PadId(2), net: 4, position: Point::new(1, 0) },
                ],
            }],
            ..Default::default()
        };
        data.process_board(&board);
        assert_eq!(data.nets().len(), 4);
        assert_eq!(data.item_net(ItemId::Pad(PadId(1))), Some(3));
        assert!(data.item_net(ItemId::Pad(PadId(2))).is_none());
    }

    #[test]
    fn test_pad_moved_between_modules() {
        let mut data = RatsnestData::default();
        let board = Board {
            modules: vec![
                Module {
                    id: ModuleId(1),
                    pads: vec![
                        Pad { id: PadId(1), net: 1, position: Point::new(0, 0) },
                        Pad { id: PadId(5), net: 1, position: Point::new(5, 0) },
                    ],
                },
                Module {
                    id: ModuleId(2),
                    pads: vec![Pad { id: PadId(2), net: 1, position: Point::new(9, 0) }],
                },
            ],
            ..Default::default()
        };
        data.process_board(&board);

        data.update_module(&Module {
            id: ModuleId(2),
            pads: vec![
                Pad { id: PadId(2), net: 1, position: Point::new(9, 0) },
                Pad { id: PadId(5), net: 1, position: Point::new(7, 0) },
            ],
        });
        data.remove_module(ModuleId(1));

        assert!(data.item_net(ItemId::Pad(PadId(1))).is_none());
        assert_eq!(data.item_net(ItemId::Pad(PadId(5))), Some(1));
        data.recalculate(None);
        assert_eq!(data.net(1).unwrap().links().node_count(), 2);
    }

    #[test]
    fn test_track_removal_splits_net() {
        let mut data = RatsnestData::default();
        data.add(&pad(1, 1, 0, 0));
        data.add(&pad(2, 1, 10, 0));
        let track = BoardItem::Track(Track {
            id: TrackId(9),
            net: 1,
            start: Point::new(0, 0),
            end: Point::new(10, 0),
        });
        data.add(&track);
        data.recalculate(None);
        assert!(data.is_connected(1));

        data.remove(track.id());
        data.recalculate(None);
        assert_eq!(data.unconnected_count(), 1);
    }
}
