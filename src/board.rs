//! Board snapshot consumed by the ratsnest engine
//!
//! Read-only view of the connected items on a board: pads (grouped in
//! modules), vias, track segments and copper zones, each tagged with a net
//! number. Snapshots can be loaded from JSON for the stdio host and tests.

use crate::ratsnest::{ItemId, ModuleId, NetCode, PadId, Point, TrackId, ViaId, ZoneId, NO_NET};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub id: PadId,
    pub net: NetCode,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub id: ViaId,
    pub net: NetCode,
    pub position: Point,
}

/// Straight track segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub net: NetCode,
    pub start: Point,
    pub end: Point,
}

/// Filled copper zone, one outline per simple sub-polygon (holes included)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub net: NetCode,
    pub polygons: Vec<Vec<Point>>,
}

/// Footprint: a group of pads that move together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    #[serde(default)]
    pub pads: Vec<Pad>,
}

/// Any item that takes part in connectivity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BoardItem {
    Pad(Pad),
    Via(Via),
    Track(Track),
    Zone(Zone),
}

impl BoardItem {
    pub fn id(&self) -> ItemId {
        match self {
            BoardItem::Pad(p) => ItemId::Pad(p.id),
            BoardItem::Via(v) => ItemId::Via(v.id),
            BoardItem::Track(t) => ItemId::Track(t.id),
            BoardItem::Zone(z) => ItemId::Zone(z.id),
        }
    }

    pub fn net(&self) -> NetCode {
        match self {
            BoardItem::Pad(p) => p.net,
            BoardItem::Via(v) => v.net,
            BoardItem::Track(t) => t.net,
            BoardItem::Zone(z) => z.net,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Board {
    pub modules: Vec<Module>,
    pub vias: Vec<Via>,
    pub tracks: Vec<Track>,
    pub zones: Vec<Zone>,
}

impl Board {
    pub fn pads(&self) -> impl Iterator<Item = &Pad> + '_ {
        self.modules.iter().flat_map(|m| m.pads.iter())
    }

    /// Highest net number used by any item
    pub fn max_net(&self) -> NetCode {
        self.pads()
            .map(|p| p.net)
            .chain(self.vias.iter().map(|v| v.net))
            .chain(self.tracks.iter().map(|t| t.net))
            .chain(self.zones.iter().map(|z| z.net))
            .max()
            .unwrap_or(NO_NET)
    }

    /// One past the highest net number used by any item
    pub fn net_count(&self) -> usize {
        self.max_net().saturating_add(1)
    }

    /// All connected items, pads first, then vias, tracks and zones
    pub fn items(&self) -> Vec<BoardItem> {
        self.pads()
            .cloned()
            .map(BoardItem::Pad)
            .chain(self.vias.iter().cloned().map(BoardItem::Via))
            .chain(self.tracks.iter().cloned().map(BoardItem::Track))
            .chain(self.zones.iter().cloned().map(BoardItem::Zone))
            .collect()
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse board snapshot")
    }

    /// Loads a board snapshot from a JSON file
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open board file {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse board file {}", path.display()))
    }
}
