//! Ratsnest (missing connection) engine
//!
//! Computes, per net, the minimal set of airwires that still have to be
//! routed so that every pad, via, track and zone of the net is connected.
//!
//! # Submodules
//! - `types` - Coordinates, item identities and options
//! - `links` - Node registry and connection arena for one net
//! - `poly` - Zone sub-polygon wrapper with point-in-polygon test
//! - `triangulation` - Delaunay triangulation used to propose candidate edges
//! - `mst` - Union-find components and Kruskal spanning tree
//! - `net` - Per-net connectivity graph
//! - `data` - Board-level store of all nets

mod types;
mod links;
mod poly;
mod triangulation;
mod mst;
mod net;
mod data;

pub use types::{
    Point,
    BoundingBox,
    NetCode,
    NO_NET,
    PadId,
    ViaId,
    TrackId,
    ZoneId,
    ModuleId,
    ItemId,
    CandidateStrategy,
    RatsnestOptions,
};

pub use links::{
    Handle,
    Node,
    NodeId,
    Edge,
    EdgeId,
    RatsnestLinks,
};

pub use poly::ZonePolygon;

pub use net::{
    RatsnestNet,
    RatsnestEdge,
    NodeFilter,
    AllNodes,
    WithoutFlag,
};

pub use data::{
    RatsnestData,
    Airwire,
};
