//! Connectivity (ratsnest) analysis for PCB layouts
//!
//! Given the placed pads, vias, tracks and copper zones of a board, each
//! tagged with a net number, computes the airwires that still have to be
//! routed to connect every net.
//!
//! # Modules
//! - `board` - Board snapshot consumed by the engine
//! - `ratsnest` - Per-net connectivity graphs and the board-level store
//! - `server` - Line-oriented JSON-RPC host around the store

pub mod board;
pub mod ratsnest;
pub mod server;

pub use board::{Board, BoardItem, Module, Pad, Track, Via, Zone};
pub use ratsnest::{Airwire, RatsnestData, RatsnestNet, RatsnestOptions};
