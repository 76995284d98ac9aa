//! Server state management for the ratsnest server

use crate::ratsnest::{RatsnestData, RatsnestOptions};

/// In-memory state: the ratsnest store of the loaded board
#[derive(Default)]
pub struct ServerState {
    pub board_path: Option<String>,
    pub ratsnest: Option<RatsnestData>,
    pub options: RatsnestOptions,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a board is loaded
    pub fn is_board_loaded(&self) -> bool {
        self.ratsnest.is_some()
    }
}
