//! Ratsnest server module - line-oriented JSON-RPC host for the ratsnest engine
//!
//! # Module Structure
//! - `protocol` - JSON-RPC request/response types
//! - `state` - Server state (the loaded ratsnest store)
//! - `handlers` - Request handlers and method dispatch

pub mod handlers;
pub mod protocol;
pub mod state;

pub use handlers::dispatch;
pub use protocol::{Request, Response, ErrorResponse, error_codes};
pub use state::ServerState;
