//! Protocol server and heartbeat/stats for the Smith agent (spec.md
//! §4.6-§4.7): handshake, register greeting, message loop, idle sweeper,
//! graceful shutdown.

pub mod auth;
pub mod connection;
pub mod idle;
pub mod messages;
pub mod server;
pub mod state;
pub mod stats;

pub use auth::{check_handshake, AuthError};
pub use messages::{Inbound, Outbound, PROTOCOL_VERSION};
pub use server::{build_router, serve};
pub use state::{CloseReason, ConnectionHandle, ServerState};
pub use stats::{CpuSampler, SystemStats};
