//! Sea Turtle Arcade Server Library
//!
//! Authoritative two-player rooms over WebTransport: a FIFO matchmaker pairs
//! players, each room runs its own fixed-rate simulation and broadcasts
//! snapshots to both clients.

pub mod config;
pub mod game;
pub mod lobby;
pub mod metrics;
pub mod net;
pub mod util;
