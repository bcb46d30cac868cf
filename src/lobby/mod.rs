//! Matchmaking and room management
//!
//! Pairs waiting players, owns the room registry and drives each room's
//! simulation on its own task.

pub mod manager;
pub mod matchmaker;
pub mod player;
pub mod room;

/// Unique room identifier
pub type RoomId = uuid::Uuid;
