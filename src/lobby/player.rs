use std::time::{Duration, Instant};

use crate::game::state::{Character, PlayerId};

/// A player waiting in the matchmaking queue
#[derive(Debug, Clone)]
pub struct LobbyPlayer {
    pub id: PlayerId,
    pub name: String,
    pub character: Character,
    /// Picked at enqueue time; the room inherits the first player's flag
    pub night_mode: bool,
    pub queued_at: Instant,
}

impl LobbyPlayer {
    pub fn new(id: PlayerId, name: String, character: Character, night_mode: bool) -> Self {
        Self {
            id,
            name,
            character,
            night_mode,
            queued_at: Instant::now(),
        }
    }

    /// Time spent in the queue so far
    pub fn wait_time(&self) -> Duration {
        self.queued_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_player_new() {
        let id = Uuid::new_v4();
        let player = LobbyPlayer::new(id, "Test".to_string(), Character::Penguin, true);

        assert_eq!(player.id, id);
        assert_eq!(player.character, Character::Penguin);
        assert!(player.night_mode);
        assert!(player.wait_time() < Duration::from_secs(5));
    }
}
