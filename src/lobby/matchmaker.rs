use std::collections::VecDeque;

use tracing::debug;

use crate::game::state::PlayerId;
use crate::lobby::player::LobbyPlayer;

/// FIFO queue pairing the two oldest waiting players
#[derive(Debug, Default)]
pub struct Matchmaker {
    queue: VecDeque<LobbyPlayer>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a player. Re-queuing an already waiting player keeps their
    /// place. Returns the 1-based queue position.
    pub fn enqueue(&mut self, player: LobbyPlayer) -> usize {
        if let Some(position) = self.position(player.id) {
            return position;
        }
        self.queue.push_back(player);
        self.queue.len()
    }

    /// Put entries back at the head, preserving their order
    pub fn requeue_front(&mut self, players: impl IntoIterator<Item = LobbyPlayer>) {
        let players: Vec<_> = players.into_iter().collect();
        for player in players.into_iter().rev() {
            if !self.contains(player.id) {
                self.queue.push_front(player);
            }
        }
    }

    /// Dequeue the two oldest valid players.
    ///
    /// Invalid entries are discarded; a valid partner of an invalid entry goes
    /// back to the front so it keeps its priority.
    pub fn next_pair<F>(&mut self, is_valid: F) -> Option<(LobbyPlayer, LobbyPlayer)>
    where
        F: Fn(PlayerId) -> bool,
    {
        while self.queue.len() >= 2 {
            let (first, second) = match (self.queue.pop_front(), self.queue.pop_front()) {
                (Some(a), Some(b)) => (a, b),
                _ => return None,
            };

            match (is_valid(first.id), is_valid(second.id)) {
                (true, true) => return Some((first, second)),
                (true, false) => {
                    debug!(player_id = %second.id, "Discarding stale queue entry");
                    self.queue.push_front(first);
                }
                (false, true) => {
                    debug!(player_id = %first.id, "Discarding stale queue entry");
                    self.queue.push_front(second);
                }
                (false, false) => {
                    debug!("Discarding two stale queue entries");
                }
            }
        }
        None
    }

    pub fn remove(&mut self, player_id: PlayerId) -> Option<LobbyPlayer> {
        let index = self.queue.iter().position(|p| p.id == player_id)?;
        self.queue.remove(index)
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.queue.iter().any(|p| p.id == player_id)
    }

    /// 1-based position in the queue
    pub fn position(&self, player_id: PlayerId) -> Option<usize> {
        self.queue.iter().position(|p| p.id == player_id).map(|i| i + 1)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
