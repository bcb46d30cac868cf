use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::game::constants::matchmaking::{DEFAULT_NAME, MAX_NAME_LENGTH};
use crate::game::state::{
    Character, EntityId, Fish, InkCloud, Jellyfish, Octopus, Player, PlayerId, Seahorse, Shark,
    Side, SpawnWarning, World,
};
use crate::lobby::RoomId;
use crate::util::vec2::{round_to, Vec2};

/// Messages from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// Enter the matchmaking queue
    #[serde(rename_all = "camelCase")]
    FindMatch { character: String, player_name: String },
    /// Movement input for the current frame
    PlayerInput(PlayerInput),
    /// Leave the queue or current room
    Leave,
}

/// Messages from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent to each paired player
    #[serde(rename_all = "camelCase")]
    MatchFound {
        room_id: RoomId,
        player_id: PlayerId,
        night_mode: bool,
    },
    /// Room countdown has begun
    #[serde(rename_all = "camelCase")]
    GameStarted { night_mode: bool, countdown_ms: u64 },
    /// Recipient ate a fish
    FishEaten { score: u32 },
    /// Recipient picked up a seahorse
    SeahorseCollected { score: u32 },
    /// Recipient picked up an octopus
    OctopusCollected { score: u32 },
    /// Periodic full snapshot
    GameState(GameSnapshot),
    /// A player disconnected or left
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: PlayerId, player_count: u32 },
    /// Malformed request
    Error { reason: String },
}

/// Input frame. Keys and joystick add up; the joystick is capped at unit length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    #[serde(default)]
    pub joystick: Vec2,
}

impl PlayerInput {
    /// Combined direction from keys and joystick, before any scaling
    pub fn direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.left {
            dir.x -= 1.0;
        }
        if self.right {
            dir.x += 1.0;
        }
        if self.up {
            dir.y -= 1.0;
        }
        if self.down {
            dir.y += 1.0;
        }
        dir
    }
}

/// Full room state for one broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub tick: u64,
    /// Server wall clock (ms since the unix epoch) for client interpolation
    pub server_time: u64,
    pub players: Vec<PlayerSnapshot>,
    pub fish: Vec<FishSnapshot>,
    pub sharks: Vec<SharkSnapshot>,
    pub jellyfish: Vec<JellyfishSnapshot>,
    pub seahorses: Vec<SeahorseSnapshot>,
    pub octopuses: Vec<OctopusSnapshot>,
    pub ink_clouds: Vec<InkCloudSnapshot>,
    pub warnings: Vec<SpawnWarningSnapshot>,
    pub mega_shark_active: bool,
}

impl GameSnapshot {
    pub fn from_world(world: &World, tick: u64, server_time: u64) -> Self {
        let mut players: Vec<PlayerSnapshot> =
            world.players.values().map(PlayerSnapshot::from_player).collect();
        // map order is arbitrary; keep the wire order stable between snapshots
        players.sort_by_key(|p| p.id);

        Self {
            tick,
            server_time,
            players,
            fish: world.fish.iter().map(FishSnapshot::from_fish).collect(),
            sharks: world.sharks.iter().map(SharkSnapshot::from_shark).collect(),
            jellyfish: world
                .jellyfish
                .iter()
                .map(JellyfishSnapshot::from_jellyfish)
                .collect(),
            seahorses: world
                .seahorses
                .iter()
                .map(SeahorseSnapshot::from_seahorse)
                .collect(),
            octopuses: world
                .octopuses
                .iter()
                .map(OctopusSnapshot::from_octopus)
                .collect(),
            ink_clouds: world
                .ink_clouds
                .iter()
                .map(InkCloudSnapshot::from_ink_cloud)
                .collect(),
            warnings: world
                .warnings
                .iter()
                .map(SpawnWarningSnapshot::from_warning)
                .collect(),
            mega_shark_active: world.escalation.mega_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub character: Character,
    pub position: Vec2,
    pub rotation: f32,
    pub score: u32,
    pub alive: bool,
    pub spawn_protection: bool,
    pub slow_motion: bool,
}

impl PlayerSnapshot {
    pub fn from_player(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            character: player.character,
            position: player.position.rounded(),
            rotation: round_to(player.rotation, 2),
            score: player.score,
            alive: player.alive,
            spawn_protection: player.has_spawn_protection(),
            slow_motion: player.in_slow_motion(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FishSnapshot {
    pub id: EntityId,
    pub position: Vec2,
    pub size: f32,
    pub visual_type: u8,
    pub color: String,
}

impl FishSnapshot {
    pub fn from_fish(fish: &Fish) -> Self {
        Self {
            id: fish.id,
            position: fish.position.rounded(),
            size: round_to(fish.size, 1),
            visual_type: fish.visual_type,
            color: fish.color.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharkSnapshot {
    pub id: EntityId,
    pub position: Vec2,
    pub rotation: f32,
    pub size: f32,
    pub is_mega_shark: bool,
    pub confused: bool,
    pub escaping: bool,
}

impl SharkSnapshot {
    pub fn from_shark(shark: &Shark) -> Self {
        Self {
            id: shark.id,
            position: shark.position.rounded(),
            rotation: round_to(shark.rotation, 2),
            size: round_to(shark.size, 1),
            is_mega_shark: shark.is_mega,
            confused: shark.is_confused(),
            escaping: shark.is_escaping(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JellyfishSnapshot {
    pub id: EntityId,
    pub position: Vec2,
    pub size: f32,
    pub tentacles: u8,
    pub wobble_phase: f32,
}

impl JellyfishSnapshot {
    pub fn from_jellyfish(jelly: &Jellyfish) -> Self {
        Self {
            id: jelly.id,
            position: jelly.position.rounded(),
            size: jelly.size,
            tentacles: jelly.tentacles,
            wobble_phase: round_to(jelly.wobble_phase, 2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeahorseSnapshot {
    pub id: EntityId,
    pub position: Vec2,
    pub facing_left: bool,
}

impl SeahorseSnapshot {
    pub fn from_seahorse(seahorse: &Seahorse) -> Self {
        Self {
            id: seahorse.id,
            position: seahorse.position.rounded(),
            facing_left: seahorse.velocity.x < 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OctopusSnapshot {
    pub id: EntityId,
    pub position: Vec2,
    pub rotation: f32,
}

impl OctopusSnapshot {
    pub fn from_octopus(octopus: &Octopus) -> Self {
        Self {
            id: octopus.id,
            position: octopus.position.rounded(),
            rotation: round_to(octopus.velocity.angle(), 2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InkCloudSnapshot {
    pub id: EntityId,
    pub position: Vec2,
    pub radius: f32,
    /// Remaining lifetime fraction, 0..=1
    pub strength: f32,
}

impl InkCloudSnapshot {
    pub fn from_ink_cloud(cloud: &InkCloud) -> Self {
        Self {
            id: cloud.id,
            position: cloud.position.rounded(),
            radius: cloud.radius,
            strength: round_to(cloud.strength(), 2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnWarningSnapshot {
    pub id: EntityId,
    pub side: Side,
    pub position: Vec2,
    pub opacity: f32,
}

impl SpawnWarningSnapshot {
    pub fn from_warning(warning: &SpawnWarning) -> Self {
        Self {
            id: warning.id,
            side: warning.side,
            position: warning.position.rounded(),
            opacity: round_to(warning.opacity, 2),
        }
    }
}

/// Milliseconds since the unix epoch
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Clean up a display name: strip control and markup characters, collapse
/// whitespace, cap the length, fall back to the default name when empty
pub fn sanitize_player_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | '&' | '"' | '\''))
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(MAX_NAME_LENGTH).collect();
    let trimmed = truncated.trim();

    if trimmed.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Encode a message using bincode
/// Uses legacy config for fixed-size integers (compatible with TypeScript client)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message using bincode
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    bincode::serde::decode_from_slice(data, bincode::config::legacy())
        .map(|(msg, _)| msg)
        .map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{SharkMode, World};
    use uuid::Uuid;

    fn sample_world() -> World {
        let mut world = World::new(1200.0, 800.0);
        let mut player = Player::new(
            Uuid::new_v4(),
            "Shelly".to_string(),
            Character::Penguin,
            Vec2::new(100.04, 200.06),
        );
        player.rotation = 1.23456;
        world.add_player(player);

        let mut shark = Shark::new(7, Vec2::new(10.0, 20.0), 2.0, 70.0);
        shark.is_mega = true;
        shark.mode = SharkMode::Confused { ticks_remaining: 5 };
        world.sharks.push(shark);
        world.escalation.mega_active = true;
        world
    }

    #[test]
    fn test_find_match_roundtrip() {
        let msg = ClientMessage::FindMatch {
            character: "crab".to_string(),
            player_name: "Pinchy".to_string(),
        };
        let encoded = encode(&msg).unwrap();
        let decoded: ClientMessage = decode(&encoded).unwrap();
        match decoded {
            ClientMessage::FindMatch {
                character,
                player_name,
            } => {
                assert_eq!(character, "crab");
                assert_eq!(player_name, "Pinchy");
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_player_input_roundtrip() {
        let input = PlayerInput {
            left: true,
            up: true,
            joystick: Vec2::new(0.5, -0.25),
            ..Default::default()
        };
        let encoded = encode(&ClientMessage::PlayerInput(input)).unwrap();
        match decode::<ClientMessage>(&encoded).unwrap() {
            ClientMessage::PlayerInput(i) => assert_eq!(i, input),
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_input_direction_from_keys() {
        let input = PlayerInput {
            right: true,
            down: true,
            ..Default::default()
        };
        assert_eq!(input.direction(), Vec2::new(1.0, 1.0));

        let opposed = PlayerInput {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(opposed.direction(), Vec2::ZERO);
    }

    #[test]
    fn test_snapshot_rounds_positions_and_rotation() {
        let snapshot = GameSnapshot::from_world(&sample_world(), 3, 1000);
        let p = &snapshot.players[0];
        assert_eq!(p.position, Vec2::new(100.0, 200.1));
        assert!((p.rotation - 1.23).abs() < 1e-6);
        assert!(p.spawn_protection);
        assert!(snapshot.mega_shark_active);
        assert!(snapshot.sharks[0].is_mega_shark);
        assert!(snapshot.sharks[0].confused);
    }

    #[test]
    fn test_snapshot_bincode_roundtrip() {
        let snapshot = GameSnapshot::from_world(&sample_world(), 42, 1234);
        let encoded = encode(&ServerMessage::GameState(snapshot)).unwrap();
        match decode::<ServerMessage>(&encoded).unwrap() {
            ServerMessage::GameState(s) => {
                assert_eq!(s.tick, 42);
                assert_eq!(s.server_time, 1234);
                assert_eq!(s.players.len(), 1);
                assert_eq!(s.players[0].name, "Shelly");
                assert_eq!(s.players[0].character, Character::Penguin);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_snapshot_json_field_names() {
        let snapshot = GameSnapshot::from_world(&sample_world(), 1, 1);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert!(json.get("serverTime").is_some());
        assert!(json.get("inkClouds").is_some());
        assert!(json.get("megaSharkActive").is_some());
        assert!(json["sharks"][0].get("isMegaShark").is_some());
        assert!(json["players"][0].get("spawnProtection").is_some());
        assert_eq!(json["players"][0]["character"], "penguin");
    }

    #[test]
    fn test_server_message_json_variant_names() {
        let msg = ServerMessage::PlayerLeft {
            player_id: Uuid::nil(),
            player_count: 1,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["playerLeft"]["playerCount"], 1);
    }

    #[test]
    fn test_sanitize_player_name() {
        assert_eq!(sanitize_player_name("  Shelly  "), "Shelly");
        assert_eq!(sanitize_player_name("<b>Bob</b>"), "bBob/b");
        assert_eq!(sanitize_player_name("a \t\n b"), "a b");
        assert_eq!(sanitize_player_name(""), DEFAULT_NAME);
        assert_eq!(sanitize_player_name("   "), DEFAULT_NAME);
        assert_eq!(
            sanitize_player_name("abcdefghijklmnopqrstuvwxyz").chars().count(),
            MAX_NAME_LENGTH
        );
    }

    #[test]
    fn test_invalid_decode() {
        let garbage = vec![0xFF, 0xFE, 0xFD];
        let result: Result<ClientMessage, _> = decode(&garbage);
        assert!(result.is_err());
    }
}
