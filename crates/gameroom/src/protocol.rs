use crate::Command;
use crate::PlayerId;
use okey_bots::Difficulty;
use okey_core::Chips;
use okey_tiles::TileId;

/// Errors that can occur while decoding client traffic.
#[derive(Debug, Clone)]
pub enum ProtocolError {
    InvalidIntent(String),
    InvalidDifficulty(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIntent(s) => write!(f, "invalid intent: {}", s),
            Self::InvalidDifficulty(s) => write!(f, "invalid difficulty: {}", s),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Client → server intents. Names are wire-stable.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientIntent {
    #[serde(rename_all = "camelCase")]
    CreateRoom { name: String, stake: Chips },
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: uuid::Uuid },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: uuid::Uuid },
    #[serde(rename_all = "camelCase")]
    StartGame { room_id: uuid::Uuid },
    #[serde(rename_all = "camelCase")]
    StartGameWithBots { room_id: uuid::Uuid, difficulty: String },
    #[serde(rename_all = "camelCase")]
    DrawTile { room_id: uuid::Uuid },
    #[serde(rename_all = "camelCase")]
    DrawFromDiscard { room_id: uuid::Uuid },
    #[serde(rename_all = "camelCase")]
    ThrowTile { room_id: uuid::Uuid, tile_id: TileId },
    #[serde(rename_all = "camelCase")]
    DeclareWin {
        room_id: uuid::Uuid,
        discard_tile_id: TileId,
    },
    #[serde(rename_all = "camelCase")]
    SetClientSeed { room_id: uuid::Uuid, seed: String },
}

impl ClientIntent {
    /// The room an intent addresses; `CreateRoom` has none yet.
    pub fn room_id(&self) -> Option<uuid::Uuid> {
        match self {
            Self::CreateRoom { .. } => None,
            Self::JoinRoom { room_id }
            | Self::LeaveRoom { room_id }
            | Self::StartGame { room_id }
            | Self::StartGameWithBots { room_id, .. }
            | Self::DrawTile { room_id }
            | Self::DrawFromDiscard { room_id }
            | Self::ThrowTile { room_id, .. }
            | Self::DeclareWin { room_id, .. }
            | Self::SetClientSeed { room_id, .. } => Some(*room_id),
        }
    }
}

/// The protocol seam between wire text and typed room commands.
pub struct Protocol;

impl Protocol {
    /// Parses a client JSON frame into an intent.
    pub fn decode(s: &str) -> Result<ClientIntent, ProtocolError> {
        serde_json::from_str(s).map_err(|e| ProtocolError::InvalidIntent(e.to_string()))
    }
    /// Translates an in-room intent into a room command for `player`.
    /// Lobby-level intents (create, join) return None; they need the lobby.
    pub fn command(intent: &ClientIntent, player: PlayerId) -> Result<Option<Command>, ProtocolError> {
        let command = match intent {
            ClientIntent::CreateRoom { .. } | ClientIntent::JoinRoom { .. } => None,
            ClientIntent::LeaveRoom { .. } => Some(Command::Leave { player }),
            ClientIntent::StartGame { .. } => Some(Command::Start {
                player,
                difficulty: Difficulty::Normal,
            }),
            ClientIntent::StartGameWithBots { difficulty, .. } => Some(Command::Start {
                player,
                difficulty: Difficulty::try_from(difficulty.as_str())
                    .map_err(ProtocolError::InvalidDifficulty)?,
            }),
            ClientIntent::DrawTile { .. } => Some(Command::Draw {
                player,
                from_discard: false,
            }),
            ClientIntent::DrawFromDiscard { .. } => Some(Command::Draw {
                player,
                from_discard: true,
            }),
            ClientIntent::ThrowTile { tile_id, .. } => Some(Command::Discard {
                player,
                tile: *tile_id,
            }),
            ClientIntent::DeclareWin {
                discard_tile_id, ..
            } => Some(Command::DeclareWin {
                player,
                tile: *discard_tile_id,
            }),
            ClientIntent::SetClientSeed { seed, .. } => Some(Command::SetClientSeed {
                player,
                seed: seed.clone(),
            }),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_draw_intent() {
        let intent = Protocol::decode(
            r#"{"type":"DrawTile","roomId":"0188a570-f2b4-7bc2-a55f-5a3f5f2f3a11"}"#,
        )
        .expect("valid intent");
        assert!(matches!(intent, ClientIntent::DrawTile { .. }));
        assert!(intent.room_id().is_some());
    }

    #[test]
    fn decode_throw_tile_keys() {
        let intent = Protocol::decode(
            r#"{"type":"ThrowTile","roomId":"0188a570-f2b4-7bc2-a55f-5a3f5f2f3a11","tileId":42}"#,
        )
        .expect("valid intent");
        match intent {
            ClientIntent::ThrowTile { tile_id, .. } => assert_eq!(tile_id, 42),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Protocol::decode("not json").is_err());
        assert!(Protocol::decode(r#"{"type":"NoSuchIntent"}"#).is_err());
    }

    #[test]
    fn command_translation() {
        let player = PlayerId::default();
        let intent = Protocol::decode(
            r#"{"type":"StartGameWithBots","roomId":"0188a570-f2b4-7bc2-a55f-5a3f5f2f3a11","difficulty":"Hard"}"#,
        )
        .expect("valid intent");
        match Protocol::command(&intent, player).expect("translates") {
            Some(Command::Start { difficulty, .. }) => assert_eq!(difficulty, Difficulty::Hard),
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn create_room_is_lobby_level() {
        let intent = Protocol::decode(r#"{"type":"CreateRoom","name":"masa","stake":100}"#)
            .expect("valid intent");
        assert!(intent.room_id().is_none());
        assert!(
            Protocol::command(&intent, PlayerId::default())
                .expect("translates")
                .is_none()
        );
    }
}
