use crate::ConnId;
use crate::GameView;
use crate::PlayerId;
use okey_core::Chips;
use okey_core::TurnNumber;
use okey_fairness::Reveal;
use okey_tiles::Tile;
use okey_tiles::TileId;

/// Messages sent from server to client over the transport.
///
/// Variant and field names are wire-stable: existing clients dispatch on
/// the `type` tag and these exact payload keys.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        id: String,
        name: String,
        stake: Chips,
        current_player_count: usize,
        max_players: usize,
        is_game_started: bool,
    },
    #[serde(rename_all = "camelCase")]
    OnPlayerJoined {
        player_id: PlayerId,
        player_name: String,
        position: u8,
        total_players: usize,
    },
    #[serde(rename_all = "camelCase")]
    OnPlayerLeft {
        player_id: PlayerId,
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    OnGameStarted {
        room_id: String,
        initial_state: GameView,
        server_seed_hash: String,
    },
    #[serde(rename_all = "camelCase")]
    OnGameStateUpdated {
        game_state: GameView,
    },
    /// Caller-only: the drawn tile's identity.
    #[serde(rename_all = "camelCase")]
    OnTileDrawn {
        tile: Tile,
        from_discard: bool,
        timestamp: i64,
    },
    /// Everyone else: only the fact of the draw.
    #[serde(rename_all = "camelCase")]
    OnOpponentDrewTile {
        player_id: PlayerId,
        from_discard: bool,
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    OnTileDiscarded {
        player_id: PlayerId,
        tile_id: TileId,
        tile: Tile,
        next_turn_player_id: Option<PlayerId>,
        next_turn_position: u8,
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    OnDeckUpdated {
        remaining_tile_count: usize,
        discard_pile_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    OnTurnChanged {
        player_id: PlayerId,
        player_name: String,
        position: u8,
        time_left: u64,
        turn_number: TurnNumber,
        turn_phase: String,
    },
    #[serde(rename_all = "camelCase")]
    OnTurnTimerTick {
        player_id: PlayerId,
        time_left: u64,
        is_critical: bool,
    },
    #[serde(rename_all = "camelCase")]
    OnAutoPlayTriggered {
        player_id: PlayerId,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    OnPlayerTimeout {
        player_id: PlayerId,
        turn_number: TurnNumber,
    },
    #[serde(rename_all = "camelCase")]
    OnGamePhaseChanged {
        old_phase: String,
        new_phase: String,
    },
    #[serde(rename_all = "camelCase")]
    OnPlayerDisconnected {
        player_id: PlayerId,
        reconnection_timeout_seconds: u64,
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    OnPlayerReconnected {
        player_id: PlayerId,
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    OnReconnected {
        room_id: String,
        game_state: GameView,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    OnRoomLeft {
        room_id: String,
    },
    #[serde(rename_all = "camelCase")]
    OnGameEnded {
        winner_id: Option<PlayerId>,
        win_type: Option<String>,
        win_score: Option<i32>,
        timestamp: i64,
    },
    /// The post-game commitment reveal, verifiable by any observer.
    #[serde(rename_all = "camelCase")]
    OnShuffleRevealed {
        game_history_id: String,
        reveal: Reveal,
    },
    #[serde(rename_all = "camelCase")]
    OnError {
        kind: String,
        message: String,
        timestamp: i64,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialize server message")
    }
    pub fn error(error: &crate::GameError) -> Self {
        Self::OnError {
            kind: error.kind().to_string(),
            message: error.to_string(),
            timestamp: now_millis(),
        }
    }
}

/// Server timestamp in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Where an outbound message goes: one connection or the whole room group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Connection(ConnId),
    Group,
}

/// A routed outbound message, consumed by the transport bridge.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub target: Target,
    pub message: ServerMessage,
}
