use crate::PlayerId;
use okey_tiles::Tile;

/// What one player is allowed to see.
///
/// Own tiles in full; opponents reduced to identity and tile count. This
/// struct is the only shape hands ever leave the room in, so there is no
/// code path that could leak an opponent's tiles.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub room_id: String,
    pub phase: String,
    pub turn_phase: String,
    pub hand: Vec<Tile>,
    pub opponents: Vec<OpponentView>,
    pub indicator: Option<Tile>,
    pub current_turn_player_id: Option<PlayerId>,
    pub current_turn_position: u8,
    pub deck_count: usize,
    pub discard_top: Option<Tile>,
    pub commitment_hash: Option<String>,
    pub timestamp: i64,
}

/// An opponent as projected: never their tiles, only how many.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentView {
    pub player_id: PlayerId,
    pub display_name: String,
    pub position: u8,
    pub tile_count: usize,
}
