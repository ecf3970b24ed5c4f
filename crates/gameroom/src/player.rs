use crate::ConnId;
use crate::PlayerId;
use okey_bots::Bot;
use okey_bots::Difficulty;
use okey_core::Seat;
use okey_database::User;
use okey_tiles::Tile;
use okey_tiles::TileId;
use tokio::time::Instant;

/// One occupied seat.
///
/// Humans carry a connection id and reconnect bookkeeping; bots carry a
/// live decision maker instead. The player id is stable across reconnects
/// (it is the user id for humans).
pub struct SeatedPlayer {
    id: PlayerId,
    display_name: String,
    seat: Seat,
    hand: Vec<Tile>,
    conn: Option<ConnId>,
    connected: bool,
    disconnected_at: Option<Instant>,
    has_drawn: bool,
    bot: Option<Bot>,
}

impl SeatedPlayer {
    pub fn human(id: PlayerId, display_name: &str, seat: Seat, conn: ConnId) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            seat,
            hand: Vec::new(),
            conn: Some(conn),
            connected: true,
            disconnected_at: None,
            has_drawn: false,
            bot: None,
        }
    }
    pub fn bot(seat: Seat, difficulty: Difficulty, ordinal: usize) -> Self {
        Self {
            id: PlayerId::default(),
            display_name: format!("Bot {}", ordinal),
            seat,
            hand: Vec::new(),
            conn: None,
            connected: true,
            disconnected_at: None,
            has_drawn: false,
            bot: Some(Bot::new(difficulty)),
        }
    }
    pub fn id(&self) -> PlayerId {
        self.id
    }
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
    pub fn seat(&self) -> Seat {
        self.seat
    }
    pub fn hand(&self) -> &[Tile] {
        &self.hand
    }
    pub fn hand_mut(&mut self) -> &mut Vec<Tile> {
        &mut self.hand
    }
    pub fn conn(&self) -> Option<ConnId> {
        self.conn
    }
    pub fn connected(&self) -> bool {
        self.connected
    }
    pub fn disconnected_at(&self) -> Option<Instant> {
        self.disconnected_at
    }
    pub fn has_drawn(&self) -> bool {
        self.has_drawn
    }
    pub fn set_has_drawn(&mut self, drawn: bool) {
        self.has_drawn = drawn;
    }
    pub fn is_bot(&self) -> bool {
        self.bot.is_some()
    }
    pub fn bot_ref(&self) -> Option<&Bot> {
        self.bot.as_ref()
    }
    pub fn bot_mut(&mut self) -> Option<&mut Bot> {
        self.bot.as_mut()
    }
    /// The persistent account behind a human seat.
    pub fn user_id(&self) -> Option<okey_core::ID<User>> {
        (!self.is_bot()).then(|| self.id.cast())
    }
    /// Tiles the winner scores a point for when this hand is stranded.
    pub fn wilds_left(&self) -> usize {
        self.hand.iter().filter(|t| t.is_wild()).count()
    }
    pub fn holds(&self, tile: TileId) -> bool {
        self.hand.iter().any(|t| t.id() == tile)
    }
    /// Removes and returns a tile from the hand by id.
    pub fn take(&mut self, tile: TileId) -> Option<Tile> {
        let index = self.hand.iter().position(|t| t.id() == tile)?;
        Some(self.hand.remove(index))
    }
    pub fn mark_disconnected(&mut self) {
        self.connected = false;
        self.conn = None;
        self.disconnected_at = Some(Instant::now());
    }
    pub fn mark_reconnected(&mut self, conn: ConnId) {
        self.connected = true;
        self.conn = Some(conn);
        self.disconnected_at = None;
    }
}
