use okey_core::Seat;
use okey_tiles::Color;
use okey_tiles::Tile;

/// What one bot has legitimately observed.
///
/// Counts per (color, value) are capped at 2, the number of physical
/// copies. The bot sees its own hand, every discard, and the indicator;
/// it never sees opponents' hands or the deck.
#[derive(Debug, Default, Clone)]
pub struct Memory {
    seen: [[u8; 14]; 4],
    pickups: [Option<Tile>; 4],
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }
    /// Records a tile the bot has seen face-up.
    pub fn observe(&mut self, tile: &Tile) {
        if tile.is_false_joker() {
            return;
        }
        let cell = &mut self.seen[tile.color() as usize][tile.value() as usize];
        *cell = (*cell + 1).min(2);
    }
    /// Records a whole hand at once.
    pub fn observe_hand(&mut self, hand: &[Tile]) {
        for tile in hand {
            self.observe(tile);
        }
    }
    /// Records that a seat took the top of the discard pile.
    /// That seat is now known to value tiles adjacent to the one it took.
    pub fn observe_pickup(&mut self, seat: Seat, tile: &Tile) {
        self.pickups[seat.index()] = Some(*tile);
    }
    /// Probability that a copy of (color, value) is still hidden:
    /// (2 - seen) / 2.
    pub fn availability(&self, color: Color, value: u8) -> f32 {
        let seen = self.seen[color as usize][value as usize];
        f32::from(2 - seen) / 2.0
    }
    /// How many copies of (color, value) the bot has seen.
    pub fn seen(&self, color: Color, value: u8) -> u8 {
        self.seen[color as usize][value as usize]
    }
    /// The last tile a seat picked up from the discard pile, if any.
    pub fn pickup(&self, seat: Seat) -> Option<&Tile> {
        self.pickups[seat.index()].as_ref()
    }
    /// Whether discarding this tile would feed a seat that showed interest
    /// in tiles adjacent to it.
    pub fn feeds(&self, seat: Seat, tile: &Tile) -> bool {
        self.pickup(seat).is_some_and(|taken| {
            !taken.is_wild()
                && !tile.is_wild()
                && taken.color() == tile.color()
                && taken.value().abs_diff(tile.value()) <= 2
        })
    }
}
