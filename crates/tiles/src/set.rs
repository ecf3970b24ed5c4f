use super::Color;
use super::Tile;
use okey_core::FULL_SET;

/// Builds the deterministic 106-tile set with stable ids.
///
/// Ids 0..=103 enumerate colors in canonical order, values 1..=13, two
/// copies each; ids 104 and 105 are the false jokers. The same id always
/// names the same physical tile, which is what makes the commitment's
/// serialized order meaningful.
pub fn full_set() -> Vec<Tile> {
    let mut tiles = Vec::with_capacity(FULL_SET);
    let mut id = 0u8;
    for _copy in 0..2 {
        for color in Color::all() {
            for value in 1..=13u8 {
                tiles.push(Tile::new(id, color, value));
                id += 1;
            }
        }
    }
    tiles.push(Tile::false_joker(id));
    tiles.push(Tile::false_joker(id + 1));
    tiles
}

/// The value the okey takes given an indicator value (13 wraps to 1).
pub fn okey_value(indicator: u8) -> u8 {
    (indicator % 13) + 1
}

/// Sorts a hand by color, then value. Idempotent.
pub fn sort_by_color(hand: &mut [Tile]) {
    hand.sort_by_key(|t| (t.is_false_joker(), t.color(), t.value(), t.id()));
}

/// Sorts a hand by value, then color. Idempotent.
pub fn sort_by_value(hand: &mut [Tile]) {
    hand.sort_by_key(|t| (t.is_false_joker(), t.value(), t.color(), t.id()));
}
