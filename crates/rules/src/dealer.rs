use okey_core::DEAL_DEALER;
use okey_core::DEAL_OTHERS;
use okey_core::Seat;
use okey_core::TABLE_SEATS;
use okey_tiles::Tile;
use okey_tiles::okey_value;
use rand::Rng;
use rand::seq::SliceRandom;

/// Fisher–Yates shuffle over the caller's RNG.
/// Length and tile multiset are preserved; only order changes.
pub fn shuffle<R: Rng + ?Sized>(tiles: &mut [Tile], rng: &mut R) {
    tiles.shuffle(rng);
}

/// Draws the indicator uniformly from the non-false-joker tiles, removes it
/// from the pool, and flags both copies of the okey identity (same color,
/// value + 1 wrapping 13 → 1).
///
/// Must run before dealing so the okey flags land in hands and deck alike.
pub fn choose_indicator<R: Rng + ?Sized>(tiles: &mut Vec<Tile>, rng: &mut R) -> Tile {
    let candidates = tiles
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_false_joker())
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    let pick = candidates[rng.random_range(0..candidates.len())];
    let indicator = tiles.remove(pick);
    let color = indicator.color();
    let value = okey_value(indicator.value());
    for tile in tiles.iter_mut() {
        if !tile.is_false_joker() && tile.color() == color && tile.value() == value {
            tile.mark_okey();
        }
    }
    indicator
}

/// Deals 15 tiles to the dealer and 14 to each other seat in
/// counter-clockwise order, returning hands indexed by seat and the
/// remaining 48-tile deck.
pub fn deal(mut tiles: Vec<Tile>, dealer: Seat) -> ([Vec<Tile>; TABLE_SEATS], Vec<Tile>) {
    let mut hands: [Vec<Tile>; TABLE_SEATS] = Default::default();
    let mut seat = dealer;
    for i in 0..TABLE_SEATS {
        let count = if i == 0 { DEAL_DEALER } else { DEAL_OTHERS };
        hands[seat.index()] = tiles.drain(..count).collect();
        seat = seat.next();
    }
    // stored bottom-up: popping the deck yields the shuffle order's next tile
    tiles.reverse();
    (hands, tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use okey_core::DECK_AFTER_DEAL;
    use okey_core::FULL_SET;
    use okey_tiles::full_set;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::HashSet;

    #[test]
    fn shuffle_preserves_multiset() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut tiles = full_set();
        shuffle(&mut tiles, &mut rng);
        assert_eq!(tiles.len(), FULL_SET);
        let ids = tiles.iter().map(Tile::id).collect::<HashSet<_>>();
        assert_eq!(ids.len(), FULL_SET);
    }

    #[test]
    fn indicator_marks_both_okey_copies() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut tiles = full_set();
        shuffle(&mut tiles, &mut rng);
        let indicator = choose_indicator(&mut tiles, &mut rng);
        assert!(!indicator.is_false_joker());
        let okeys = tiles.iter().filter(|t| t.is_okey()).collect::<Vec<_>>();
        assert_eq!(okeys.len(), 2);
        for okey in okeys {
            assert_eq!(okey.color(), indicator.color());
            assert_eq!(okey.value(), okey_value(indicator.value()));
        }
        assert_eq!(tiles.len(), FULL_SET - 1);
    }

    #[test]
    fn deal_sizes_and_deck() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut tiles = full_set();
        shuffle(&mut tiles, &mut rng);
        let _ = choose_indicator(&mut tiles, &mut rng);
        let (hands, deck) = deal(tiles, Seat::South);
        assert_eq!(hands[Seat::South.index()].len(), DEAL_DEALER);
        assert_eq!(hands[Seat::East.index()].len(), DEAL_OTHERS);
        assert_eq!(hands[Seat::North.index()].len(), DEAL_OTHERS);
        assert_eq!(hands[Seat::West.index()].len(), DEAL_OTHERS);
        assert_eq!(deck.len(), DECK_AFTER_DEAL);
    }

    #[test]
    fn deal_follows_rotation_from_dealer() {
        let tiles = full_set();
        let first = tiles[0];
        let (hands, _) = deal(tiles, Seat::North);
        assert!(hands[Seat::North.index()].contains(&first));
        assert_eq!(hands[Seat::North.index()].len(), DEAL_DEALER);
        assert_eq!(hands[Seat::East.index()].len(), DEAL_OTHERS);
    }
}
