use okey_tiles::Tile;

/// Heuristic per-tile weights.
///
/// Shared between the discard suggester here and the bot engine, which
/// varies them by difficulty. `dead` scales the penalty for tiles whose
/// remaining copies have all been seen; only the bot memory can know that,
/// so the suggester leaves it unused.
#[derive(Debug, Clone, Copy)]
pub struct Weights {
    pub okey: f32,
    pub meld: f32,
    pub pair: f32,
    pub isolated: f32,
    pub dead: f32,
    /// Marginal utility the discard top must add before drawing it
    /// beats drawing blind from the deck.
    pub draw_threshold: f32,
}

impl Weights {
    pub fn easy() -> Self {
        Self {
            okey: 10.0,
            meld: 3.0,
            pair: 1.0,
            isolated: -1.0,
            dead: 0.0,
            draw_threshold: f32::INFINITY,
        }
    }
    pub fn normal() -> Self {
        Self {
            okey: 12.0,
            meld: 4.0,
            pair: 1.5,
            isolated: -1.0,
            dead: -0.5,
            draw_threshold: 2.0,
        }
    }
    pub fn hard() -> Self {
        Self {
            okey: 14.0,
            meld: 5.0,
            pair: 2.0,
            isolated: -1.5,
            dead: -1.0,
            draw_threshold: 1.5,
        }
    }
    pub fn expert() -> Self {
        Self {
            okey: 16.0,
            meld: 6.0,
            pair: 2.5,
            isolated: -2.0,
            dead: -1.5,
            draw_threshold: 1.0,
        }
    }
}

/// Heuristic value of one tile in the context of a hand.
///
/// Wildcards score the okey weight outright. Natural tiles score for
/// sitting in a completed meld, for adjacency (a same-color neighbor
/// within two values, a same-value tile of another color, or the duplicate
/// copy), and a penalty when fully unconnected.
pub fn tile_utility(hand: &[Tile], tile: &Tile, weights: &Weights) -> f32 {
    if tile.is_wild() {
        return weights.okey;
    }
    if in_completed_meld(hand, tile) {
        weights.meld
    } else if has_adjacent(hand, tile) {
        weights.pair
    } else {
        weights.isolated
    }
}

/// Sum of per-tile utilities.
pub fn hand_utility(hand: &[Tile], weights: &Weights) -> f32 {
    hand.iter().map(|t| tile_utility(hand, t, weights)).sum()
}

/// The least useful discard from a 15-tile hand under the Easy weights.
/// Never the okey; ties break toward the lowest value, then the lowest id.
pub fn suggest_best_discard(hand: &[Tile]) -> Option<Tile> {
    let weights = Weights::easy();
    hand.iter()
        .filter(|t| !t.is_okey())
        .map(|t| (t, tile_utility(hand, t, &weights)))
        .min_by(|(a, ua), (b, ub)| {
            ua.total_cmp(ub)
                .then(a.value().cmp(&b.value()))
                .then(a.id().cmp(&b.id()))
        })
        .map(|(t, _)| *t)
}

fn in_completed_meld(hand: &[Tile], tile: &Tile) -> bool {
    // longest run of distinct consecutive same-color values through the tile
    let mut chain = 1;
    let mut v = tile.value();
    while v > 1 && holds(hand, tile, v - 1) {
        chain += 1;
        v -= 1;
    }
    let mut v = tile.value();
    while v < 13 && holds(hand, tile, v + 1) {
        chain += 1;
        v += 1;
    }
    if chain >= 3 {
        return true;
    }
    // group of three or more distinct colors at the tile's value
    let colors = hand
        .iter()
        .filter(|t| !t.is_wild() && t.value() == tile.value())
        .map(|t| t.color())
        .collect::<std::collections::HashSet<_>>();
    colors.len() >= 3
}

fn has_adjacent(hand: &[Tile], tile: &Tile) -> bool {
    hand.iter().filter(|t| !t.is_wild() && t.id() != tile.id()).any(|t| {
        (t.color() == tile.color() && t.value().abs_diff(tile.value()) <= 2)
            || t.value() == tile.value()
    })
}

fn holds(hand: &[Tile], through: &Tile, value: u8) -> bool {
    hand.iter().any(|t| {
        !t.is_wild() && t.id() != through.id() && t.color() == through.color() && t.value() == value
    })
}
