use crate::Difficulty;
use crate::Memory;
use okey_core::Seat;
use okey_rules::Win;
use okey_rules::check_winning_hand;
use okey_rules::hand_utility;
use okey_rules::tile_utility;
use okey_tiles::Tile;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::time::Duration;

/// Where to draw this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawSource {
    Deck,
    Discard,
}

/// Outcome of a discard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Discard(Tile),
    DeclareWin(Win),
}

/// A stateful per-seat decision maker.
pub struct Bot {
    difficulty: Difficulty,
    memory: Memory,
    rng: SmallRng,
}

impl Bot {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            memory: Memory::new(),
            rng: SmallRng::from_os_rng(),
        }
    }
    /// The transient auto-play grade.
    pub fn easy() -> Self {
        Self::new(Difficulty::Easy)
    }
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
    pub fn memory(&self) -> &Memory {
        &self.memory
    }
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }
    /// Simulated thinking time; decisions are delayed by this much before
    /// they hit the table.
    pub fn think_time(&mut self) -> Duration {
        let (lo, hi) = self.difficulty.think_bounds();
        Duration::from_secs_f32(self.rng.random_range(lo..hi))
    }
}

impl Bot {
    /// Chooses the draw source for a 14-tile hand.
    ///
    /// The visible discard top is taken only when its marginal utility
    /// clears the difficulty threshold; a tile that completes a meld is
    /// always taken, which is the only case the Easy grade takes at all.
    pub fn decide_draw(&self, hand: &[Tile], discard_top: Option<&Tile>) -> DrawSource {
        let Some(tile) = discard_top else {
            return DrawSource::Deck;
        };
        let weights = self.difficulty.weights();
        let mut with = hand.to_vec();
        with.push(*tile);
        if tile_utility(&with, tile, &weights) >= weights.meld {
            return DrawSource::Discard;
        }
        let marginal = hand_utility(&with, &weights) - hand_utility(hand, &weights);
        if marginal >= weights.draw_threshold {
            DrawSource::Discard
        } else {
            DrawSource::Deck
        }
    }
    /// Chooses the discard from a 15-tile hand, or declares the win when
    /// the hand is complete. Never throws the okey.
    ///
    /// The Easy grade is exactly the rule engine's suggester; higher grades
    /// fold their seen-tile memory into the utility.
    pub fn decide_discard(&self, hand: &[Tile]) -> Decision {
        if let Some(win) = check_winning_hand(hand).win() {
            return Decision::DeclareWin(win);
        }
        if self.difficulty == Difficulty::Easy {
            let discard = okey_rules::suggest_best_discard(hand)
                .expect("a 15-tile hand holds at most two okeys");
            return Decision::Discard(discard);
        }
        let discard = hand
            .iter()
            .filter(|t| !t.is_okey())
            .map(|t| (t, self.adjusted_utility(hand, t)))
            .min_by(|(a, ua), (b, ub)| {
                ua.total_cmp(ub)
                    .then(a.value().cmp(&b.value()))
                    .then(a.id().cmp(&b.id()))
            })
            .map(|(t, _)| *t)
            .expect("a 15-tile hand holds at most two okeys");
        Decision::Discard(discard)
    }
    /// Tile utility with the memory terms: faces whose remaining copies
    /// have all been seen lose their pairing upside, and a tile adjacent
    /// to one an opponent fished off the discard pile is scored as if it
    /// still paired for us, so it stays in hand instead of feeding them.
    fn adjusted_utility(&self, hand: &[Tile], tile: &Tile) -> f32 {
        let weights = self.difficulty.weights();
        let base = tile_utility(hand, tile, &weights);
        if tile.is_wild() {
            return base;
        }
        let deadness = 1.0 - self.memory.availability(tile.color(), tile.value());
        let mut utility = base + weights.dead * deadness;
        if Seat::all().into_iter().any(|seat| self.memory.feeds(seat, tile)) {
            utility += weights.pair;
        }
        utility
    }
}
