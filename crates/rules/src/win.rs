use crate::score_win;
use okey_tiles::Tile;

/// How a hand was completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WinKind {
    /// 14 tiles partitioned into runs and groups.
    Normal,
    /// Seven disjoint pairs.
    Pairs,
    /// Partitioned hand finished by discarding the okey itself.
    OkeyDiscard,
}

/// A confirmed win: the kind and the mandatory discard completing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Win {
    pub kind: WinKind,
    pub discard: Tile,
}

/// Why a 15-tile hand does not win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotWinning {
    WrongHandSize,
    NoPartition,
}

/// Outcome of a winning-hand check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinCheck {
    Winning(Win),
    NotWinning(NotWinning),
}

impl WinCheck {
    pub fn win(&self) -> Option<Win> {
        match self {
            WinCheck::Winning(win) => Some(*win),
            WinCheck::NotWinning(_) => None,
        }
    }
}

/// Checks whether a 15-tile hand wins.
///
/// Tries every tile as the mandatory discard: the kept 14 must partition
/// into valid melds (normal win, or okey-discard when the discard is the
/// okey itself) or form seven disjoint pairs. When several discards win,
/// the highest-scoring kind is preferred, then the lowest discard value,
/// then the lowest id for determinism.
pub fn check_winning_hand(hand: &[Tile]) -> WinCheck {
    if hand.len() != 15 {
        return WinCheck::NotWinning(NotWinning::WrongHandSize);
    }
    let mut best: Option<Win> = None;
    for (i, discard) in hand.iter().enumerate() {
        let kept = hand
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, t)| *t)
            .collect::<Vec<_>>();
        if partitions(&kept) {
            let kind = if discard.is_okey() {
                WinKind::OkeyDiscard
            } else {
                WinKind::Normal
            };
            consider(&mut best, Win { kind, discard: *discard });
        }
        if seven_pairs(&kept) {
            consider(
                &mut best,
                Win {
                    kind: WinKind::Pairs,
                    discard: *discard,
                },
            );
        }
    }
    match best {
        Some(win) => WinCheck::Winning(win),
        None => WinCheck::NotWinning(NotWinning::NoPartition),
    }
}

/// Whether discarding this exact tile completes the hand, and how.
/// This is the declare-win check: the discard is the player's choice, not
/// the engine's.
pub fn wins_with_discard(hand: &[Tile], discard: okey_tiles::TileId) -> Option<WinKind> {
    if hand.len() != 15 {
        return None;
    }
    let tile = hand.iter().find(|t| t.id() == discard)?;
    let kept = hand
        .iter()
        .filter(|t| t.id() != discard)
        .copied()
        .collect::<Vec<_>>();
    if partitions(&kept) {
        Some(if tile.is_okey() {
            WinKind::OkeyDiscard
        } else {
            WinKind::Normal
        })
    } else if seven_pairs(&kept) {
        Some(WinKind::Pairs)
    } else {
        None
    }
}

fn consider(best: &mut Option<Win>, candidate: Win) {
    let better = match best {
        None => true,
        Some(win) => {
            let (a, b) = (score_win(candidate.kind), score_win(win.kind));
            a > b
                || (a == b
                    && (candidate.discard.value(), candidate.discard.id())
                        < (win.discard.value(), win.discard.id()))
        }
    };
    if better {
        *best = Some(candidate);
    }
}

/// Tile counts per (color, value), 1-based values.
type Counts = [[u8; 14]; 4];

/// Whether 14 tiles partition completely into valid melds.
fn partitions(kept: &[Tile]) -> bool {
    let mut counts: Counts = [[0; 14]; 4];
    let mut wilds = 0u8;
    for tile in kept {
        if tile.is_wild() {
            wilds += 1;
        } else {
            counts[tile.color() as usize][tile.value() as usize] += 1;
        }
    }
    solve(&mut counts, wilds)
}

/// Backtracking exact cover: every meld must consume the first remaining
/// natural tile, so the search never revisits an uncovered prefix.
fn solve(counts: &mut Counts, wilds: u8) -> bool {
    let Some((c, v)) = first(counts) else {
        // leftover wildcards must themselves form a meld of three or more
        return wilds == 0 || wilds >= 3;
    };
    counts[c][v] -= 1;
    if groups(counts, wilds, c, v) || runs(counts, wilds, c, v) {
        counts[c][v] += 1;
        return true;
    }
    counts[c][v] += 1;
    false
}

fn first(counts: &Counts) -> Option<(usize, usize)> {
    for c in 0..4 {
        for v in 1..14 {
            if counts[c][v] > 0 {
                return Some((c, v));
            }
        }
    }
    None
}

/// Groups holding (c, v): distinct other colors at the same value plus
/// wildcards, total size 3 or 4.
fn groups(counts: &mut Counts, wilds: u8, c: usize, v: usize) -> bool {
    for size in [3usize, 4] {
        for mask in 0u8..8 {
            let others = (0..3usize)
                .filter(|b| mask & (1 << b) != 0)
                .map(|b| (0..4usize).filter(|&o| o != c).nth(b).unwrap())
                .collect::<Vec<_>>();
            let k = match (size - 1).checked_sub(others.len()) {
                Some(k) if k as u8 <= wilds => k as u8,
                _ => continue,
            };
            if others.iter().any(|&o| counts[o][v] == 0) {
                continue;
            }
            for &o in &others {
                counts[o][v] -= 1;
            }
            let won = solve(counts, wilds - k);
            for &o in &others {
                counts[o][v] += 1;
            }
            if won {
                return true;
            }
        }
    }
    false
}

/// Runs holding (c, v): every value window of the run's length containing v,
/// gaps filled by wildcards; plus the 12-13-1 wrap at length 3.
fn runs(counts: &mut Counts, wilds: u8, c: usize, v: usize) -> bool {
    for len in 3..=13usize {
        let lo = v.saturating_sub(len - 1).max(1);
        let hi = v.min(14 - len);
        for start in lo..=hi {
            if try_window(counts, wilds, c, v, (start..start + len).collect()) {
                return true;
            }
        }
    }
    if v == 1 || v == 12 || v == 13 {
        if try_window(counts, wilds, c, v, vec![12, 13, 1]) {
            return true;
        }
    }
    false
}

fn try_window(counts: &mut Counts, wilds: u8, c: usize, v: usize, window: Vec<usize>) -> bool {
    let mut used = Vec::new();
    let mut need = 0u8;
    for &val in window.iter().filter(|&&val| val != v) {
        if counts[c][val] > 0 {
            counts[c][val] -= 1;
            used.push(val);
        } else {
            need += 1;
        }
    }
    let won = need <= wilds && solve(counts, wilds - need);
    for val in used {
        counts[c][val] += 1;
    }
    won
}

/// Whether 14 tiles form seven disjoint pairs (same color and value);
/// wildcards pair with anything, including each other.
fn seven_pairs(kept: &[Tile]) -> bool {
    let mut counts: Counts = [[0; 14]; 4];
    let mut wilds = 0u8;
    for tile in kept {
        if tile.is_wild() {
            wilds += 1;
        } else {
            counts[tile.color() as usize][tile.value() as usize] += 1;
        }
    }
    let singles: u8 = counts
        .iter()
        .flat_map(|row| row.iter())
        .map(|&n| n % 2)
        .sum();
    singles <= wilds
}

#[cfg(test)]
mod tests {
    use super::*;
    use okey_tiles::Color;

    fn tile(id: u8, color: Color, value: u8) -> Tile {
        Tile::new(id, color, value)
    }
    fn okey(id: u8) -> Tile {
        let mut t = Tile::new(id, Color::Red, 1);
        t.mark_okey();
        t
    }

    fn run(ids: std::ops::Range<u8>, color: Color, from: u8) -> Vec<Tile> {
        ids.enumerate()
            .map(|(i, id)| tile(id, color, from + i as u8))
            .collect()
    }

    #[test]
    fn four_runs_win_normally() {
        let mut hand = Vec::new();
        hand.extend(run(0..3, Color::Yellow, 1));
        hand.extend(run(3..6, Color::Blue, 4));
        hand.extend(run(6..10, Color::Black, 7));
        hand.extend(run(10..14, Color::Red, 2));
        hand.push(tile(14, Color::Red, 13));
        let win = check_winning_hand(&hand).win().expect("winning hand");
        assert_eq!(win.kind, WinKind::Normal);
        assert_eq!(win.discard.id(), 14);
    }

    #[test]
    fn groups_and_runs_mix() {
        let mut hand = Vec::new();
        hand.push(tile(0, Color::Yellow, 9));
        hand.push(tile(1, Color::Blue, 9));
        hand.push(tile(2, Color::Red, 9));
        hand.push(tile(3, Color::Black, 9));
        hand.extend(run(4..7, Color::Yellow, 1));
        hand.extend(run(7..10, Color::Blue, 11));
        hand.extend(run(10..14, Color::Red, 5));
        hand.push(tile(14, Color::Black, 2));
        let win = check_winning_hand(&hand).win().expect("winning hand");
        assert_eq!(win.kind, WinKind::Normal);
        assert_eq!(win.discard.id(), 14);
    }

    #[test]
    fn wildcard_fills_partition_gap() {
        let mut hand = Vec::new();
        hand.push(tile(0, Color::Yellow, 3));
        hand.push(okey(1));
        hand.push(tile(2, Color::Yellow, 5));
        hand.extend(run(3..6, Color::Blue, 4));
        hand.extend(run(6..10, Color::Black, 7));
        hand.extend(run(10..14, Color::Red, 2));
        hand.push(tile(14, Color::Red, 13));
        let win = check_winning_hand(&hand).win().expect("winning hand");
        assert_eq!(win.kind, WinKind::Normal);
    }

    #[test]
    fn seven_pairs_wins() {
        let mut hand = Vec::new();
        for (i, value) in [2u8, 4, 6, 8, 10, 12, 13].iter().enumerate() {
            hand.push(tile(2 * i as u8, Color::Yellow, *value));
            hand.push(tile(2 * i as u8 + 1, Color::Yellow, *value));
        }
        hand.push(tile(14, Color::Red, 5));
        let win = check_winning_hand(&hand).win().expect("winning hand");
        assert_eq!(win.kind, WinKind::Pairs);
        assert_eq!(win.discard.id(), 14);
    }

    #[test]
    fn okey_discard_outranks_normal() {
        let mut hand = Vec::new();
        hand.extend(run(0..3, Color::Yellow, 1));
        hand.extend(run(3..6, Color::Blue, 4));
        hand.extend(run(6..10, Color::Black, 7));
        hand.extend(run(10..14, Color::Red, 2));
        hand.push(okey(14));
        let win = check_winning_hand(&hand).win().expect("winning hand");
        assert_eq!(win.kind, WinKind::OkeyDiscard);
        assert_eq!(win.discard.id(), 14);
    }

    #[test]
    fn garbage_hand_does_not_win() {
        let mut hand = Vec::new();
        for i in 0..15u8 {
            hand.push(tile(i, Color::from(i % 4), (i % 13) + 1));
        }
        assert_eq!(
            check_winning_hand(&hand),
            WinCheck::NotWinning(NotWinning::NoPartition)
        );
    }

    #[test]
    fn wrong_hand_size() {
        let hand = run(0..14, Color::Yellow, 1);
        assert_eq!(
            check_winning_hand(&hand),
            WinCheck::NotWinning(NotWinning::WrongHandSize)
        );
    }

    #[test]
    fn wrap_run_partition() {
        let mut hand = Vec::new();
        hand.push(tile(0, Color::Yellow, 12));
        hand.push(tile(1, Color::Yellow, 13));
        hand.push(tile(2, Color::Yellow, 1));
        hand.extend(run(3..6, Color::Blue, 4));
        hand.extend(run(6..10, Color::Black, 7));
        hand.extend(run(10..14, Color::Red, 2));
        hand.push(tile(14, Color::Red, 13));
        assert!(check_winning_hand(&hand).win().is_some());
    }

    #[test]
    fn prefers_lowest_discard_value_between_equal_kinds() {
        // both ends of the 5-run are winning discards; Y1 beats Y5
        let mut hand = Vec::new();
        hand.extend(run(0..5, Color::Yellow, 1));
        hand.extend(run(5..8, Color::Blue, 4));
        hand.extend(run(8..12, Color::Black, 7));
        hand.extend(run(12..15, Color::Red, 2));
        let win = check_winning_hand(&hand).win().expect("winning hand");
        assert_eq!(win.kind, WinKind::Normal);
        assert_eq!(win.discard.value(), 1);
    }
}
