use okey_tiles::Tile;

/// Classification of a candidate meld.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeldKind {
    Run,
    Group,
    Invalid,
}

/// Classifies a set of tiles as a run, a group, or invalid.
///
/// Wildcards (okey and false joker) each fill exactly one slot. Runs are
/// same-color consecutive values fitting a window in [1..13], with the
/// 12-13-1 wrap permitted only at exactly length 3. Groups are same-value
/// tiles of pairwise distinct colors, length 3 or 4. A meld of nothing but
/// wildcards is valid at length 3 or more.
///
/// Depends only on the multiset of tiles, never on input order.
pub fn valid_meld(tiles: &[Tile]) -> MeldKind {
    if tiles.len() < 3 {
        return MeldKind::Invalid;
    }
    let naturals = tiles.iter().filter(|t| !t.is_wild()).collect::<Vec<_>>();
    if naturals.is_empty() {
        return MeldKind::Run;
    }
    if is_run(&naturals, tiles.len()) {
        MeldKind::Run
    } else if is_group(&naturals, tiles.len()) {
        MeldKind::Group
    } else {
        MeldKind::Invalid
    }
}

fn is_run(naturals: &[&Tile], len: usize) -> bool {
    if len > 13 {
        return false;
    }
    let color = naturals[0].color();
    if naturals.iter().any(|t| t.color() != color) {
        return false;
    }
    let mut values = naturals.iter().map(|t| t.value()).collect::<Vec<_>>();
    values.sort_unstable();
    values.dedup();
    if values.len() != naturals.len() {
        return false;
    }
    let lo = *values.first().unwrap() as usize;
    let hi = *values.last().unwrap() as usize;
    // a window of exactly `len` consecutive values inside [1..13] must cover
    // the naturals; len <= 13 guarantees such a window fits once the span does
    if hi - lo + 1 <= len {
        return true;
    }
    // wrap-around 12-13-1, length 3 only
    len == 3 && values.iter().all(|&v| v == 1 || v == 12 || v == 13)
}

fn is_group(naturals: &[&Tile], len: usize) -> bool {
    if !(3..=4).contains(&len) {
        return false;
    }
    let value = naturals[0].value();
    if naturals.iter().any(|t| t.value() != value) {
        return false;
    }
    let mut colors = naturals.iter().map(|t| t.color()).collect::<Vec<_>>();
    colors.sort_unstable();
    colors.dedup();
    colors.len() == naturals.len()
}
