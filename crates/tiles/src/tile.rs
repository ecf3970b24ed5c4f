use super::Color;

/// Stable tile identifier, unique within a game (0..=105).
pub type TileId = u8;

/// A single okey tile.
///
/// Equality and hashing go by id: the two physical copies of the same
/// (color, value) pair are distinct tiles. The serialized field names
/// (`id`, `Color`, `Value`, `IsFalseJoker`) are the commitment wire format;
/// the okey flag never crosses the wire because it is derivable from the
/// indicator and would otherwise leak through projections.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Tile {
    id: TileId,
    #[serde(rename = "Color")]
    color: Color,
    #[serde(rename = "Value")]
    value: u8,
    #[serde(rename = "IsFalseJoker")]
    is_false_joker: bool,
    #[serde(skip)]
    is_okey: bool,
}

impl Tile {
    pub fn new(id: TileId, color: Color, value: u8) -> Self {
        Self {
            id,
            color,
            value,
            is_false_joker: false,
            is_okey: false,
        }
    }
    pub fn false_joker(id: TileId) -> Self {
        Self {
            id,
            color: Color::Yellow,
            value: 0,
            is_false_joker: true,
            is_okey: false,
        }
    }
    pub fn id(&self) -> TileId {
        self.id
    }
    pub fn color(&self) -> Color {
        self.color
    }
    pub fn value(&self) -> u8 {
        self.value
    }
    pub fn is_false_joker(&self) -> bool {
        self.is_false_joker
    }
    pub fn is_okey(&self) -> bool {
        self.is_okey
    }
    /// Okey tiles and false jokers both fill exactly one meld slot each.
    pub fn is_wild(&self) -> bool {
        self.is_okey || self.is_false_joker
    }
    /// Flags this tile as the okey for the current game.
    pub fn mark_okey(&mut self) {
        self.is_okey = true;
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Tile {}

impl std::hash::Hash for Tile {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_false_joker {
            write!(f, "FJ")
        } else {
            let c = match self.color {
                Color::Yellow => 'Y',
                Color::Blue => 'B',
                Color::Black => 'K',
                Color::Red => 'R',
            };
            write!(f, "{}{}", c, self.value)
        }
    }
}
