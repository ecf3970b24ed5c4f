//! Tile primitives for okey.
//!
//! A full set holds 106 tiles: two copies of every (color, value) pair plus
//! two false jokers. Tiles are plain values identified by a stable id; the
//! okey flag is derived after the shuffle from the indicator tile.
mod color;
mod set;
mod tile;

pub use color::Color;
pub use set::full_set;
pub use set::okey_value;
pub use set::sort_by_color;
pub use set::sort_by_value;
pub use tile::Tile;
pub use tile::TileId;
