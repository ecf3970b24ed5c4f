/// Tile color: yellow, blue, black, red.
///
/// Colors are strategically interchangeable — only matching matters, not
/// which specific colors are involved. The ordering (Y < B < K < R) is
/// arbitrary but consistent, used for canonical hand sorting.
///
/// Serialized names ("Yellow", "Blue", "Black", "Red") are part of the
/// commitment wire format and must not change.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum Color {
    #[default]
    Yellow = 0,
    Blue = 1,
    Black = 2,
    Red = 3,
}

impl Color {
    /// All four colors in canonical order.
    pub const fn all() -> [Color; 4] {
        [Color::Yellow, Color::Blue, Color::Black, Color::Red]
    }
}

/// u8 isomorphism
impl From<u8> for Color {
    fn from(n: u8) -> Color {
        match n {
            0 => Color::Yellow,
            1 => Color::Blue,
            2 => Color::Black,
            3 => Color::Red,
            _ => unreachable!("invalid color"),
        }
    }
}
impl From<Color> for u8 {
    fn from(c: Color) -> u8 {
        c as u8
    }
}

/// str isomorphism
impl TryFrom<&str> for Color {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "yellow" | "y" => Ok(Color::Yellow),
            "blue" | "b" => Ok(Color::Blue),
            "black" | "k" => Ok(Color::Black),
            "red" | "r" => Ok(Color::Red),
            _ => Err(format!("invalid color str: {}", s)),
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Color::Yellow => write!(f, "Yellow"),
            Color::Blue => write!(f, "Blue"),
            Color::Black => write!(f, "Black"),
            Color::Red => write!(f, "Red"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijective_u8() {
        for color in Color::all() {
            assert!(color == Color::from(u8::from(color)));
        }
    }

    #[test]
    fn wire_names() {
        assert_eq!(Color::Yellow.to_string(), "Yellow");
        assert_eq!(Color::Black.to_string(), "Black");
    }
}
