/// Seat position around the okey table.
///
/// Join order fills South first, then East, North, West. Play proceeds
/// counter-clockwise, which on this compass is South → West → North → East.
/// The successor of index p is therefore (p + 3) mod 4, never (p + 1).
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum Seat {
    #[default]
    South = 0,
    East = 1,
    North = 2,
    West = 3,
}

impl Seat {
    /// All four seats in join order.
    pub const fn all() -> [Seat; 4] {
        [Seat::South, Seat::East, Seat::North, Seat::West]
    }
    /// The seat that plays after this one (counter-clockwise).
    pub fn next(&self) -> Seat {
        Seat::from((*self as u8 + 3) % 4)
    }
    /// Index into per-seat arrays.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// u8 isomorphism
impl From<u8> for Seat {
    fn from(n: u8) -> Seat {
        match n {
            0 => Seat::South,
            1 => Seat::East,
            2 => Seat::North,
            3 => Seat::West,
            _ => unreachable!("invalid seat"),
        }
    }
}
impl From<Seat> for u8 {
    fn from(s: Seat) -> u8 {
        s as u8
    }
}

/// str isomorphism
impl TryFrom<&str> for Seat {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "south" | "s" => Ok(Seat::South),
            "east" | "e" => Ok(Seat::East),
            "north" | "n" => Ok(Seat::North),
            "west" | "w" => Ok(Seat::West),
            _ => Err(format!("invalid seat str: {}", s)),
        }
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Seat::South => write!(f, "South"),
            Seat::East => write!(f, "East"),
            Seat::North => write!(f, "North"),
            Seat::West => write!(f, "West"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijective_u8() {
        for seat in Seat::all() {
            assert!(seat == Seat::from(u8::from(seat)));
        }
    }

    #[test]
    fn counter_clockwise_rotation() {
        assert_eq!(Seat::South.next(), Seat::West);
        assert_eq!(Seat::West.next(), Seat::North);
        assert_eq!(Seat::North.next(), Seat::East);
        assert_eq!(Seat::East.next(), Seat::South);
    }

    #[test]
    fn rotation_visits_all_seats() {
        let mut seat = Seat::South;
        let mut seen = std::collections::HashSet::new();
        for _ in 0..4 {
            seen.insert(seat);
            seat = seat.next();
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(seat, Seat::South);
    }
}
