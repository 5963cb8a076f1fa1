use std::fmt::{Display, Formatter};

/// Identity of a physical tile.
pub type TileId = u8;

/// One position of a grid: either a numbered tile or a hole with no physical tile in it.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Cell {
    /// A numbered tile.
    Tile(TileId),
    /// A cell with no tile in it.
    #[default]
    Hole,
}

impl Cell {
    /// The raw value marking a hole in puzzle files.
    pub const SENTINEL: i32 = -1;

    /// Convert a raw puzzle file value, returning `None` for values which are neither the sentinel nor a valid [`TileId`].
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            Self::SENTINEL => Some(Self::Hole),
            _ => TileId::try_from(raw).ok().map(Self::Tile),
        }
    }

    /// The value written to puzzle files, [`Self::SENTINEL`] for holes.
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Tile(tile) => tile.into(),
            Self::Hole => Self::SENTINEL,
        }
    }

    /// The tile in this cell, if any.
    pub fn tile(self) -> Option<TileId> {
        match self {
            Self::Tile(tile) => Some(tile),
            Self::Hole => None,
        }
    }

    /// Whether this cell holds no tile.
    pub fn is_hole(self) -> bool {
        self == Self::Hole
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tile(tile) => write!(f, "{tile}"),
            Self::Hole => write!(f, "*"),
        }
    }
}
