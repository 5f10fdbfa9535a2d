//! Horizontal directions, chunk corners and vertical facings.

use serde::{Deserialize, Serialize};

/// One of the four horizontal directions.
///
/// The discriminant is the horizontal index used by boundary flag addressing
/// and by the per-direction bits of the pending neighbor-init state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// +Z
    South = 0,
    /// -X
    West = 1,
    /// -Z
    North = 2,
    /// +X
    East = 3,
}

impl Direction {
    /// All horizontal directions in index order.
    pub const HORIZONTALS: [Direction; 4] = [
        Direction::South,
        Direction::West,
        Direction::North,
        Direction::East,
    ];

    /// Horizontal index (`0..4`).
    pub const fn horizontal_index(self) -> usize {
        self as usize
    }

    /// Unit offset `(dx, dz)` in chunk or block space.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::South => (0, 1),
            Self::West => (-1, 0),
            Self::North => (0, -1),
            Self::East => (1, 0),
        }
    }

    /// Returns the opposite direction.
    pub const fn opposite(self) -> Self {
        match self {
            Self::South => Self::North,
            Self::West => Self::East,
            Self::North => Self::South,
            Self::East => Self::West,
        }
    }

    /// True when the direction points along +X or +Z.
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::South | Self::East)
    }

    /// True for east/west.
    pub const fn is_x_axis(self) -> bool {
        matches!(self, Self::West | Self::East)
    }

    /// Canonical string key used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::South => "south",
            Self::West => "west",
            Self::North => "north",
            Self::East => "east",
        }
    }
}

/// A diagonal chunk corner, given as unit offsets on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Corner {
    /// X offset, `-1` or `1`.
    pub x: i32,
    /// Z offset, `-1` or `1`.
    pub z: i32,
}

impl Corner {
    /// All four corners.
    pub const ALL: [Corner; 4] = [
        Corner::new(-1, -1),
        Corner::new(-1, 1),
        Corner::new(1, -1),
        Corner::new(1, 1),
    ];

    /// Create a corner; offsets must be `-1` or `1`.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Point reflection through the chunk centre.
    pub const fn opposite(self) -> Self {
        Self {
            x: -self.x,
            z: -self.z,
        }
    }
}

/// Upper or lower face of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum VerticalFacing {
    /// Top layer of a section.
    Up = 0,
    /// Bottom layer of a section.
    Down = 1,
}

impl VerticalFacing {
    /// Both facings in slot order.
    pub const ALL: [VerticalFacing; 2] = [VerticalFacing::Up, VerticalFacing::Down];

    /// Index relative to the first vertical slot.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Y of the boundary layer inside a section (`0..16`).
    pub const fn layer(self) -> i32 {
        match self {
            Self::Up => 15,
            Self::Down => 0,
        }
    }
}
