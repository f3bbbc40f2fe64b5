use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Smallest and largest grid edge accepted by [`Puzzle::new`].
pub const MIN_DIMENSION: u8 = 4;
pub const MAX_DIMENSION: u8 = 25;

/// An island needs between 1 and 8 bridge ends.
pub const MIN_REQUIRED: u8 = 1;
pub const MAX_REQUIRED: u8 = 8;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HashiError {
    #[error("grid dimensions must be between {MIN_DIMENSION} and {MAX_DIMENSION}")]
    Size,

    #[error("position out of bounds ({position:?})")]
    OutOfBounds { position: Position },

    #[error("cell {position:?} is already occupied by an island")]
    Occupied { position: Position },

    #[error("cell {position:?} lies on an existing bridge")]
    BlockedByBridge { position: Position },

    #[error("required bridge count {required} outside {MIN_REQUIRED}..={MAX_REQUIRED}")]
    BadRequirement { required: u8 },

    #[error("no island at {position:?}")]
    NoIsland { position: Position },

    #[error("bridges cannot be diagonal")]
    DiagonalBridge,

    #[error("bridge length cannot be zero")]
    BridgeLengthZero,

    #[error("islands at {a:?} and {b:?} are not nearest neighbours")]
    NotNeighbours { a: Position, b: Position },

    #[error("island at {position:?} has no remaining bridge capacity")]
    NoCapacity { position: Position },

    #[error("bridge between {a:?} and {b:?} is already double")]
    AlreadyDouble { a: Position, b: Position },

    #[error("bridge between {a:?} and {b:?} would cross an existing bridge")]
    Crossing { a: Position, b: Position },

    #[error("island count {count} outside {min}..={max} for this grid")]
    IslandCount { count: u16, min: u16, max: u16 },

    #[error("puzzle generation failed after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("island at {position:?} is orthogonally adjacent to another island")]
    AdjacentIsland { position: Position },

    #[error("bridge entry references island index {index} outside the island list")]
    BadIslandIndex { index: usize },

    #[error("bridge entry between island indices {from} and {to} is not a valid move")]
    InvalidBridgeEntry { from: usize, to: usize },
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Position {
    pub column: u8,
    pub row: u8,
}

impl Position {
    /// The adjacent cell one step away, or `None` when that would leave the
    /// coordinate space (grid bounds are the owning puzzle's concern).
    pub fn step(self, direction: Direction) -> Option<Position> {
        let Position { column, row } = self;
        match direction {
            Direction::North => row.checked_sub(1).map(|row| Position { column, row }),
            Direction::South => row.checked_add(1).map(|row| Position { column, row }),
            Direction::West => column.checked_sub(1).map(|column| Position { column, row }),
            Direction::East => column.checked_add(1).map(|column| Position { column, row }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

/// Enumeration order used everywhere a deterministic sweep over directions
/// is needed.
pub const DIRECTIONS: [Direction; 4] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// Direction from `a` towards `b` when they share a row or column.
    pub fn between(a: Position, b: Position) -> Option<Direction> {
        if a == b {
            return None;
        }
        if a.column == b.column {
            Some(if b.row < a.row {
                Direction::North
            } else {
                Direction::South
            })
        } else if a.row == b.row {
            Some(if b.column < a.column {
                Direction::West
            } else {
                Direction::East
            })
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum BridgeKind {
    Single,
    Double,
}

impl BridgeKind {
    /// Bridge ends this connection contributes to each endpoint island.
    pub fn weight(self) -> u8 {
        match self {
            BridgeKind::Single => 1,
            BridgeKind::Double => 2,
        }
    }
}

/// The geometric segment of a bridge. Endpoints are stored sorted so two
/// spans over the same pair compare equal regardless of construction order,
/// which makes `Span` usable as the canonical bridge-map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Span {
    start: Position,
    end: Position,
}

impl Span {
    pub fn new(a: Position, b: Position) -> Result<Span, HashiError> {
        if a == b {
            return Err(HashiError::BridgeLengthZero);
        }
        if a.column != b.column && a.row != b.row {
            return Err(HashiError::DiagonalBridge);
        }
        if a < b {
            Ok(Span { start: a, end: b })
        } else {
            Ok(Span { start: b, end: a })
        }
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn orientation(&self) -> Orientation {
        if self.start.row == self.end.row {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    pub fn is_endpoint(&self, position: Position) -> bool {
        position == self.start || position == self.end
    }

    /// Whether the segment passes over `position`, endpoints included.
    pub fn touches(&self, position: Position) -> bool {
        match self.orientation() {
            Orientation::Horizontal => {
                position.row == self.start.row
                    && self.start.column <= position.column
                    && position.column <= self.end.column
            }
            Orientation::Vertical => {
                position.column == self.start.column
                    && self.start.row <= position.row
                    && position.row <= self.end.row
            }
        }
    }

    /// Crossing test between a candidate span and an existing bridge.
    ///
    /// The rules are deliberately asymmetric:
    /// - the identical pair conflicts only when the existing bridge is
    ///   already double (a single duplicate is the upgrade case);
    /// - two spans meeting at exactly one shared endpoint do not conflict,
    ///   since bridges radiate from islands;
    /// - everything else that intersects conflicts, including an endpoint
    ///   landing on the other span's interior and collinear overlap.
    pub fn conflicts_with(&self, other: &Span, other_kind: BridgeKind) -> bool {
        if self == other {
            return other_kind == BridgeKind::Double;
        }

        match (self.orientation(), other.orientation()) {
            (Orientation::Horizontal, Orientation::Horizontal) => {
                if self.start.row != other.start.row {
                    return false;
                }
                let lo = self.start.column.max(other.start.column);
                let hi = self.end.column.min(other.end.column);
                // A single shared cell is necessarily an endpoint of both
                // spans, i.e. an island where the two bridges meet.
                lo < hi
            }
            (Orientation::Vertical, Orientation::Vertical) => {
                if self.start.column != other.start.column {
                    return false;
                }
                let lo = self.start.row.max(other.start.row);
                let hi = self.end.row.min(other.end.row);
                lo < hi
            }
            _ => {
                let (horizontal, vertical) = if self.orientation() == Orientation::Horizontal {
                    (self, other)
                } else {
                    (other, self)
                };
                let crossing = Position {
                    column: vertical.start.column,
                    row: horizontal.start.row,
                };
                if !horizontal.touches(crossing) || !vertical.touches(crossing) {
                    return false;
                }
                // Perpendicular spans meet in at most one cell; meeting at a
                // shared island is the allowed "T" case.
                !(horizontal.is_endpoint(crossing) && vertical.is_endpoint(crossing))
            }
        }
    }
}

/// Read accessor for one bridge, as returned by enumeration and teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bridge {
    span: Span,
    kind: BridgeKind,
}

impl Bridge {
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn kind(&self) -> BridgeKind {
        self.kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Island {
    required: u8,
    // Nearest other island along each cardinal ray, fixed by the owning
    // puzzle at insertion time. Indexed by Direction::index.
    neighbours: [Option<Position>; 4],
}

impl Island {
    pub fn required(&self) -> u8 {
        self.required
    }

    pub fn neighbour(&self, direction: Direction) -> Option<Position> {
        self.neighbours[direction.index()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    columns: u8,
    rows: u8,
    islands: BTreeMap<Position, Island>,
    bridges: BTreeMap<Span, BridgeKind>,
}

impl Puzzle {
    pub fn new(columns: u8, rows: u8) -> Result<Puzzle, HashiError> {
        let valid = MIN_DIMENSION..=MAX_DIMENSION;
        if !valid.contains(&columns) || !valid.contains(&rows) {
            return Err(HashiError::Size);
        }
        Ok(Puzzle {
            columns,
            rows,
            islands: BTreeMap::new(),
            bridges: BTreeMap::new(),
        })
    }

    pub fn columns(&self) -> u8 {
        self.columns
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn contains(&self, position: Position) -> bool {
        position.column < self.columns && position.row < self.rows
    }

    pub fn island(&self, position: Position) -> Option<&Island> {
        self.islands.get(&position)
    }

    /// Islands in sorted (column-major) order.
    pub fn islands(&self) -> impl Iterator<Item = (Position, &Island)> {
        self.islands.iter().map(|(position, island)| (*position, island))
    }

    pub fn island_count(&self) -> usize {
        self.islands.len()
    }

    pub fn bridges(&self) -> impl Iterator<Item = Bridge> + '_ {
        self.bridges
            .iter()
            .map(|(span, kind)| Bridge { span: *span, kind: *kind })
    }

    pub fn bridge_count(&self) -> usize {
        self.bridges.len()
    }

    /// Nearest island in `direction`, as linked at insertion time.
    pub fn neighbour(&self, position: Position, direction: Direction) -> Option<Position> {
        self.islands.get(&position)?.neighbour(direction)
    }

    pub fn bridge_between(&self, a: Position, b: Position) -> Option<BridgeKind> {
        let span = Span::new(a, b).ok()?;
        self.bridges.get(&span).copied()
    }

    /// Bridge ends currently placed on the island at `position`.
    pub fn actual_bridge_count(&self, position: Position) -> u8 {
        self.bridges
            .iter()
            .filter(|(span, _)| span.is_endpoint(position))
            .map(|(_, kind)| kind.weight())
            .sum()
    }

    /// Bridge ends the island still needs. Zero for finished islands and for
    /// positions holding no island.
    pub fn remaining_bridges(&self, position: Position) -> u8 {
        match self.islands.get(&position) {
            Some(island) => island
                .required()
                .saturating_sub(self.actual_bridge_count(position)),
            None => 0,
        }
    }

    /// Whether `span` conflicts with any existing bridge under the crossing
    /// rules of [`Span::conflicts_with`].
    pub fn is_any_bridge_crossing(&self, span: Span) -> bool {
        self.bridges
            .iter()
            .any(|(existing, kind)| span.conflicts_with(existing, *kind))
    }

    /// Place a new island and link it into the neighbour topology.
    ///
    /// The new island takes the nearest existing island along each cardinal
    /// ray as its neighbour, and those islands' opposite links are repointed
    /// at it. Links of islands the insertion does not flank are untouched.
    pub fn build_island(&mut self, position: Position, required: u8) -> Result<(), HashiError> {
        if !self.contains(position) {
            return Err(HashiError::OutOfBounds { position });
        }
        if self.islands.contains_key(&position) {
            return Err(HashiError::Occupied { position });
        }
        if self.bridges.keys().any(|span| span.touches(position)) {
            return Err(HashiError::BlockedByBridge { position });
        }
        if !(MIN_REQUIRED..=MAX_REQUIRED).contains(&required) {
            return Err(HashiError::BadRequirement { required });
        }

        let mut neighbours = [None; 4];
        for direction in DIRECTIONS {
            neighbours[direction.index()] = self.nearest_island(position, direction);
        }
        for direction in DIRECTIONS {
            if let Some(neighbour) = neighbours[direction.index()] {
                if let Some(island) = self.islands.get_mut(&neighbour) {
                    island.neighbours[direction.opposite().index()] = Some(position);
                }
            }
        }
        self.islands.insert(position, Island { required, neighbours });
        Ok(())
    }

    fn nearest_island(&self, from: Position, direction: Direction) -> Option<Position> {
        let aligned = |position: &Position| match direction {
            Direction::North => position.column == from.column && position.row < from.row,
            Direction::South => position.column == from.column && position.row > from.row,
            Direction::West => position.row == from.row && position.column < from.column,
            Direction::East => position.row == from.row && position.column > from.column,
        };
        let distance = |position: &Position| {
            (position.column.abs_diff(from.column)) as u16
                + (position.row.abs_diff(from.row)) as u16
        };
        self.islands
            .keys()
            .filter(|position| aligned(position))
            .min_by_key(|position| distance(position))
            .copied()
    }

    /// Build (or upgrade) the bridge between two islands. Symmetric in its
    /// arguments; a second call on the same pair upgrades single to double.
    pub fn build_bridge(&mut self, a: Position, b: Position) -> Result<BridgeKind, HashiError> {
        for end in [a, b] {
            if !self.islands.contains_key(&end) {
                return Err(HashiError::NoIsland { position: end });
            }
        }
        let span = Span::new(a, b)?;

        // Only the current nearest neighbour may be bridged; anything else
        // would pass over or skip an island.
        let direction =
            Direction::between(a, b).ok_or(HashiError::DiagonalBridge)?;
        if self.neighbour(a, direction) != Some(b) {
            return Err(HashiError::NotNeighbours { a, b });
        }

        match self.bridges.get(&span) {
            Some(BridgeKind::Double) => Err(HashiError::AlreadyDouble { a, b }),
            Some(BridgeKind::Single) => {
                self.check_capacity(a, b)?;
                self.bridges.insert(span, BridgeKind::Double);
                Ok(BridgeKind::Double)
            }
            None => {
                self.check_capacity(a, b)?;
                if self.is_any_bridge_crossing(span) {
                    return Err(HashiError::Crossing { a, b });
                }
                self.bridges.insert(span, BridgeKind::Single);
                Ok(BridgeKind::Single)
            }
        }
    }

    fn check_capacity(&self, a: Position, b: Position) -> Result<(), HashiError> {
        for end in [a, b] {
            if self.remaining_bridges(end) == 0 {
                return Err(HashiError::NoCapacity { position: end });
            }
        }
        Ok(())
    }

    /// Demote a double bridge to single, or remove a single bridge. Returns
    /// the bridge as it stood before teardown; `None` when the pair holds no
    /// bridge. Argument-order independent.
    pub fn tear_down_bridge(&mut self, a: Position, b: Position) -> Option<Bridge> {
        let span = Span::new(a, b).ok()?;
        let kind = self.bridges.get(&span).copied()?;
        match kind {
            BridgeKind::Double => {
                self.bridges.insert(span, BridgeKind::Single);
            }
            BridgeKind::Single => {
                self.bridges.remove(&span);
            }
        }
        Some(Bridge { span, kind })
    }

    /// Clear every bridge, keeping islands and required counts. Idempotent.
    pub fn remove_all_bridges(&mut self) {
        self.bridges.clear();
    }

    /// Set every island's requirement to its current actual bridge count.
    /// Used by the generator once the constructed bridge graph is final.
    pub(crate) fn finalise_required(&mut self) {
        let counts: Vec<(Position, u8)> = self
            .islands
            .keys()
            .map(|position| (*position, self.actual_bridge_count(*position)))
            .collect();
        for (position, count) in counts {
            if let Some(island) = self.islands.get_mut(&position) {
                island.required = count;
            }
        }
    }
}

impl std::fmt::Display for Puzzle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "   |")?;
        for column in 0..self.columns {
            write!(f, "{:3}  ", column)?;
        }
        writeln!(f)?;

        write!(f, "___|")?;
        for _ in 0..self.columns {
            write!(f, "_____")?;
        }
        writeln!(f)?;

        for row in 0..self.rows {
            write!(f, "{:3}|", row)?;
            for column in 0..self.columns {
                let position = Position { column, row };
                if let Some(island) = self.islands.get(&position) {
                    write!(f, " ({}) ", island.required)?;
                    continue;
                }
                match self
                    .bridges
                    .iter()
                    .find(|(span, _)| span.touches(position))
                {
                    Some((span, kind)) => match (span.orientation(), kind) {
                        (Orientation::Vertical, BridgeKind::Single) => write!(f, "  |  ")?,
                        (Orientation::Vertical, BridgeKind::Double) => write!(f, " ||  ")?,
                        (Orientation::Horizontal, BridgeKind::Single) => write!(f, "-----")?,
                        (Orientation::Horizontal, BridgeKind::Double) => write!(f, "=====")?,
                    },
                    None => write!(f, "     ")?,
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
