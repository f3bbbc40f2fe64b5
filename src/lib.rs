//! Rule engine for Hashiwokakero (Bridges) puzzles: the grid model with its
//! crossing and capacity rules, a read-only analyser, a deductive solver and
//! a randomized generator, plus a serializable puzzle exchange format.

pub mod analyser;
pub mod definition;
pub mod generator;
pub mod puzzle;
pub mod solver;

pub use analyser::{Analyser, Status};
pub use definition::{BridgeDefinition, IslandDefinition, PuzzleDefinition};
pub use generator::{generate, generate_with_seed};
pub use puzzle::{
    Bridge, BridgeKind, DIRECTIONS, Direction, HashiError, Island, MAX_DIMENSION, MAX_REQUIRED,
    MIN_DIMENSION, MIN_REQUIRED, Orientation, Position, Puzzle, Span,
};
pub use solver::{Move, next_move, solve};
