use crate::puzzle::{BridgeKind, DIRECTIONS, Position, Puzzle, Span};
use std::collections::BTreeSet;

/// Three-way classification of a puzzle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Solved,
    Unsolved,
    Unsolvable,
}

/// Read-only reasoning over a puzzle. Holds no state beyond the borrow, so
/// one analyser per query is cheap and many readers may coexist.
pub struct Analyser<'a> {
    puzzle: &'a Puzzle,
}

impl<'a> Analyser<'a> {
    pub fn new(puzzle: &'a Puzzle) -> Self {
        Analyser { puzzle }
    }

    /// Classify the puzzle.
    ///
    /// With no unfinished islands the verdict hinges on connectivity: two
    /// saturated components that never met can never be joined, so that is
    /// `Unsolvable`, not `Solved`. An empty puzzle is vacuously solved. With
    /// unfinished islands the puzzle stays `Unsolved` as long as every one of
    /// them still has somewhere legal to build.
    pub fn status(&self) -> Status {
        let unfinished: Vec<Position> = self
            .puzzle
            .islands()
            .map(|(position, _)| position)
            .filter(|position| self.puzzle.remaining_bridges(*position) > 0)
            .collect();

        if unfinished.is_empty() {
            if self.bridged_graph_spans_all() {
                Status::Solved
            } else {
                Status::Unsolvable
            }
        } else if unfinished
            .iter()
            .all(|position| !self.valid_destinations(*position, false).is_empty())
        {
            Status::Unsolved
        } else {
            Status::Unsolvable
        }
    }

    fn bridged_graph_spans_all(&self) -> bool {
        let Some((seed, _)) = self.puzzle.islands().next() else {
            return true;
        };
        let mut visited = BTreeSet::new();
        let mut queue = vec![seed];
        while let Some(position) = queue.pop() {
            if !visited.insert(position) {
                continue;
            }
            queue.extend(self.bridged_neighbours(position));
        }
        visited.len() == self.puzzle.island_count()
    }

    fn bridged_neighbours(&self, position: Position) -> Vec<Position> {
        DIRECTIONS
            .into_iter()
            .filter_map(|direction| self.puzzle.neighbour(position, direction))
            .filter(|neighbour| self.puzzle.bridge_between(position, *neighbour).is_some())
            .collect()
    }

    /// Destinations passing the local filters only: the neighbour still needs
    /// enough bridges, the pair can take the requested multiplicity, and the
    /// span does not cross anything. No isolation reasoning here.
    fn candidate_destinations(&self, island: Position, double: bool) -> Vec<Position> {
        let need = if double { 2 } else { 1 };
        let mut destinations = Vec::new();
        for direction in DIRECTIONS {
            let Some(neighbour) = self.puzzle.neighbour(island, direction) else {
                continue;
            };
            if self.puzzle.remaining_bridges(neighbour) < need {
                continue;
            }
            // A double goes onto a bare pair only, matching is_valid_move;
            // on top of a single the remaining request is a single
            match self.puzzle.bridge_between(island, neighbour) {
                Some(BridgeKind::Double) => continue,
                Some(BridgeKind::Single) if double => continue,
                _ => {}
            }
            let Ok(span) = Span::new(island, neighbour) else {
                continue;
            };
            if self.puzzle.is_any_bridge_crossing(span) {
                continue;
            }
            destinations.push(neighbour);
        }
        destinations
    }

    /// Destinations the island may bridge to without stranding part of the
    /// puzzle, in deterministic N/E/S/W order.
    pub fn valid_destinations(&self, island: Position, double: bool) -> Vec<Position> {
        self.candidate_destinations(island, double)
            .into_iter()
            .filter(|destination| !self.would_isolate(island, *destination))
            .collect()
    }

    /// One-step-optimistic reachability: would building a bridge between `a`
    /// and `b` cut some island off from the rest?
    ///
    /// The traversal runs from both endpoints. From a visited island it
    /// follows real bridges, and additionally its candidate destinations when
    /// the island has more than one remaining bridge. An island with exactly
    /// one slot left spends it on the bridge under test, so it cannot also
    /// speculatively reach anywhere else. The move is isolating when the
    /// traversal misses any island.
    ///
    /// This is a pruning heuristic, not a solvability proof: it can accept
    /// moves that still lead to a dead end later, and it never rejects a move
    /// that is always safe.
    pub fn would_isolate(&self, a: Position, b: Position) -> bool {
        let mut visited = BTreeSet::new();
        let mut queue = vec![a, b];
        while let Some(position) = queue.pop() {
            if !visited.insert(position) {
                continue;
            }
            queue.extend(self.bridged_neighbours(position));
            if self.puzzle.remaining_bridges(position) > 1 {
                queue.extend(self.candidate_destinations(position, false));
            }
        }
        visited.len() != self.puzzle.island_count()
    }

    /// Whether a bridge of the requested multiplicity may be placed right
    /// now, stranding risk accepted. Used for direct placement and for
    /// replaying a stored bridge list.
    pub fn is_valid_move(&self, a: Position, b: Position, double: bool) -> bool {
        let need = if double { 2 } else { 1 };
        if self.puzzle.island(a).is_none() || self.puzzle.island(b).is_none() {
            return false;
        }
        let Ok(span) = Span::new(a, b) else {
            return false;
        };
        if !DIRECTIONS
            .into_iter()
            .any(|direction| self.puzzle.neighbour(a, direction) == Some(b))
        {
            return false;
        }
        if self.puzzle.remaining_bridges(a) < need || self.puzzle.remaining_bridges(b) < need {
            return false;
        }
        match self.puzzle.bridge_between(a, b) {
            Some(BridgeKind::Double) => false,
            // On top of an existing single only another single fits
            Some(BridgeKind::Single) => !double,
            None => !self.puzzle.is_any_bridge_crossing(span),
        }
    }

    /// Whether a new island may be placed at `position`: inside the grid, on
    /// an empty cell, and not orthogonally adjacent to an existing island.
    pub fn is_valid_island_position(&self, position: Position) -> bool {
        if !self.puzzle.contains(position) || self.puzzle.island(position).is_some() {
            return false;
        }
        DIRECTIONS.into_iter().all(|direction| {
            position
                .step(direction)
                .is_none_or(|adjacent| self.puzzle.island(adjacent).is_none())
        })
    }
}
