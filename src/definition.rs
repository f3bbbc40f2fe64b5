use crate::analyser::Analyser;
use crate::puzzle::{BridgeKind, HashiError, Position, Puzzle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable snapshot of a whole puzzle. Islands appear in sorted
/// (column-major) order and bridges refer to them by index into that list,
/// which keeps the format free of coordinate duplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleDefinition {
    pub columns: u8,
    pub rows: u8,
    pub islands: Vec<IslandDefinition>,
    pub bridges: Vec<BridgeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IslandDefinition {
    pub column: u8,
    pub row: u8,
    pub required: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeDefinition {
    pub from: usize,
    pub to: usize,
    pub double: bool,
}

impl Puzzle {
    /// Snapshot the puzzle. Lossless: replaying the result reproduces an
    /// equal puzzle.
    pub fn to_definition(&self) -> PuzzleDefinition {
        let islands: Vec<IslandDefinition> = self
            .islands()
            .map(|(position, island)| IslandDefinition {
                column: position.column,
                row: position.row,
                required: island.required(),
            })
            .collect();

        let index_of: BTreeMap<Position, usize> = self
            .islands()
            .enumerate()
            .map(|(index, (position, _))| (position, index))
            .collect();
        let bridges = self
            .bridges()
            .filter_map(|bridge| {
                let from = index_of.get(&bridge.span().start())?;
                let to = index_of.get(&bridge.span().end())?;
                Some(BridgeDefinition {
                    from: *from,
                    to: *to,
                    double: bridge.kind() == BridgeKind::Double,
                })
            })
            .collect();

        PuzzleDefinition {
            columns: self.columns(),
            rows: self.rows(),
            islands,
            bridges,
        }
    }

    /// Rebuild a puzzle from a definition by replaying it through the
    /// ordinary mutation path, so a stored puzzle obeys exactly the rules a
    /// live one does. Loading stops at the first invalid entry.
    pub fn from_definition(definition: &PuzzleDefinition) -> Result<Puzzle, HashiError> {
        let mut puzzle = Puzzle::new(definition.columns, definition.rows)?;

        let mut positions = Vec::with_capacity(definition.islands.len());
        for island in &definition.islands {
            let position = Position {
                column: island.column,
                row: island.row,
            };
            // build_island reports bounds, occupancy and requirement
            // violations itself; the spacing rule is the loader's to check
            if puzzle.contains(position)
                && puzzle.island(position).is_none()
                && !Analyser::new(&puzzle).is_valid_island_position(position)
            {
                return Err(HashiError::AdjacentIsland { position });
            }
            puzzle.build_island(position, island.required)?;
            positions.push(position);
        }

        for bridge in &definition.bridges {
            let endpoint = |index: usize| {
                positions
                    .get(index)
                    .copied()
                    .ok_or(HashiError::BadIslandIndex { index })
            };
            let from = endpoint(bridge.from)?;
            let to = endpoint(bridge.to)?;
            if !Analyser::new(&puzzle).is_valid_move(from, to, bridge.double) {
                return Err(HashiError::InvalidBridgeEntry {
                    from: bridge.from,
                    to: bridge.to,
                });
            }
            puzzle.build_bridge(from, to)?;
            if bridge.double {
                puzzle.build_bridge(from, to)?;
            }
        }

        Ok(puzzle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(column: u8, row: u8) -> Position {
        Position { column, row }
    }

    fn bridged_triangle() -> Puzzle {
        let mut puzzle = Puzzle::new(5, 5).unwrap();
        puzzle.build_island(at(0, 0), 3).unwrap();
        puzzle.build_island(at(4, 0), 1).unwrap();
        puzzle.build_island(at(0, 4), 2).unwrap();
        puzzle.build_bridge(at(0, 0), at(4, 0)).unwrap();
        puzzle.build_bridge(at(0, 0), at(0, 4)).unwrap();
        puzzle.build_bridge(at(0, 0), at(0, 4)).unwrap();
        puzzle
    }

    // ============================================================================
    // SNAPSHOT TESTS
    // ============================================================================

    #[test]
    fn test_to_definition_sorted_islands_and_indexed_bridges() {
        // Test: Islands come out in sorted order and bridges index into them
        let definition = bridged_triangle().to_definition();
        assert_eq!(definition.columns, 5);
        assert_eq!(definition.rows, 5);
        assert_eq!(
            definition.islands,
            vec![
                IslandDefinition { column: 0, row: 0, required: 3 },
                IslandDefinition { column: 0, row: 4, required: 2 },
                IslandDefinition { column: 4, row: 0, required: 1 },
            ]
        );
        assert_eq!(
            definition.bridges,
            vec![
                BridgeDefinition { from: 0, to: 1, double: true },
                BridgeDefinition { from: 0, to: 2, double: false },
            ]
        );
    }

    #[test]
    fn test_definition_round_trip() {
        // Test: Snapshot, serialize, parse, replay; the result is equal
        let original = bridged_triangle();
        let encoded = serde_json::to_string(&original.to_definition()).unwrap();
        let decoded: PuzzleDefinition = serde_json::from_str(&encoded).unwrap();
        let rebuilt = Puzzle::from_definition(&decoded).unwrap();
        assert_eq!(rebuilt, original);
    }

    // ============================================================================
    // REPLAY REJECTION TESTS
    // ============================================================================

    #[test]
    fn test_from_definition_rejects_bad_grid() {
        let definition = PuzzleDefinition {
            columns: 2,
            rows: 5,
            islands: vec![],
            bridges: vec![],
        };
        assert_eq!(
            Puzzle::from_definition(&definition).unwrap_err(),
            HashiError::Size
        );
    }

    #[test]
    fn test_from_definition_rejects_out_of_bounds_island() {
        let definition = PuzzleDefinition {
            columns: 5,
            rows: 5,
            islands: vec![IslandDefinition { column: 7, row: 0, required: 1 }],
            bridges: vec![],
        };
        assert_eq!(
            Puzzle::from_definition(&definition).unwrap_err(),
            HashiError::OutOfBounds { position: at(7, 0) }
        );
    }

    #[test]
    fn test_from_definition_rejects_adjacent_islands() {
        // Test: The spacing rule applies to stored puzzles too
        let definition = PuzzleDefinition {
            columns: 5,
            rows: 5,
            islands: vec![
                IslandDefinition { column: 2, row: 2, required: 1 },
                IslandDefinition { column: 2, row: 3, required: 1 },
            ],
            bridges: vec![],
        };
        assert_eq!(
            Puzzle::from_definition(&definition).unwrap_err(),
            HashiError::AdjacentIsland { position: at(2, 3) }
        );
    }

    #[test]
    fn test_from_definition_rejects_bad_island_index() {
        let definition = PuzzleDefinition {
            columns: 5,
            rows: 5,
            islands: vec![
                IslandDefinition { column: 0, row: 0, required: 1 },
                IslandDefinition { column: 0, row: 4, required: 1 },
            ],
            bridges: vec![BridgeDefinition { from: 0, to: 2, double: false }],
        };
        assert_eq!(
            Puzzle::from_definition(&definition).unwrap_err(),
            HashiError::BadIslandIndex { index: 2 }
        );
    }

    #[test]
    fn test_from_definition_rejects_first_invalid_bridge_entry() {
        // Test: A double between single-capacity islands fails as an invalid
        // move, and nothing after the bad entry is replayed
        let definition = PuzzleDefinition {
            columns: 5,
            rows: 5,
            islands: vec![
                IslandDefinition { column: 0, row: 0, required: 1 },
                IslandDefinition { column: 0, row: 4, required: 1 },
                IslandDefinition { column: 4, row: 0, required: 1 },
            ],
            bridges: vec![
                BridgeDefinition { from: 0, to: 1, double: true },
                BridgeDefinition { from: 0, to: 2, double: false },
            ],
        };
        assert_eq!(
            Puzzle::from_definition(&definition).unwrap_err(),
            HashiError::InvalidBridgeEntry { from: 0, to: 1 }
        );
    }

    #[test]
    fn test_from_definition_rejects_crossing_bridge_entry() {
        let definition = PuzzleDefinition {
            columns: 5,
            rows: 5,
            islands: vec![
                IslandDefinition { column: 2, row: 0, required: 1 },
                IslandDefinition { column: 2, row: 4, required: 1 },
                IslandDefinition { column: 0, row: 2, required: 1 },
                IslandDefinition { column: 4, row: 2, required: 1 },
            ],
            bridges: vec![
                BridgeDefinition { from: 0, to: 1, double: false },
                BridgeDefinition { from: 2, to: 3, double: false },
            ],
        };
        assert_eq!(
            Puzzle::from_definition(&definition).unwrap_err(),
            HashiError::InvalidBridgeEntry { from: 2, to: 3 }
        );
    }

    #[test]
    fn test_from_definition_replays_double_bridges() {
        let definition = PuzzleDefinition {
            columns: 5,
            rows: 5,
            islands: vec![
                IslandDefinition { column: 0, row: 2, required: 2 },
                IslandDefinition { column: 4, row: 2, required: 2 },
            ],
            bridges: vec![BridgeDefinition { from: 0, to: 1, double: true }],
        };
        let puzzle = Puzzle::from_definition(&definition).unwrap();
        assert_eq!(
            puzzle.bridge_between(at(0, 2), at(4, 2)),
            Some(BridgeKind::Double)
        );
    }
}
