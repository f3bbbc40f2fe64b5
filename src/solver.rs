use crate::analyser::{Analyser, Status};
use crate::puzzle::{BridgeKind, Position, Puzzle, Span};
use std::collections::BTreeSet;

/// One solver step. Applying a move is a single `build_bridge(from, to)`
/// call; an upgrade to a double bridge happens through the same mechanism on
/// a later step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Position,
    pub to: Position,
}

/// The next provably reasonable bridge, or `None` when neither the safe rule
/// nor the lookahead fallback finds one. A stuck puzzle is a normal outcome.
pub fn next_move(puzzle: &Puzzle) -> Option<Move> {
    safe_move(puzzle).or_else(|| sole_viable_move(puzzle))
}

/// Apply moves until none remains and report where that left the puzzle.
pub fn solve(puzzle: &mut Puzzle) -> Status {
    while let Some(step) = next_move(puzzle) {
        // next_move only proposes bridges that build_bridge accepts; bail
        // out rather than loop forever if that ever stops holding
        if puzzle.build_bridge(step.from, step.to).is_err() {
            break;
        }
    }
    Analyser::new(puzzle).status()
}

/// The deductive counting rule, swept over islands in sorted order.
///
/// For an unfinished island with remaining count `r` and valid destination
/// set `D`: `r == 2|D|` forces a double bridge to every destination, and
/// `r == 2|D| - 1` forces at least a single to every destination. The first
/// destination that does not already carry the forced amount is the move.
fn safe_move(puzzle: &Puzzle) -> Option<Move> {
    let analyser = Analyser::new(puzzle);
    for (position, _) in puzzle.islands() {
        let remaining = puzzle.remaining_bridges(position) as usize;
        if remaining == 0 {
            continue;
        }
        let destinations = analyser.valid_destinations(position, false);
        if destinations.is_empty() {
            continue;
        }

        if remaining == 2 * destinations.len() {
            for destination in &destinations {
                if puzzle.bridge_between(position, *destination) != Some(BridgeKind::Double) {
                    return Some(Move { from: position, to: *destination });
                }
            }
        } else if remaining == 2 * destinations.len() - 1 {
            for destination in &destinations {
                if puzzle.bridge_between(position, *destination).is_none() {
                    return Some(Move { from: position, to: *destination });
                }
            }
        }
    }
    None
}

/// Bounded lookahead fallback: try every valid bridge on a scratch copy and
/// keep the ones that leave no island without a destination. Only a uniquely
/// surviving bridge is trusted; zero or several survivors mean no move.
fn sole_viable_move(puzzle: &Puzzle) -> Option<Move> {
    let analyser = Analyser::new(puzzle);
    // Unordered: (a, b) and (b, a) are the same hypothesis
    let mut viable: BTreeSet<Span> = BTreeSet::new();

    for (position, _) in puzzle.islands() {
        if puzzle.remaining_bridges(position) == 0 {
            continue;
        }
        for destination in analyser.valid_destinations(position, false) {
            let Ok(span) = Span::new(position, destination) else {
                continue;
            };
            if viable.contains(&span) {
                continue;
            }
            let mut trial = puzzle.clone();
            if trial.build_bridge(position, destination).is_err() {
                continue;
            }
            if Analyser::new(&trial).status() != Status::Unsolvable {
                viable.insert(span);
                if viable.len() > 1 {
                    return None;
                }
            }
        }
    }

    if viable.len() == 1 {
        viable.first().map(|span| Move {
            from: span.start(),
            to: span.end(),
        })
    } else {
        None
    }
}
