use crate::analyser::Analyser;
use crate::puzzle::{
    DIRECTIONS, Direction, HashiError, MAX_DIMENSION, MAX_REQUIRED, MIN_DIMENSION, Position,
    Puzzle, Span,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Bound on the randomized constructive search. One attempt either grows a
/// puzzle to the requested island count or paints itself into a corner.
const MAX_ATTEMPTS: u32 = 100;

/// Generate a puzzle with exactly `island_count` islands, known to be
/// solvable: the generator builds a connected bridge graph first and derives
/// every island's requirement from it, so the construction itself is one
/// solution of the emitted (bridge-free) puzzle.
pub fn generate(columns: u8, rows: u8, island_count: u16) -> Result<Puzzle, HashiError> {
    let mut rng = rand::rng();
    let rng = SmallRng::from_rng(&mut rng);
    generate_with(columns, rows, island_count, rng)
}

/// Deterministic variant: a fixed seed always yields the same puzzle.
pub fn generate_with_seed(
    columns: u8,
    rows: u8,
    island_count: u16,
    seed: u64,
) -> Result<Puzzle, HashiError> {
    let rng = SmallRng::seed_from_u64(seed);
    generate_with(columns, rows, island_count, rng)
}

fn generate_with(
    columns: u8,
    rows: u8,
    island_count: u16,
    mut rng: SmallRng,
) -> Result<Puzzle, HashiError> {
    let valid = MIN_DIMENSION..=MAX_DIMENSION;
    if !valid.contains(&columns) || !valid.contains(&rows) {
        return Err(HashiError::Size);
    }
    // A fifth of the grid keeps enough empty cells for the spacing rules to
    // have room to work with.
    let max = (columns as u16 * rows as u16) / 5;
    if island_count < 2 || island_count > max {
        return Err(HashiError::IslandCount {
            count: island_count,
            min: 2,
            max,
        });
    }

    for _ in 0..MAX_ATTEMPTS {
        if let Some(puzzle) = attempt(columns, rows, island_count, &mut rng) {
            return Ok(puzzle);
        }
    }
    Err(HashiError::GenerationExhausted {
        attempts: MAX_ATTEMPTS,
    })
}

/// One constructive attempt, or `None` when the frontier dies out before the
/// target count is reached.
///
/// Growth works outward from a random first island: pick a frontier island,
/// pick a direction it has not bridged yet, place a new island somewhere
/// along that ray and bridge the pair immediately. Requirements are
/// placeholders until the graph is complete, then every island's requirement
/// is fixed to its actual bridge count and the bridges are cleared.
fn attempt(columns: u8, rows: u8, island_count: u16, rng: &mut SmallRng) -> Option<Puzzle> {
    let mut puzzle = Puzzle::new(columns, rows).ok()?;

    let first = Position {
        column: rng.random_range(0..columns),
        row: rng.random_range(0..rows),
    };
    puzzle.build_island(first, MAX_REQUIRED).ok()?;

    let mut frontier = vec![first];
    while puzzle.island_count() < island_count as usize {
        if frontier.is_empty() {
            return None;
        }
        let index = rng.random_range(0..frontier.len());
        let island = frontier[index];

        let open: Vec<(Direction, Vec<Position>)> = DIRECTIONS
            .into_iter()
            .filter(|direction| !has_bridge_towards(&puzzle, island, *direction))
            .map(|direction| (direction, candidate_cells(&puzzle, island, direction)))
            .filter(|(_, candidates)| !candidates.is_empty())
            .collect();

        // An island with nowhere left to grow leaves the frontier for good
        if open.is_empty() {
            frontier.swap_remove(index);
            continue;
        }
        let (_, candidates) = &open[rng.random_range(0..open.len())];
        let target = candidates[rng.random_range(0..candidates.len())];

        puzzle.build_island(target, MAX_REQUIRED).ok()?;
        puzzle.build_bridge(island, target).ok()?;
        if rng.random::<f64>() < 0.5 {
            puzzle.build_bridge(island, target).ok()?;
        }
        frontier.push(target);
    }

    puzzle.finalise_required();
    puzzle.remove_all_bridges();
    Some(puzzle)
}

fn has_bridge_towards(puzzle: &Puzzle, island: Position, direction: Direction) -> bool {
    puzzle
        .neighbour(island, direction)
        .is_some_and(|neighbour| puzzle.bridge_between(island, neighbour).is_some())
}

/// Cells along the ray from `island` where a new bridged island could go.
///
/// The direction needs room first: at least three empty cells before the
/// first obstruction (the next island on the ray, or the grid edge), i.e. a
/// distance of four to the blocker. Within that room the walk stops at the
/// first cell whose connecting span would cross an existing bridge (any
/// longer span contains that crossing too). A cell qualifies when it leaves
/// a gap of at least one empty cell to the source and passes the island
/// placement rules.
fn candidate_cells(puzzle: &Puzzle, island: Position, direction: Direction) -> Vec<Position> {
    if free_run(puzzle, island, direction) < 3 {
        return Vec::new();
    }
    let analyser = Analyser::new(puzzle);
    let mut candidates = Vec::new();
    let mut cell = island;
    let mut distance = 0u8;
    while let Some(next) = cell.step(direction) {
        if !puzzle.contains(next) || puzzle.island(next).is_some() {
            break;
        }
        cell = next;
        distance += 1;
        let Ok(span) = Span::new(island, cell) else {
            break;
        };
        if puzzle.is_any_bridge_crossing(span) {
            break;
        }
        if distance >= 2 && analyser.is_valid_island_position(cell) {
            candidates.push(cell);
        }
    }
    candidates
}

/// Number of consecutive empty cells from `island` along `direction`, up to
/// the first island or the grid edge.
fn free_run(puzzle: &Puzzle, island: Position, direction: Direction) -> u8 {
    let mut run = 0;
    let mut cell = island;
    while let Some(next) = cell.step(direction) {
        if !puzzle.contains(next) || puzzle.island(next).is_some() {
            break;
        }
        cell = next;
        run += 1;
    }
    run
}
