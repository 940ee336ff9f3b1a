use grid_util::Point;
use log::info;
use rand::prelude::*;

use crate::MazeGrid;

/// Where the generator is in its run. Derived from the backtracking stack
/// and the origin's visited flag, so the two empty-stack situations stay
/// distinguishable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorState {
    /// No step has been taken yet.
    NotStarted,
    /// The backtracking stack is non-empty.
    Active,
    /// The stack emptied after the origin was visited: every cell has been
    /// reached and the carved passages form a spanning tree.
    Complete,
}

/// Carves a maze into a [MazeGrid] with randomized depth-first
/// backtracking, one step per [step](MazeGenerator::step) call.
///
/// Each step is exactly one of: visit the origin, carve into a random
/// unvisited neighbour, or backtrack. Only ever carving into unvisited
/// cells is what makes the result a spanning tree: connected, acyclic,
/// every cell reachable.
#[derive(Clone, Debug)]
pub struct MazeGenerator {
    stack: Vec<Point>,
    rng: StdRng,
}

impl MazeGenerator {
    pub fn new() -> MazeGenerator {
        MazeGenerator {
            stack: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// A generator with a fixed seed carves the same maze every run.
    pub fn with_seed(seed: u64) -> MazeGenerator {
        MazeGenerator {
            stack: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The current depth-first path, origin first, active cell last.
    pub fn stack(&self) -> &[Point] {
        &self.stack
    }

    pub fn state(&self, grid: &MazeGrid) -> GeneratorState {
        if !self.stack.is_empty() {
            GeneratorState::Active
        } else if grid.visited(Point::new(0, 0)) {
            GeneratorState::Complete
        } else {
            GeneratorState::NotStarted
        }
    }

    pub fn is_complete(&self, grid: &MazeGrid) -> bool {
        self.state(grid) == GeneratorState::Complete
    }

    /// Advances generation by a single step and returns the state after it.
    /// Stepping a complete maze is a no-op.
    pub fn step(&mut self, grid: &mut MazeGrid) -> GeneratorState {
        let Some(&current) = self.stack.last() else {
            let origin = Point::new(0, 0);
            if grid.visited(origin) {
                return GeneratorState::Complete;
            }
            grid.set_visited(origin);
            self.stack.push(origin);
            return GeneratorState::Active;
        };
        let neighbours = grid.unvisited_neighbours(current);
        if let Some(&next) = neighbours.choose(&mut self.rng) {
            grid.set_visited(next);
            grid.remove_wall_between(current, next);
            self.stack.push(next);
            GeneratorState::Active
        } else {
            // Dead end: backtrack towards the most recent cell that still
            // has unexplored neighbours.
            self.stack.pop();
            if self.stack.is_empty() {
                info!("Maze generation complete");
                GeneratorState::Complete
            } else {
                GeneratorState::Active
            }
        }
    }

    /// Runs the generator until the maze is complete.
    pub fn generate(&mut self, grid: &mut MazeGrid) {
        while self.step(grid) != GeneratorState::Complete {}
    }
}

impl Default for MazeGenerator {
    fn default() -> MazeGenerator {
        MazeGenerator::new()
    }
}
