use fxhash::FxBuildHasher;
use grid_util::grid::{BoolGrid, ValueGrid};
use grid_util::Point;
use indexmap::IndexSet;
use log::{info, warn};

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::MazeGrid;

type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

/// g-score of a cell the search has not discovered yet.
const UNDISCOVERED: i32 = i32::MAX;
/// Predecessor sentinel for the start cell.
const NO_PARENT: usize = usize::MAX;

/// Where the search is in its run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    Searching,
    /// The goal was selected from the frontier and the path reconstructed.
    Found,
    /// The open set emptied before the goal was selected. Impossible on a
    /// complete maze, but a grid with re-inserted walls terminates here
    /// instead of looping or panicking.
    Exhausted,
}

/// Heap entry ordering the frontier by estimated cost, so that the next
/// expansion is found in logarithmic rather than linear time. Equal
/// estimates fall back to the largest known cost (the deeper candidate),
/// then the smallest cell index, which makes the expansion order fully
/// deterministic for a fixed maze.
#[derive(Clone, Debug)]
struct FrontierEntry {
    estimated_cost: i32,
    cost: i32,
    index: usize,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.estimated_cost == other.estimated_cost
            && self.cost == other.cost
            && self.index == other.index
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed on estimated cost so the max-heap pops the smallest
        // estimate first.
        match other.estimated_cost.cmp(&self.estimated_cost) {
            Ordering::Equal => match self.cost.cmp(&other.cost) {
                Ordering::Equal => other.index.cmp(&self.index),
                s => s,
            },
            s => s,
        }
    }
}

/// Runs A* from the grid origin to the opposite corner through carved
/// passages, one frontier expansion per [step](Pathfinder::step) call.
///
/// Search state lives in flat arrays indexed `y * width + x`: parallel
/// g/f/predecessor arrays, a [BoolGrid] closed set, and an open set whose
/// membership is kept in discovery order, with a [BinaryHeap] selecting the
/// next cell to expand. The [MazeGrid] itself is never mutated; walls are
/// read through [passage_neighbours](MazeGrid::passage_neighbours) only.
///
/// The heuristic is the
/// [Manhattan distance](https://en.wikipedia.org/wiki/Taxicab_geometry),
/// which never overestimates on a 4-connected unit-cost grid.
#[derive(Clone, Debug)]
pub struct Pathfinder {
    width: usize,
    height: usize,
    start: Point,
    goal: Point,
    open: FxIndexSet<usize>,
    closed: BoolGrid,
    g_score: Vec<i32>,
    f_score: Vec<i32>,
    parent: Vec<usize>,
    heap: BinaryHeap<FrontierEntry>,
    state: SearchState,
    path: Vec<Point>,
}

impl Pathfinder {
    /// Prepares a search over `grid` from its origin to its far corner.
    pub fn new(grid: &MazeGrid) -> Pathfinder {
        let width = grid.width();
        let height = grid.height();
        let start = Point::new(0, 0);
        let goal = Point::new(width as i32 - 1, height as i32 - 1);
        info!("Preparing A* search from {} to {}", start, goal);
        let len = width * height;
        let mut finder = Pathfinder {
            width,
            height,
            start,
            goal,
            open: FxIndexSet::default(),
            closed: BoolGrid::new(width, height, false),
            g_score: vec![UNDISCOVERED; len],
            f_score: vec![UNDISCOVERED; len],
            parent: vec![NO_PARENT; len],
            heap: BinaryHeap::new(),
            state: SearchState::Searching,
            path: Vec::new(),
        };
        let start_ix = finder.cell_ix(start);
        finder.g_score[start_ix] = 0;
        finder.f_score[start_ix] = start.manhattan_distance(&goal);
        finder.open.insert(start_ix);
        finder.heap.push(FrontierEntry {
            estimated_cost: finder.f_score[start_ix],
            cost: 0,
            index: start_ix,
        });
        finder
    }

    fn cell_ix(&self, p: Point) -> usize {
        p.y as usize * self.width + p.x as usize
    }

    fn in_range(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height
    }

    fn point(&self, ix: usize) -> Point {
        Point::new((ix % self.width) as i32, (ix / self.width) as i32)
    }

    /// Performs one frontier expansion and returns the state after it.
    /// Stepping a finished or exhausted search is a no-op.
    pub fn step(&mut self, grid: &MazeGrid) -> SearchState {
        debug_assert!(grid.width() == self.width && grid.height() == self.height);
        if self.state != SearchState::Searching {
            return self.state;
        }
        // Cells can be pushed several times when a cheaper route to them is
        // found before they are expanded. Discard entries that no longer
        // match the live open set so each step expands exactly one cell.
        let current_ix = loop {
            match self.heap.pop() {
                None => {
                    warn!("Open set exhausted before the goal was selected, are all passages carved?");
                    self.state = SearchState::Exhausted;
                    return self.state;
                }
                Some(entry) => {
                    if self.open.contains(&entry.index) && entry.cost == self.g_score[entry.index]
                    {
                        break entry.index;
                    }
                }
            }
        };
        let current = self.point(current_ix);
        if current == self.goal {
            self.state = SearchState::Found;
            self.reconstruct_path();
            return self.state;
        }
        self.open.shift_remove(&current_ix);
        self.closed.set_point(current, true);
        for neighbour in grid.passage_neighbours(current) {
            if self.closed.get_point(neighbour) {
                continue;
            }
            let neighbour_ix = self.cell_ix(neighbour);
            let tentative = self.g_score[current_ix] + 1;
            if tentative >= self.g_score[neighbour_ix] {
                continue;
            }
            self.parent[neighbour_ix] = current_ix;
            self.g_score[neighbour_ix] = tentative;
            self.f_score[neighbour_ix] = tentative + neighbour.manhattan_distance(&self.goal);
            self.open.insert(neighbour_ix);
            self.heap.push(FrontierEntry {
                estimated_cost: self.f_score[neighbour_ix],
                cost: tentative,
                index: neighbour_ix,
            });
        }
        self.state
    }

    /// Steps until the search terminates and returns the terminal state.
    pub fn run(&mut self, grid: &MazeGrid) -> SearchState {
        while self.step(grid) == SearchState::Searching {}
        self.state
    }

    fn reconstruct_path(&mut self) {
        let mut path: Vec<Point> = itertools::unfold(self.cell_ix(self.goal), |ix| {
            (*ix != NO_PARENT).then(|| {
                let p = self.point(*ix);
                *ix = self.parent[*ix];
                p
            })
        })
        .collect();
        path.reverse();
        self.path = path;
    }

    /// State after the most recent step.
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Whether the goal has been reached and the path is available.
    pub fn is_finished(&self) -> bool {
        self.state == SearchState::Found
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn goal(&self) -> Point {
        self.goal
    }

    /// Whether `p` is in the open set. Cells outside the grid are in
    /// neither set.
    pub fn open(&self, p: Point) -> bool {
        self.in_range(p) && self.open.contains(&self.cell_ix(p))
    }

    /// Whether `p` is in the closed set.
    pub fn closed(&self, p: Point) -> bool {
        self.in_range(p) && self.closed.get_point(p)
    }

    /// Open cells in discovery order.
    pub fn open_cells(&self) -> impl Iterator<Item = Point> + '_ {
        self.open.iter().map(|&ix| self.point(ix))
    }

    /// Closed cells in row-major order.
    pub fn closed_cells(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.width * self.height)
            .map(|ix| self.point(ix))
            .filter(|p| self.closed.get_point(*p))
    }

    /// Best known cost from the start, if `p` has been discovered.
    pub fn g_score(&self, p: Point) -> Option<i32> {
        self.in_range(p)
            .then(|| self.g_score[self.cell_ix(p)])
            .filter(|&g| g != UNDISCOVERED)
    }

    /// Estimated total cost through `p`, if `p` has been discovered.
    pub fn f_score(&self, p: Point) -> Option<i32> {
        self.in_range(p)
            .then(|| self.f_score[self.cell_ix(p)])
            .filter(|&f| f != UNDISCOVERED)
    }

    /// The start-to-goal path, inclusive on both ends, available once the
    /// search has finished.
    pub fn path(&self) -> Option<&[Point]> {
        (self.state == SearchState::Found).then_some(self.path.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MazeGenerator, Wall};

    fn carved_grid(width: usize, height: usize, seed: u64) -> MazeGrid {
        let mut grid = MazeGrid::new(width, height);
        MazeGenerator::with_seed(seed).generate(&mut grid);
        grid
    }

    #[test]
    fn single_cell_finishes_immediately() {
        let grid = MazeGrid::new(1, 1);
        let mut finder = Pathfinder::new(&grid);
        assert_eq!(finder.step(&grid), SearchState::Found);
        assert!(finder.is_finished());
        assert_eq!(finder.path(), Some(&[Point::new(0, 0)][..]));
    }

    #[test]
    fn two_cell_path() {
        let mut grid = MazeGrid::new(2, 1);
        grid.remove_wall_between(Point::new(0, 0), Point::new(1, 0));
        let mut finder = Pathfinder::new(&grid);
        assert_eq!(finder.step(&grid), SearchState::Searching);
        assert!(finder.closed(Point::new(0, 0)));
        assert!(finder.open(Point::new(1, 0)));
        assert_eq!(finder.step(&grid), SearchState::Found);
        assert_eq!(
            finder.path(),
            Some(&[Point::new(0, 0), Point::new(1, 0)][..])
        );
        assert_eq!(finder.g_score(Point::new(1, 0)), Some(1));
    }

    #[test]
    fn open_grid_path_is_manhattan_optimal() {
        // Carve every wall pair: the shortest path is the Manhattan
        // distance plus one cells long.
        let mut grid = MazeGrid::new(4, 3);
        for y in 0..3 {
            for x in 0..4 {
                let p = Point::new(x, y);
                for wall in [Wall::East, Wall::South] {
                    if let Some(n) = grid.neighbour(p, wall) {
                        grid.remove_wall_between(p, n);
                    }
                }
            }
        }
        let mut finder = Pathfinder::new(&grid);
        assert_eq!(finder.run(&grid), SearchState::Found);
        assert_eq!(finder.path().unwrap().len(), 3 + 2 + 1);
    }

    #[test]
    fn walled_off_goal_exhausts_quietly() {
        let mut grid = carved_grid(3, 3, 5);
        let goal = Point::new(2, 2);
        for wall in [Wall::North, Wall::West] {
            if let Some(n) = grid.neighbour(goal, wall) {
                grid.insert_wall_between(goal, n);
            }
        }
        let mut finder = Pathfinder::new(&grid);
        assert_eq!(finder.run(&grid), SearchState::Exhausted);
        assert!(!finder.is_finished());
        assert_eq!(finder.path(), None);
        // Further steps stay exhausted.
        assert_eq!(finder.step(&grid), SearchState::Exhausted);
    }

    #[test]
    fn step_after_found_changes_nothing() {
        let grid = carved_grid(5, 5, 8);
        let mut finder = Pathfinder::new(&grid);
        assert_eq!(finder.run(&grid), SearchState::Found);
        let path = finder.path().unwrap().to_vec();
        let open_before: Vec<Point> = finder.open_cells().collect();
        let closed_before: Vec<Point> = finder.closed_cells().collect();
        for _ in 0..3 {
            assert_eq!(finder.step(&grid), SearchState::Found);
        }
        assert_eq!(finder.path().unwrap(), path.as_slice());
        assert_eq!(finder.open_cells().collect::<Vec<_>>(), open_before);
        assert_eq!(finder.closed_cells().collect::<Vec<_>>(), closed_before);
    }

    #[test]
    fn open_and_closed_stay_disjoint() {
        let grid = carved_grid(6, 6, 2);
        let mut finder = Pathfinder::new(&grid);
        while finder.step(&grid) == SearchState::Searching {
            for p in finder.open_cells() {
                assert!(!finder.closed(p));
            }
            for p in finder.closed_cells() {
                assert!(!finder.open(p));
            }
        }
        assert!(finder.is_finished());
    }

    #[test]
    fn goal_stays_in_open_set_when_found() {
        let grid = carved_grid(4, 4, 1);
        let mut finder = Pathfinder::new(&grid);
        finder.run(&grid);
        assert!(finder.open(finder.goal()));
        assert!(!finder.closed(finder.goal()));
    }

    #[test]
    fn search_is_deterministic() {
        let grid = carved_grid(8, 8, 13);
        let mut first = Pathfinder::new(&grid);
        let mut second = Pathfinder::new(&grid);
        let mut first_steps = 0;
        while first.step(&grid) == SearchState::Searching {
            first_steps += 1;
        }
        let mut second_steps = 0;
        while second.step(&grid) == SearchState::Searching {
            second_steps += 1;
        }
        assert_eq!(first_steps, second_steps);
        assert_eq!(first.path(), second.path());
        assert_eq!(
            first.closed_cells().collect::<Vec<_>>(),
            second.closed_cells().collect::<Vec<_>>()
        );
    }
}
