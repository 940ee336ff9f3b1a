//! # grid_maze
//!
//! Stepwise maze generation and pathfinding on a rectangular grid. A
//! [MazeGenerator] carves a
//! [spanning tree](https://en.wikipedia.org/wiki/Spanning_tree_(mathematics))
//! of passages using randomized
//! [depth-first backtracking](https://en.wikipedia.org/wiki/Maze_generation_algorithm#Randomized_depth-first_search)
//! and a [Pathfinder] searches the carved passages with
//! [A*](https://en.wikipedia.org/wiki/A*_search_algorithm). Both advance by
//! one unit of work per `step` call so a driver can interleave rendering.
//! The grid tracks
//! [connected components](https://en.wikipedia.org/wiki/Component_(graph_theory))
//! of carved passages incrementally, so reachability can be queried at any
//! point without a search.
mod generator;
mod pathfinder;

pub use crate::generator::{GeneratorState, MazeGenerator};
pub use crate::pathfinder::{Pathfinder, SearchState};

use grid_util::grid::{BoolGrid, SimpleValueGrid, ValueGrid};
use grid_util::Point;
use log::info;
use petgraph::unionfind::UnionFind;

use core::fmt;

const ALL_WALLS: u8 = 0b1111;

/// A side of a cell. Wall flags are packed per cell into a [u8] mask, one
/// bit per side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wall {
    North,
    South,
    East,
    West,
}

impl Wall {
    pub const SIDES: [Wall; 4] = [Wall::North, Wall::South, Wall::East, Wall::West];

    fn bit(self) -> u8 {
        match self {
            Wall::North => 1 << 0,
            Wall::South => 1 << 1,
            Wall::East => 1 << 2,
            Wall::West => 1 << 3,
        }
    }

    /// The same boundary seen from the adjacent cell.
    pub fn opposite(self) -> Wall {
        match self {
            Wall::North => Wall::South,
            Wall::South => Wall::North,
            Wall::East => Wall::West,
            Wall::West => Wall::East,
        }
    }

    /// Unit offset towards the cell behind this wall. Row 0 is the top row,
    /// so north is `y - 1` and south is `y + 1`.
    pub fn offset(self) -> Point {
        match self {
            Wall::North => Point::new(0, -1),
            Wall::South => Point::new(0, 1),
            Wall::East => Point::new(1, 0),
            Wall::West => Point::new(-1, 0),
        }
    }

    /// The side of `from` that faces the adjacent cell `to`.
    /// Panics if the two cells are not grid-adjacent.
    pub fn towards(from: Point, to: Point) -> Wall {
        match (to.x - from.x, to.y - from.y) {
            (0, -1) => Wall::North,
            (0, 1) => Wall::South,
            (1, 0) => Wall::East,
            (-1, 0) => Wall::West,
            _ => panic!("cells {} and {} are not adjacent", from, to),
        }
    }
}

/// [MazeGrid] is a rectangular grid of cells that start out fully walled in.
/// Wall flags are packed in [u8] format in a [SimpleValueGrid] for fast
/// lookups, visitation flags live in a [BoolGrid], and a [UnionFind]
/// structure records which cells have been joined by carved passages.
///
/// Wall state is mutated exclusively through the pairwise operations so that
/// the two facing flags of a boundary always agree and boundary-facing walls
/// stay intact.
#[derive(Clone, Debug)]
pub struct MazeGrid {
    walls: SimpleValueGrid<u8>,
    visited: BoolGrid,
    components: UnionFind<usize>,
    components_dirty: bool,
}

impl MazeGrid {
    /// Creates a fully walled grid. Panics if either dimension is zero.
    pub fn new(width: usize, height: usize) -> MazeGrid {
        assert!(
            width > 0 && height > 0,
            "grid dimensions must be positive, got {}x{}",
            width,
            height
        );
        MazeGrid {
            walls: SimpleValueGrid::new(width, height, ALL_WALLS),
            visited: BoolGrid::new(width, height, false),
            components: UnionFind::new(width * height),
            components_dirty: false,
        }
    }

    pub fn width(&self) -> usize {
        self.visited.width()
    }

    pub fn height(&self) -> usize {
        self.visited.height()
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.visited.index_in_bounds(x, y)
    }

    /// Whether `p` lies inside the grid.
    pub fn contains(&self, p: Point) -> bool {
        self.in_bounds(p.x, p.y)
    }

    /// Flat row-major index of `p` (`y * width + x`), for collaborators that
    /// keep parallel arrays. Panics if `p` is out of bounds.
    pub fn get_ix(&self, p: Point) -> usize {
        assert!(self.contains(p), "{} lies outside the grid", p);
        p.y as usize * self.width() + p.x as usize
    }

    /// Whether the wall on side `wall` of cell `p` is present.
    /// Panics if `p` is out of bounds.
    pub fn has_wall(&self, p: Point, wall: Wall) -> bool {
        assert!(self.contains(p), "{} lies outside the grid", p);
        self.walls.get_point(p) & wall.bit() != 0
    }

    /// Whether `p` has been visited by the generator.
    /// Panics if `p` is out of bounds.
    pub fn visited(&self, p: Point) -> bool {
        assert!(self.contains(p), "{} lies outside the grid", p);
        self.visited.get_point(p)
    }

    pub(crate) fn set_visited(&mut self, p: Point) {
        self.visited.set_point(p, true);
    }

    /// The cell on the other side of `wall`, if it is in bounds.
    pub fn neighbour(&self, p: Point, wall: Wall) -> Option<Point> {
        let offset = wall.offset();
        let n = Point::new(p.x + offset.x, p.y + offset.y);
        self.contains(n).then_some(n)
    }

    /// Unvisited in-bounds neighbours of `p`, probed in N/S/E/W order. The
    /// generator draws uniformly from this set.
    pub fn unvisited_neighbours(&self, p: Point) -> Vec<Point> {
        Wall::SIDES
            .into_iter()
            .filter_map(|wall| self.neighbour(p, wall))
            .filter(|n| !self.visited.get_point(*n))
            .collect::<Vec<Point>>()
    }

    /// Neighbours of `p` reachable through carved passages.
    pub fn passage_neighbours(&self, p: Point) -> Vec<Point> {
        Wall::SIDES
            .into_iter()
            .filter(|wall| !self.has_wall(p, *wall))
            .filter_map(|wall| self.neighbour(p, wall))
            .collect::<Vec<Point>>()
    }

    /// Carves the mutual wall between two adjacent cells, clearing both
    /// facing flags in one operation and joining their components.
    pub(crate) fn remove_wall_between(&mut self, a: Point, b: Point) {
        let wall = Wall::towards(a, b);
        self.set_wall(a, wall, false);
        self.set_wall(b, wall.opposite(), false);
        self.components.union(self.get_ix(a), self.get_ix(b));
    }

    /// Re-walls a pair of adjacent cells. Flags the components as dirty
    /// since the passage graph may have been split apart.
    pub fn insert_wall_between(&mut self, a: Point, b: Point) {
        let wall = Wall::towards(a, b);
        self.set_wall(a, wall, true);
        self.set_wall(b, wall.opposite(), true);
        self.components_dirty = true;
    }

    fn set_wall(&mut self, p: Point, wall: Wall, present: bool) {
        assert!(self.contains(p), "{} lies outside the grid", p);
        let mask = self.walls.get_point(p);
        let mask = if present {
            mask | wall.bit()
        } else {
            mask & !wall.bit()
        };
        self.walls.set_point(p, mask);
    }

    /// Regenerates the components if they are marked as dirty.
    pub fn update(&mut self) {
        if self.components_dirty {
            info!("Passage components are dirty: regenerating components");
            self.generate_components();
        }
    }

    /// Generates a new [UnionFind] structure and joins cells connected by a
    /// carved passage.
    pub fn generate_components(&mut self) {
        let w = self.width();
        let h = self.height();
        self.components = UnionFind::new(w * h);
        self.components_dirty = false;
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let p = Point::new(x, y);
                // Walls are symmetric, so probing east and south once per
                // cell covers every pair.
                for wall in [Wall::East, Wall::South] {
                    if !self.has_wall(p, wall) {
                        if let Some(n) = self.neighbour(p, wall) {
                            self.components.union(self.get_ix(p), self.get_ix(n));
                        }
                    }
                }
            }
        }
    }

    /// Checks if two cells are joined by carved passages.
    pub fn reachable(&self, a: &Point, b: &Point) -> bool {
        !self.unreachable(a, b)
    }

    /// Checks if two cells are not joined by carved passages.
    pub fn unreachable(&self, a: &Point, b: &Point) -> bool {
        if self.contains(*a) && self.contains(*b) {
            !self.components.equiv(self.get_ix(*a), self.get_ix(*b))
        } else {
            true
        }
    }

    /// Number of carved wall pairs. A complete maze on `n` cells has exactly
    /// `n - 1`, the spanning-tree count.
    pub fn passage_count(&self) -> usize {
        let mut count = 0;
        for y in 0..self.height() as i32 {
            for x in 0..self.width() as i32 {
                let p = Point::new(x, y);
                for wall in [Wall::East, Wall::South] {
                    if self.neighbour(p, wall).is_some() && !self.has_wall(p, wall) {
                        count += 1;
                    }
                }
            }
        }
        count
    }
}

impl fmt::Display for MazeGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in 0..self.height() as i32 {
            for x in 0..self.width() as i32 {
                let p = Point::new(x, y);
                let north = if self.has_wall(p, Wall::North) { "---" } else { "   " };
                write!(f, "+{}", north)?;
            }
            writeln!(f, "+")?;
            for x in 0..self.width() as i32 {
                let p = Point::new(x, y);
                let west = if self.has_wall(p, Wall::West) { "|" } else { " " };
                write!(f, "{}   ", west)?;
            }
            // The east side of the last column is a boundary wall.
            writeln!(f, "|")?;
        }
        for _ in 0..self.width() {
            write!(f, "+---")?;
        }
        writeln!(f, "+")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_fully_walled() {
        let grid = MazeGrid::new(3, 2);
        for y in 0..2 {
            for x in 0..3 {
                let p = Point::new(x, y);
                assert!(!grid.visited(p));
                for wall in Wall::SIDES {
                    assert!(grid.has_wall(p, wall));
                }
            }
        }
        assert_eq!(grid.passage_count(), 0);
    }

    #[test]
    fn carving_clears_both_sides() {
        let mut grid = MazeGrid::new(2, 1);
        grid.remove_wall_between(Point::new(0, 0), Point::new(1, 0));
        assert!(!grid.has_wall(Point::new(0, 0), Wall::East));
        assert!(!grid.has_wall(Point::new(1, 0), Wall::West));
        // The remaining walls are untouched.
        assert!(grid.has_wall(Point::new(0, 0), Wall::North));
        assert!(grid.has_wall(Point::new(0, 0), Wall::South));
        assert!(grid.has_wall(Point::new(0, 0), Wall::West));
        assert!(grid.has_wall(Point::new(1, 0), Wall::East));
        assert_eq!(grid.passage_count(), 1);
    }

    #[test]
    fn carving_joins_components() {
        let mut grid = MazeGrid::new(2, 2);
        let a = Point::new(0, 0);
        let b = Point::new(1, 0);
        let c = Point::new(0, 1);
        assert!(grid.unreachable(&a, &b));
        grid.remove_wall_between(a, b);
        assert!(grid.reachable(&a, &b));
        assert!(grid.unreachable(&a, &c));
    }

    #[test]
    fn walling_off_marks_components_dirty() {
        let mut grid = MazeGrid::new(2, 1);
        let a = Point::new(0, 0);
        let b = Point::new(1, 0);
        grid.remove_wall_between(a, b);
        assert!(grid.reachable(&a, &b));
        grid.insert_wall_between(a, b);
        grid.update();
        assert!(grid.unreachable(&a, &b));
    }

    #[test]
    fn passage_neighbours_follow_cleared_walls() {
        let mut grid = MazeGrid::new(3, 3);
        let center = Point::new(1, 1);
        assert!(grid.passage_neighbours(center).is_empty());
        grid.remove_wall_between(center, Point::new(1, 0));
        grid.remove_wall_between(center, Point::new(2, 1));
        assert_eq!(
            grid.passage_neighbours(center),
            vec![Point::new(1, 0), Point::new(2, 1)]
        );
    }

    #[test]
    #[should_panic]
    fn zero_dimension_is_rejected() {
        MazeGrid::new(0, 4);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_query_is_rejected() {
        let grid = MazeGrid::new(2, 2);
        grid.has_wall(Point::new(2, 0), Wall::North);
    }

    #[test]
    #[should_panic]
    fn non_adjacent_carving_is_rejected() {
        let mut grid = MazeGrid::new(3, 3);
        grid.remove_wall_between(Point::new(0, 0), Point::new(2, 0));
    }

    #[test]
    fn display_draws_every_row() {
        let grid = MazeGrid::new(4, 3);
        let text = format!("{}", grid);
        assert_eq!(text.lines().count(), 3 * 2 + 1);
        assert!(text.starts_with("+---"));
        assert!(text.ends_with("+---+---+---+---+\n"));
    }
}
