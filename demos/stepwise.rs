use grid_maze::{GeneratorState, MazeGenerator, MazeGrid, Pathfinder, SearchState, Wall};
use grid_util::Point;

// Drives both state machines one step at a time, the way a rendering loop
// would, and then draws the maze with the search results overlaid using
// nothing but the read-only query surface:
// '*' marks the path, 'o' open cells, '.' closed cells.
fn main() {
    let mut grid = MazeGrid::new(16, 8);
    let mut generator = MazeGenerator::with_seed(7);
    let mut generation_steps = 0;
    loop {
        generation_steps += 1;
        if generator.step(&mut grid) == GeneratorState::Complete {
            break;
        }
    }
    println!("Generation finished after {generation_steps} steps");

    let mut finder = Pathfinder::new(&grid);
    let mut search_steps = 0;
    loop {
        search_steps += 1;
        match finder.step(&grid) {
            SearchState::Searching => continue,
            state => {
                println!("Search ended as {state:?} after {search_steps} steps");
                break;
            }
        }
    }

    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            let p = Point::new(x, y);
            print!(
                "+{}",
                if grid.has_wall(p, Wall::North) { "---" } else { "   " }
            );
        }
        println!("+");
        for x in 0..grid.width() as i32 {
            let p = Point::new(x, y);
            let mark = if finder.path().map_or(false, |path| path.contains(&p)) {
                '*'
            } else if finder.open(p) {
                'o'
            } else if finder.closed(p) {
                '.'
            } else {
                ' '
            };
            print!(
                "{} {} ",
                if grid.has_wall(p, Wall::West) { "|" } else { " " },
                mark
            );
        }
        println!("|");
    }
    for _ in 0..grid.width() {
        print!("+---");
    }
    println!("+");
}
