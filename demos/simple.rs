use grid_maze::{MazeGenerator, MazeGrid, Pathfinder, SearchState};

// In this example a 20x10 maze is carved from a fixed seed, printed, and
// solved from the origin to the far corner.
fn main() {
    let mut grid = MazeGrid::new(20, 10);
    let mut generator = MazeGenerator::with_seed(2024);
    generator.generate(&mut grid);
    println!("{}", grid);

    let mut finder = Pathfinder::new(&grid);
    if finder.run(&grid) == SearchState::Found {
        let path = finder.path().unwrap();
        println!("A path of {} cells has been found:", path.len());
        for p in path {
            println!("{:?}", p);
        }
    }
}
