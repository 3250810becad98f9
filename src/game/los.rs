//! Line-of-sight and pathfinding.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::game::state::Wall;
use crate::grid::{Cell, GridSize, manhattan, strictly_between_on_line};

/// Whether any wall stands strictly between `a` and `b` on their shared
/// row or column. Always false when the cells are not on a straight line.
#[must_use]
pub fn wall_blocks_line(walls: &[Wall], a: Cell, b: Cell) -> bool {
    walls
        .iter()
        .any(|wall| strictly_between_on_line(wall.pos, a, b))
}

/// A* over grid cells with unit step cost and Manhattan heuristic.
///
/// Walls and `blocked` (the stationary opponent) are obstacles; the
/// mover's own start cell is not. On equal f-score the node inserted
/// later wins (LIFO tie-break), which keeps the reported minimal path a
/// deterministic function of the input.
///
/// Returns the path from `start` to `goal` inclusive, or `None` when
/// unreachable.
#[must_use]
pub fn find_path(
    grid: GridSize,
    walls: &[Wall],
    start: Cell,
    goal: Cell,
    blocked: Cell,
) -> Option<Vec<Cell>> {
    if start == goal {
        return Some(vec![start]);
    }
    let passable = |cell: Cell| {
        cell != blocked && !walls.iter().any(|wall| wall.pos == cell)
    };
    if !grid.contains(goal) || !passable(goal) {
        return None;
    }

    // Heap entries order by f ascending, then insertion sequence
    // descending (LIFO on ties).
    let mut open: BinaryHeap<Reverse<(u32, Reverse<u64>, Cell)>> = BinaryHeap::new();
    let mut g_score: HashMap<Cell, u32> = HashMap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut seq: u64 = 0;

    g_score.insert(start, 0);
    open.push(Reverse((manhattan(start, goal), Reverse(seq), start)));

    while let Some(Reverse((_, _, current))) = open.pop() {
        if current == goal {
            let mut path = vec![current];
            let mut cursor = current;
            while let Some(&prev) = came_from.get(&cursor) {
                path.push(prev);
                cursor = prev;
            }
            path.reverse();
            return Some(path);
        }

        let current_g = g_score[&current];
        for neighbor in grid.neighbors4(current) {
            if !passable(neighbor) {
                continue;
            }
            let tentative = current_g + 1;
            if g_score.get(&neighbor).is_none_or(|&g| tentative < g) {
                g_score.insert(neighbor, tentative);
                came_from.insert(neighbor, current);
                seq += 1;
                open.push(Reverse((
                    tentative + manhattan(neighbor, goal),
                    Reverse(seq),
                    neighbor,
                )));
            }
        }
    }

    None
}

/// Shortest A* path from `start` to any in-bounds neighbor of
/// `opponent`, treating walls and the opponent's own cell as obstacles.
///
/// `path[1]` is the recommended next step. Neighbors are tried in the
/// fixed up/down/left/right order, so equal-length results resolve
/// deterministically.
#[must_use]
pub fn optimal_path(grid: GridSize, walls: &[Wall], start: Cell, opponent: Cell) -> Option<Vec<Cell>> {
    let mut best: Option<Vec<Cell>> = None;
    for goal in grid.neighbors4(opponent) {
        if let Some(path) = find_path(grid, walls, start, goal, opponent)
            && best.as_ref().is_none_or(|b| path.len() < b.len())
        {
            best = Some(path);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(x: u16, y: u16) -> Wall {
        Wall {
            pos: Cell::new(x, y),
            hp: 30,
        }
    }

    #[test]
    fn test_wall_blocks_shared_row() {
        let walls = [wall(5, 5)];
        assert!(wall_blocks_line(&walls, Cell::new(2, 5), Cell::new(10, 5)));
        assert!(wall_blocks_line(&walls, Cell::new(10, 5), Cell::new(2, 5)));
        // Wall outside the segment.
        assert!(!wall_blocks_line(&walls, Cell::new(6, 5), Cell::new(10, 5)));
        // Wall on an endpoint is not strictly between.
        assert!(!wall_blocks_line(&walls, Cell::new(5, 5), Cell::new(10, 5)));
    }

    #[test]
    fn test_wall_blocks_shared_column() {
        let walls = [wall(3, 4)];
        assert!(wall_blocks_line(&walls, Cell::new(3, 1), Cell::new(3, 8)));
        assert!(!wall_blocks_line(&walls, Cell::new(4, 1), Cell::new(4, 8)));
    }

    #[test]
    fn test_no_line_no_block() {
        let walls = [wall(5, 5)];
        assert!(!wall_blocks_line(&walls, Cell::new(2, 4), Cell::new(10, 5)));
    }

    #[test]
    fn test_path_straight_corridor() {
        let grid = GridSize::new(8, 8);
        let path = find_path(grid, &[], Cell::new(0, 0), Cell::new(4, 0), Cell::new(7, 7)).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], Cell::new(0, 0));
        assert_eq!(path[4], Cell::new(4, 0));
    }

    #[test]
    fn test_path_length_matches_manhattan_without_obstacles() {
        let grid = GridSize::new(16, 16);
        let start = Cell::new(2, 3);
        let goal = Cell::new(9, 11);
        let path = find_path(grid, &[], start, goal, Cell::new(15, 15)).unwrap();
        assert_eq!(path.len() as u32, manhattan(start, goal) + 1);
    }

    #[test]
    fn test_path_routes_around_walls() {
        let grid = GridSize::new(8, 8);
        // A wall column with one gap at y=6.
        let walls: Vec<Wall> = (0..6).map(|y| wall(4, y)).collect();
        let path = find_path(grid, &walls, Cell::new(0, 0), Cell::new(7, 0), Cell::new(7, 7)).unwrap();
        assert!(path.iter().all(|c| !walls.iter().any(|w| w.pos == *c)));
        assert!(path.contains(&Cell::new(4, 6)));
    }

    #[test]
    fn test_path_unreachable() {
        let grid = GridSize::new(8, 8);
        // Full wall column.
        let walls: Vec<Wall> = (0..8).map(|y| wall(4, y)).collect();
        assert!(find_path(grid, &walls, Cell::new(0, 0), Cell::new(7, 0), Cell::new(7, 7)).is_none());
    }

    #[test]
    fn test_path_deterministic() {
        let grid = GridSize::new(16, 16);
        let walls = [wall(5, 5), wall(6, 5), wall(7, 5)];
        let a = find_path(grid, &walls, Cell::new(2, 2), Cell::new(12, 9), Cell::new(0, 0));
        let b = find_path(grid, &walls, Cell::new(2, 2), Cell::new(12, 9), Cell::new(0, 0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_optimal_path_stops_beside_opponent() {
        let grid = GridSize::new(8, 8);
        let start = Cell::new(1, 1);
        let opponent = Cell::new(5, 1);
        let path = optimal_path(grid, &[], start, opponent).unwrap();
        let last = *path.last().unwrap();
        assert_eq!(manhattan(last, opponent), 1);
        assert!(!path.contains(&opponent));
        // Next step moves along the row.
        assert_eq!(path[1], Cell::new(2, 1));
    }

    #[test]
    fn test_optimal_path_none_when_walled_in() {
        let grid = GridSize::new(8, 8);
        let opponent = Cell::new(4, 4);
        let walls = [wall(4, 3), wall(4, 5), wall(3, 4), wall(5, 4)];
        assert!(optimal_path(grid, &walls, Cell::new(0, 0), opponent).is_none());
    }
}
