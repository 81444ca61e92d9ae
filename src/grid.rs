//! Grid state: the 8x8 board and its pure logical operations (fill, swap,
//! match scan, collapse, refill).

use crate::tile::{AnimKind, Tile, TileType};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use tracing::{debug, error, warn};

/// Board metrics, fixed at session start. Pixel units drive the animated
/// draw positions; the renderer maps them onto terminal cells.
#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    pub size: usize,
    pub cell_size: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            size: 8,
            cell_size: 60.0,
            offset_x: 50.0,
            offset_y: 50.0,
        }
    }
}

/// The board. Sole owner of its tiles; a tile is never referenced from two
/// cells, and `grid[r][c]` always satisfies `tile.row == r && tile.col == c`.
#[derive(Debug, Clone)]
pub struct Grid {
    pub cfg: BoardConfig,
    cells: Vec<Vec<Option<Tile>>>,
}

impl Grid {
    /// Empty board.
    pub fn new(cfg: BoardConfig) -> Self {
        let cells = (0..cfg.size)
            .map(|_| (0..cfg.size).map(|_| None).collect())
            .collect();
        Self { cfg, cells }
    }

    pub fn size(&self) -> usize {
        self.cfg.size
    }

    fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.cfg.size && col < self.cfg.size
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Tile> {
        self.cells.get(row).and_then(|r| r.get(col)).and_then(Option::as_ref)
    }

    fn tile_type(&self, row: usize, col: usize) -> Option<TileType> {
        self.get(row, col).map(|t| t.kind)
    }

    /// Fill every cell with a random type, rejecting any choice that would
    /// complete a run of 3 with the pair already placed to its left or
    /// above. Guarantees a match-free starting board.
    pub fn initialize<R: Rng>(&mut self, rng: &mut R) {
        let n = self.cfg.size;
        for row in 0..n {
            for col in 0..n {
                let mut valid: Vec<TileType> = TileType::ALL.to_vec();
                if col >= 2 {
                    if let (Some(a), Some(b)) = (self.tile_type(row, col - 1), self.tile_type(row, col - 2)) {
                        if a == b {
                            valid.retain(|&t| t != a);
                        }
                    }
                }
                if row >= 2 {
                    if let (Some(a), Some(b)) = (self.tile_type(row - 1, col), self.tile_type(row - 2, col)) {
                        if a == b {
                            valid.retain(|&t| t != a);
                        }
                    }
                }
                // Two exclusions at most, six types: never empty.
                let kind = *valid.choose(rng).unwrap_or(&TileType::Red);
                self.cells[row][col] = Some(Tile::new(kind, row, col, self.cfg.cell_size));
            }
        }
        debug!("board initialized match-free");
    }

    /// Exchange the tiles at `a` and `b`, updating their logical coords and
    /// either starting a Swap animation toward the new cell or snapping.
    /// No-op when either cell is empty; out-of-bounds positions are a
    /// caller bug and are skipped with an error log.
    pub fn swap(&mut self, a: (usize, usize), b: (usize, usize), animate: bool) {
        if !self.in_bounds(a.0, a.1) || !self.in_bounds(b.0, b.1) {
            error!(?a, ?b, "swap with out-of-bounds position rejected");
            return;
        }
        if self.get(a.0, a.1).is_none() || self.get(b.0, b.1).is_none() {
            return;
        }

        let tile_a = self.cells[a.0][a.1].take();
        let tile_b = self.cells[b.0][b.1].take();
        self.cells[a.0][a.1] = tile_b;
        self.cells[b.0][b.1] = tile_a;

        let cell_size = self.cfg.cell_size;
        for &(row, col) in &[a, b] {
            if let Some(tile) = self.cells[row][col].as_mut() {
                tile.row = row;
                tile.col = col;
                if animate {
                    tile.start_animation(AnimKind::Swap, Some(row), Some(col), cell_size);
                } else {
                    tile.snap_to_grid(cell_size);
                }
            }
        }
    }

    /// Scan every row and column for maximal runs of >=3 equal types and
    /// return the union of their cells. Empty cells break a run. Pure.
    pub fn find_matches(&self) -> BTreeSet<(usize, usize)> {
        let n = self.cfg.size;
        let mut matches = BTreeSet::new();

        // Horizontal runs.
        for row in 0..n {
            let mut start = 0;
            let mut current: Option<TileType> = None;
            for col in 0..=n {
                let kind = if col < n { self.tile_type(row, col) } else { None };
                if kind != current || kind.is_none() {
                    if current.is_some() && col - start >= 3 {
                        for c in start..col {
                            matches.insert((row, c));
                        }
                    }
                    start = col;
                    current = kind;
                }
            }
        }

        // Vertical runs.
        for col in 0..n {
            let mut start = 0;
            let mut current: Option<TileType> = None;
            for row in 0..=n {
                let kind = if row < n { self.tile_type(row, col) } else { None };
                if kind != current || kind.is_none() {
                    if current.is_some() && row - start >= 3 {
                        for r in start..row {
                            matches.insert((r, col));
                        }
                    }
                    start = row;
                    current = kind;
                }
            }
        }

        if !matches.is_empty() {
            debug!(count = matches.len(), "matches found");
        }
        matches
    }

    /// Null each listed cell. Out-of-range or already-empty entries are
    /// logged and skipped, never fatal. Returns the number of tiles removed.
    pub fn clear_cells(&mut self, cells: &BTreeSet<(usize, usize)>) -> usize {
        let mut removed = 0;
        for &(row, col) in cells {
            if !self.in_bounds(row, col) {
                error!(row, col, "clear_cells: position out of bounds");
                continue;
            }
            if self.cells[row][col].take().is_some() {
                removed += 1;
            } else {
                warn!(row, col, "clear_cells: cell already empty");
            }
        }
        removed
    }

    /// Compact each column downward, preserving the top-to-bottom order of
    /// surviving tiles. Moved tiles start a Fall animation (or snap).
    /// Returns whether any tile moved.
    pub fn collapse(&mut self, animate: bool) -> bool {
        let n = self.cfg.size;
        let cell_size = self.cfg.cell_size;
        let mut moved = false;

        for col in 0..n {
            let mut write = n;
            for read in (0..n).rev() {
                if self.cells[read][col].is_some() {
                    write -= 1;
                    if write != read {
                        if let Some(mut tile) = self.cells[read][col].take() {
                            tile.row = write;
                            if animate {
                                tile.start_animation(
                                    AnimKind::Fall,
                                    Some(write),
                                    Some(col),
                                    cell_size,
                                );
                            } else {
                                tile.snap_to_grid(cell_size);
                            }
                            self.cells[write][col] = Some(tile);
                            moved = true;
                        }
                    }
                }
            }
        }
        moved
    }

    /// Create a tile of a uniformly random type in every empty cell,
    /// scanning column-major (top to bottom within each column). Animated
    /// refills spawn one cell above their target.
    pub fn refill<R: Rng>(&mut self, rng: &mut R, animate: bool) {
        let n = self.cfg.size;
        let cell_size = self.cfg.cell_size;
        for col in 0..n {
            for row in 0..n {
                if self.cells[row][col].is_none() {
                    let kind = TileType::ALL[rng.gen_range(0..TileType::ALL.len())];
                    let tile = if animate {
                        Tile::new_spawned(kind, row, col, cell_size)
                    } else {
                        Tile::new(kind, row, col, cell_size)
                    };
                    self.cells[row][col] = Some(tile);
                }
            }
        }
    }

    /// Advance every tile's animation by `dt`. Returns whether any tile is
    /// still animating after the step.
    pub fn advance_animations(&mut self, dt: f32) -> bool {
        let mut any = false;
        for row in self.cells.iter_mut() {
            for cell in row.iter_mut() {
                if let Some(tile) = cell {
                    tile.advance(dt);
                    any |= tile.is_animating();
                }
            }
        }
        any
    }

    pub fn any_animating(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .any(Tile::is_animating)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_some)
    }

    /// Every tile's logical coords agree with its cell and, when settled,
    /// its draw position. Used by tests and the frame-loop error guard.
    pub fn is_consistent(&self) -> bool {
        for (r, row) in self.cells.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if let Some(tile) = cell {
                    if tile.row != r || tile.col != c {
                        return false;
                    }
                    if !tile.is_animating() {
                        let expected = (c as f32 * self.cfg.cell_size, r as f32 * self.cfg.cell_size);
                        if tile.draw != expected {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    /// Test/setup helper: place a tile at rest, replacing any occupant.
    #[cfg(test)]
    pub fn put(&mut self, row: usize, col: usize, kind: TileType) {
        self.cells[row][col] = Some(Tile::new(kind, row, col, self.cfg.cell_size));
    }
}

/// True when the two cells share an edge.
pub fn are_adjacent(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1) == 1
}

#[cfg(test)]
pub mod testutil {
    use super::*;

    /// Match-free filler: period-3 horizontally, alternating vertically.
    pub fn no_match_type(row: usize, col: usize) -> TileType {
        TileType::ALL[(col % 3) + 3 * (row % 2)]
    }

    /// Fully populated board with no runs of 3 anywhere.
    pub fn match_free_board(cfg: BoardConfig) -> Grid {
        let mut grid = Grid::new(cfg);
        for row in 0..cfg.size {
            for col in 0..cfg.size {
                grid.put(row, col, no_match_type(row, col));
            }
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::match_free_board;
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grid() -> Grid {
        Grid::new(BoardConfig::default())
    }

    #[test]
    fn test_initialize_is_match_free() {
        for seed in 0..20 {
            let mut g = grid();
            let mut rng = StdRng::seed_from_u64(seed);
            g.initialize(&mut rng);
            assert!(g.is_full());
            assert!(g.find_matches().is_empty(), "seed {seed} produced matches");
        }
    }

    #[test]
    fn test_horizontal_match_exact_cells() {
        let mut g = match_free_board(BoardConfig::default());
        g.put(0, 0, TileType::Red);
        g.put(0, 1, TileType::Red);
        g.put(0, 2, TileType::Red);
        g.put(0, 3, TileType::Blue);
        // Break the vertical pairs the red run could extend.
        g.put(1, 0, TileType::Green);
        g.put(1, 1, TileType::Purple);
        g.put(1, 2, TileType::Green);
        let matches = g.find_matches();
        assert_eq!(
            matches,
            BTreeSet::from([(0, 0), (0, 1), (0, 2)])
        );
    }

    #[test]
    fn test_vertical_match_exact_cells() {
        let mut g = grid();
        g.put(0, 0, TileType::Green);
        g.put(1, 0, TileType::Green);
        g.put(2, 0, TileType::Green);
        g.put(3, 0, TileType::Yellow);
        assert_eq!(
            g.find_matches(),
            BTreeSet::from([(0, 0), (1, 0), (2, 0)])
        );
    }

    #[test]
    fn test_l_shape_counts_cells_once() {
        // Horizontal and vertical runs sharing the corner cell (2,0).
        let mut g = grid();
        for col in 0..3 {
            g.put(2, col, TileType::Purple);
        }
        for row in 0..2 {
            g.put(row, 0, TileType::Purple);
        }
        let matches = g.find_matches();
        assert_eq!(matches.len(), 5);
        assert!(matches.contains(&(2, 0)));
    }

    #[test]
    fn test_empty_cells_break_runs() {
        let mut g = grid();
        g.put(0, 0, TileType::Red);
        g.put(0, 1, TileType::Red);
        // gap at (0,2)
        g.put(0, 3, TileType::Red);
        assert!(g.find_matches().is_empty());
    }

    #[test]
    fn test_swap_is_reversible() {
        let mut g = match_free_board(BoardConfig::default());
        let before_a = g.get(0, 0).cloned().unwrap();
        let before_b = g.get(0, 1).cloned().unwrap();
        g.swap((0, 0), (0, 1), false);
        g.swap((0, 0), (0, 1), false);
        let after_a = g.get(0, 0).unwrap();
        let after_b = g.get(0, 1).unwrap();
        assert_eq!((after_a.kind, after_a.row, after_a.col), (before_a.kind, 0, 0));
        assert_eq!((after_b.kind, after_b.row, after_b.col), (before_b.kind, 0, 1));
        assert!(g.is_consistent());
    }

    #[test]
    fn test_swap_updates_coords_and_draw() {
        let mut g = grid();
        g.put(0, 0, TileType::Red);
        g.put(0, 1, TileType::Blue);
        g.swap((0, 0), (0, 1), false);
        assert_eq!(g.get(0, 0).unwrap().kind, TileType::Blue);
        assert_eq!(g.get(0, 1).unwrap().kind, TileType::Red);
        assert_eq!(g.get(0, 1).unwrap().draw, (60.0, 0.0));
    }

    #[test]
    fn test_swap_with_empty_cell_is_noop() {
        let mut g = grid();
        g.put(0, 0, TileType::Red);
        g.swap((0, 0), (0, 1), false);
        assert_eq!(g.get(0, 0).unwrap().kind, TileType::Red);
        assert!(g.get(0, 1).is_none());
    }

    #[test]
    fn test_swap_out_of_bounds_is_rejected() {
        let mut g = match_free_board(BoardConfig::default());
        let before = g.get(7, 7).unwrap().kind;
        g.swap((7, 7), (7, 8), true);
        assert_eq!(g.get(7, 7).unwrap().kind, before);
        assert!(!g.any_animating());
    }

    #[test]
    fn test_clear_cells_skips_empty_and_out_of_range() {
        let mut g = grid();
        g.put(0, 0, TileType::Red);
        let cells = BTreeSet::from([(0, 0), (0, 1), (9, 9)]);
        assert_eq!(g.clear_cells(&cells), 1);
        assert!(g.get(0, 0).is_none());
    }

    #[test]
    fn test_collapse_is_stable() {
        // Tiles at rows 0 and 2 of a column end at rows 6 and 7, order kept.
        let mut g = grid();
        g.put(0, 3, TileType::Red);
        g.put(2, 3, TileType::Blue);
        assert!(g.collapse(false));
        for row in 0..6 {
            assert!(g.get(row, 3).is_none());
        }
        assert_eq!(g.get(6, 3).unwrap().kind, TileType::Red);
        assert_eq!(g.get(7, 3).unwrap().kind, TileType::Blue);
        assert!(g.is_consistent());
    }

    #[test]
    fn test_collapse_full_column_does_not_move() {
        let g0 = match_free_board(BoardConfig::default());
        let mut g = g0.clone();
        assert!(!g.collapse(false));
    }

    #[test]
    fn test_refill_fills_every_cell() {
        let mut g = match_free_board(BoardConfig::default());
        let cells: BTreeSet<_> = (0..8).map(|c| (0usize, c as usize)).collect();
        g.clear_cells(&cells);
        g.collapse(false);
        let mut rng = StdRng::seed_from_u64(7);
        g.refill(&mut rng, false);
        assert!(g.is_full());
        assert!(g.is_consistent());
    }

    #[test]
    fn test_animated_refill_spawns_above() {
        let mut g = grid();
        let mut rng = StdRng::seed_from_u64(1);
        g.refill(&mut rng, true);
        let tile = g.get(0, 0).unwrap();
        assert!(tile.is_animating());
        assert!(tile.draw.1 < 0.0);
        assert!(g.any_animating());
    }

    #[test]
    fn test_adjacency() {
        assert!(are_adjacent((0, 0), (0, 1)));
        assert!(are_adjacent((1, 1), (0, 1)));
        assert!(!are_adjacent((0, 0), (1, 1)));
        assert!(!are_adjacent((0, 0), (0, 2)));
        assert!(!are_adjacent((3, 3), (3, 3)));
    }
}
