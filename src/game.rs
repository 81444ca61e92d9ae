//! Game state: selection, swap resolution, match/cascade pipeline, scoring,
//! time limit.

use crate::grid::{BoardConfig, Grid, are_adjacent};
use crate::tile::TileType;
use rand::rngs::StdRng;
use std::collections::BTreeSet;
use tracing::{debug, error, warn};

/// Highlight blink before a cascade removal, seconds.
const HIGHLIGHT_SECS: f32 = 0.5;

/// Pause between a removal and the collapse/refill that follows, seconds.
const DROP_DELAY_SECS: f32 = 0.5;

/// Upper bound on cascade iterations in the synchronous cycle.
const MAX_CASCADE_ITERATIONS: u32 = 10;

/// Where the match pipeline currently is. At most one resolution is in
/// flight; the variants are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Settled board, accepting input.
    Idle,
    /// A player swap is animating; on settle, match or revert.
    SwapResolve { a: (usize, usize), b: (usize, usize) },
    /// Cascade matches blink before removal.
    Highlight {
        cells: BTreeSet<(usize, usize)>,
        timer: f32,
    },
    /// Pause after a removal before tiles drop and refill.
    DropDelay { timer: f32 },
    /// Fall/spawn animations running; on settle, re-scan for cascades.
    CascadeSettle,
}

/// Visual effect requests drained by the shell each frame. Pixel coords.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ScorePopup {
        x: f32,
        y: f32,
        amount: u32,
    },
    MatchBurst {
        x: f32,
        y: f32,
        color: TileType,
        count: usize,
    },
}

/// One session: grid, score, countdown, selection, pipeline phase.
#[derive(Debug)]
pub struct GameState {
    pub grid: Grid,
    pub score: u32,
    pub time_limit: f32,
    pub time_left: f32,
    pub selected: Option<(usize, usize)>,
    pub game_over: bool,
    pub phase: Phase,
    /// Removals applied so far in the current chain; 0 means the next
    /// removal is the direct result of a swap and skips the highlight.
    chain: u32,
    was_animating: bool,
    events: Vec<GameEvent>,
    rng: StdRng,
}

impl GameState {
    pub fn new(cfg: BoardConfig, time_limit: f32, mut rng: StdRng) -> Self {
        let mut grid = Grid::new(cfg);
        grid.initialize(&mut rng);
        Self {
            grid,
            score: 0,
            time_limit,
            time_left: time_limit,
            selected: None,
            game_over: false,
            phase: Phase::Idle,
            chain: 0,
            was_animating: false,
            events: Vec::new(),
            rng,
        }
    }

    /// Score for removing `n` distinct cells at once.
    pub fn match_score(n: usize) -> u32 {
        match n {
            0..=2 => 0,
            3 => 100,
            4 => 200,
            5 => 500,
            n => 100 * n as u32,
        }
    }

    /// True when the core refuses gameplay input.
    pub fn input_locked(&self) -> bool {
        self.game_over || self.phase != Phase::Idle || self.grid.any_animating()
    }

    /// Advance the session by `dt` seconds: countdown, animations, pipeline
    /// timers, settle-edge resolution. The only place phase transitions.
    pub fn tick(&mut self, dt: f32) {
        if self.game_over {
            return;
        }

        self.time_left -= dt;
        if self.time_left <= 0.0 {
            self.time_left = 0.0;
            self.game_over = true;
            self.selected = None;
            debug!(score = self.score, "time up");
            return;
        }

        self.grid.advance_animations(dt);
        self.tick_timers(dt);

        let animating = self.grid.any_animating();
        if self.was_animating && !animating {
            self.on_settled();
        }
        // on_settled may have started new animations (revert swap).
        self.was_animating = self.grid.any_animating();
    }

    fn tick_timers(&mut self, dt: f32) {
        match &mut self.phase {
            Phase::Highlight { timer, .. } => {
                *timer -= dt;
                if *timer <= 0.0 {
                    let Phase::Highlight { cells, .. } =
                        std::mem::replace(&mut self.phase, Phase::Idle)
                    else {
                        return;
                    };
                    self.apply_removal(&cells);
                    self.phase = Phase::DropDelay {
                        timer: DROP_DELAY_SECS,
                    };
                }
            }
            Phase::DropDelay { timer } => {
                *timer -= dt;
                if *timer <= 0.0 {
                    self.grid.collapse(true);
                    self.grid.refill(&mut self.rng, true);
                    self.phase = Phase::CascadeSettle;
                    self.was_animating = true;
                }
            }
            _ => {}
        }
    }

    /// All animations just finished; resolve the phase that was waiting.
    fn on_settled(&mut self) {
        match self.phase.clone() {
            Phase::SwapResolve { a, b } => {
                let matches = self.grid.find_matches();
                if matches.is_empty() {
                    debug!(?a, ?b, "swap made no match, reverting");
                    self.grid.swap(a, b, true);
                    self.phase = Phase::Idle;
                } else {
                    self.begin_removal(matches);
                }
            }
            Phase::CascadeSettle => {
                let matches = self.grid.find_matches();
                if matches.is_empty() {
                    self.phase = Phase::Idle;
                    self.chain = 0;
                } else {
                    self.begin_removal(matches);
                }
            }
            _ => {}
        }
    }

    /// First removal of a chain is immediate; cascades blink first.
    fn begin_removal(&mut self, cells: BTreeSet<(usize, usize)>) {
        if self.chain > 0 {
            self.phase = Phase::Highlight {
                cells,
                timer: HIGHLIGHT_SECS,
            };
        } else {
            self.apply_removal(&cells);
            self.phase = Phase::DropDelay {
                timer: DROP_DELAY_SECS,
            };
        }
    }

    /// Score the matched cells, emit visual events, clear them.
    fn apply_removal(&mut self, cells: &BTreeSet<(usize, usize)>) {
        let amount = Self::match_score(cells.len());
        let cfg = self.grid.cfg;

        let mut cx = 0.0;
        let mut cy = 0.0;
        for &(row, col) in cells {
            let px = cfg.offset_x + (col as f32 + 0.5) * cfg.cell_size;
            let py = cfg.offset_y + (row as f32 + 0.5) * cfg.cell_size;
            cx += px;
            cy += py;
            if let Some(tile) = self.grid.get(row, col) {
                self.events.push(GameEvent::MatchBurst {
                    x: px,
                    y: py,
                    color: tile.kind,
                    count: 1,
                });
            }
        }
        if !cells.is_empty() {
            let n = cells.len() as f32;
            self.events.push(GameEvent::ScorePopup {
                x: cx / n,
                y: cy / n,
                amount,
            });
        }

        self.score += amount;
        self.chain += 1;
        self.grid.clear_cells(cells);
        debug!(cells = cells.len(), amount, chain = self.chain, "removal");
    }

    /// Resolve every cascade synchronously with no animation or events.
    /// Headless/test convenience; the ticked pipeline is authoritative.
    /// Returns the score gained.
    pub fn process_matches_sync(&mut self) -> u32 {
        let before = self.score;
        for _ in 0..MAX_CASCADE_ITERATIONS {
            let matches = self.grid.find_matches();
            if matches.is_empty() {
                return self.score - before;
            }
            self.score += Self::match_score(matches.len());
            self.grid.clear_cells(&matches);
            self.grid.collapse(false);
            self.grid.refill(&mut self.rng, false);
        }
        if !self.grid.find_matches().is_empty() {
            warn!(
                limit = MAX_CASCADE_ITERATIONS,
                "cascade iteration cap reached with matches remaining"
            );
        }
        self.score - before
    }

    /// Select, deselect, or swap. Ignored while the pipeline is busy.
    pub fn handle_select(&mut self, row: usize, col: usize) {
        if self.input_locked() {
            return;
        }
        if row >= self.grid.size() || col >= self.grid.size() {
            error!(row, col, "selection out of bounds");
            return;
        }

        match self.selected {
            None => self.selected = Some((row, col)),
            Some(prev) if prev == (row, col) => self.selected = None,
            Some(prev) if are_adjacent(prev, (row, col)) => {
                self.selected = None;
                self.chain = 0;
                self.grid.swap(prev, (row, col), true);
                self.phase = Phase::SwapResolve {
                    a: prev,
                    b: (row, col),
                };
                // Arm the settle edge now; a large dt could otherwise
                // finish the animation within one tick and never fire it.
                self.was_animating = true;
            }
            Some(_) => self.selected = Some((row, col)),
        }
    }

    /// Map a pixel position to a cell and treat it as a selection click.
    /// Clicks outside the board are ignored.
    pub fn handle_pointer_down(&mut self, px: f32, py: f32) {
        let cfg = self.grid.cfg;
        let x = px - cfg.offset_x;
        let y = py - cfg.offset_y;
        if x < 0.0 || y < 0.0 {
            return;
        }
        let col = (x / cfg.cell_size) as usize;
        let row = (y / cfg.cell_size) as usize;
        if row < self.grid.size() && col < self.grid.size() {
            self.handle_select(row, col);
        }
    }

    pub fn handle_escape(&mut self) {
        self.selected = None;
    }

    /// Cells currently blinking before removal, if any, with time remaining.
    pub fn highlighted(&self) -> Option<(&BTreeSet<(usize, usize)>, f32)> {
        match &self.phase {
            Phase::Highlight { cells, timer } => Some((cells, *timer)),
            _ => None,
        }
    }

    /// Hand the queued visual events to the shell.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testutil::{match_free_board, no_match_type};
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    fn new_state() -> GameState {
        GameState::new(BoardConfig::default(), 180.0, StdRng::seed_from_u64(42))
    }

    /// State over a hand-built match-free board, pipeline idle.
    fn state_with_board(grid: Grid) -> GameState {
        let mut state = new_state();
        state.grid = grid;
        state.phase = Phase::Idle;
        state.was_animating = false;
        state
    }

    fn run_until_idle(state: &mut GameState, max_ticks: u32) {
        for _ in 0..max_ticks {
            state.tick(DT);
            if state.phase == Phase::Idle && !state.grid.any_animating() {
                return;
            }
        }
        panic!("pipeline did not return to idle within {max_ticks} ticks");
    }

    #[test]
    fn test_scoring_law() {
        assert_eq!(GameState::match_score(2), 0);
        assert_eq!(GameState::match_score(3), 100);
        assert_eq!(GameState::match_score(4), 200);
        assert_eq!(GameState::match_score(5), 500);
        assert_eq!(GameState::match_score(6), 600);
        assert_eq!(GameState::match_score(8), 800);
        assert_eq!(GameState::match_score(64), 6400);
    }

    #[test]
    fn test_new_session_starts_idle_and_match_free() {
        let state = new_state();
        assert_eq!(state.score, 0);
        assert_eq!(state.time_left, 180.0);
        assert!(!state.game_over);
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.grid.find_matches().is_empty());
        assert!(state.grid.is_full());
    }

    #[test]
    fn test_time_runs_out() {
        let mut state = new_state();
        state.time_left = 0.05;
        state.tick(0.1);
        assert!(state.game_over);
        assert_eq!(state.time_left, 0.0);
        // Further ticks are inert.
        state.tick(1.0);
        assert!(state.game_over);
    }

    #[test]
    fn test_sync_cycle_is_idempotent_on_settled_board() {
        let mut state = state_with_board(match_free_board(BoardConfig::default()));
        assert_eq!(state.process_matches_sync(), 0);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_sync_cycle_resolves_a_match() {
        let mut grid = match_free_board(BoardConfig::default());
        for col in 0..3 {
            grid.put(4, col, TileType::Orange);
        }
        let mut state = state_with_board(grid);
        let gained = state.process_matches_sync();
        assert!(gained >= 100);
        assert!(state.grid.is_full());
    }

    #[test]
    fn test_sync_cycle_terminates() {
        // Whatever the rng produces, the cycle returns within the cap.
        for seed in 0..10 {
            let mut state =
                GameState::new(BoardConfig::default(), 180.0, StdRng::seed_from_u64(seed));
            let mut grid = match_free_board(BoardConfig::default());
            for col in 0..8 {
                grid.put(0, col, TileType::Red);
            }
            state.grid = grid;
            state.process_matches_sync();
            assert!(state.grid.is_full());
        }
    }

    #[test]
    fn test_selection_toggle_and_reselect() {
        let mut state = state_with_board(match_free_board(BoardConfig::default()));
        state.handle_select(2, 2);
        assert_eq!(state.selected, Some((2, 2)));
        state.handle_select(2, 2);
        assert_eq!(state.selected, None);
        state.handle_select(2, 2);
        state.handle_select(5, 5); // not adjacent
        assert_eq!(state.selected, Some((5, 5)));
        state.handle_escape();
        assert_eq!(state.selected, None);
    }

    #[test]
    fn test_input_rejected_while_animating() {
        let mut state = state_with_board(match_free_board(BoardConfig::default()));
        state.handle_select(0, 0);
        state.handle_select(0, 1); // starts an animated swap
        assert!(state.input_locked());
        state.handle_select(3, 3);
        assert_eq!(state.selected, None);
    }

    #[test]
    fn test_non_matching_swap_reverts() {
        let mut state = state_with_board(match_free_board(BoardConfig::default()));
        let kind_a = no_match_type(3, 3);
        let kind_b = no_match_type(3, 4);
        state.handle_select(3, 3);
        state.handle_select(3, 4);
        run_until_idle(&mut state, 600);
        assert_eq!(state.score, 0);
        assert_eq!(state.grid.get(3, 3).map(|t| t.kind), Some(kind_a));
        assert_eq!(state.grid.get(3, 4).map(|t| t.kind), Some(kind_b));
        assert!(state.grid.is_consistent());
    }

    #[test]
    fn test_matching_swap_scores_and_refills() {
        // Match-free background; swapping the orange at (1,2) up into (0,2)
        // completes a horizontal run with (0,0) and (0,1).
        let mut grid = match_free_board(BoardConfig::default());
        grid.put(0, 0, TileType::Orange);
        grid.put(0, 1, TileType::Orange);
        grid.put(1, 2, TileType::Orange);
        assert!(grid.find_matches().is_empty());

        let mut state = state_with_board(grid);
        state.handle_select(1, 2);
        state.handle_select(0, 2);
        run_until_idle(&mut state, 2000);

        assert!(state.score >= 100);
        assert!(state.grid.is_full());
        assert!(state.grid.find_matches().is_empty());
        assert!(state.grid.is_consistent());

        let events = state.drain_events();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::ScorePopup { amount, .. } if *amount >= 100))
        );
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::MatchBurst { .. }))
        );
    }

    #[test]
    fn test_swap_resolves_when_one_tick_covers_the_animation() {
        // A single tick long enough to finish the swap animation (speed
        // 8.0/s, so anything >= 0.125 s) must still fire the settle
        // resolution instead of leaving the pipeline in SwapResolve.
        let mut state = state_with_board(match_free_board(BoardConfig::default()));
        state.handle_select(3, 3);
        state.handle_select(3, 4);
        state.tick(0.2);
        run_until_idle(&mut state, 600);
        assert!(!state.input_locked());
        state.handle_select(0, 0);
        assert_eq!(state.selected, Some((0, 0)));
    }

    #[test]
    fn test_pipeline_passes_through_drop_delay() {
        let mut grid = match_free_board(BoardConfig::default());
        grid.put(0, 0, TileType::Orange);
        grid.put(0, 1, TileType::Orange);
        grid.put(1, 2, TileType::Orange);
        let mut state = state_with_board(grid);
        state.handle_select(1, 2);
        state.handle_select(0, 2);

        let mut saw_drop_delay = false;
        for _ in 0..2000 {
            state.tick(DT);
            if matches!(state.phase, Phase::DropDelay { .. }) {
                saw_drop_delay = true;
            }
            if state.phase == Phase::Idle && !state.grid.any_animating() {
                break;
            }
        }
        assert!(saw_drop_delay);
        assert_eq!(state.phase, Phase::Idle);
    }

    #[test]
    fn test_pointer_maps_pixels_to_cells() {
        let mut state = state_with_board(match_free_board(BoardConfig::default()));
        // Cell (2,3): x = 50 + 3*60 + 30, y = 50 + 2*60 + 30.
        state.handle_pointer_down(260.0, 200.0);
        assert_eq!(state.selected, Some((2, 3)));
        // Outside the board: ignored, selection kept.
        state.handle_pointer_down(10.0, 10.0);
        assert_eq!(state.selected, Some((2, 3)));
        state.handle_pointer_down(50.0 + 8.0 * 60.0 + 1.0, 200.0);
        assert_eq!(state.selected, Some((2, 3)));
    }

    #[test]
    fn test_no_input_when_game_over() {
        let mut state = state_with_board(match_free_board(BoardConfig::default()));
        state.game_over = true;
        state.handle_select(0, 0);
        assert_eq!(state.selected, None);
    }
}
