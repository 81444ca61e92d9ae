//! App: terminal init, main loop, frame tick and key/mouse handling.

use crate::game::{GameEvent, GameState};
use crate::grid::BoardConfig;
use crate::highscores::HighScoreStore;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::tile::TileType;
use crate::GameConfig;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEventKind};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::error;

/// Time limits selectable from the menu, seconds.
pub const TIME_LIMITS: [u32; 3] = [30, 60, 180];

/// How long a score popup floats, ms.
const POPUP_LIFETIME_MS: u32 = 1500;
/// How long a match burst sparkles, ms.
const BURST_LIFETIME_MS: u32 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy)]
pub struct MenuState {
    pub limit_idx: usize,
}

/// Floating "+100" label, aged by the frame loop.
#[derive(Debug, Clone)]
pub struct Popup {
    pub x: f32,
    pub y: f32,
    pub amount: u32,
    pub age_ms: u32,
}

/// Sparkle where a tile was removed.
#[derive(Debug, Clone)]
pub struct Burst {
    pub x: f32,
    pub y: f32,
    pub color: TileType,
    pub age_ms: u32,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    state: GameState,
    store: HighScoreStore,
    screen: Screen,
    menu: MenuState,
    quit_selected: QuitOption,
    /// Keyboard cursor on the board.
    cursor: (usize, usize),
    popups: Vec<Popup>,
    bursts: Vec<Burst>,
    game_over_effect: Option<Effect>,
    effect_time: Option<Instant>,
    new_record: bool,
    score_submitted: bool,
    last_frame: Instant,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme, store: HighScoreStore) -> Self {
        let state = Self::new_session(&config, config.time_limit);
        let screen = if config.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let limit_idx = TIME_LIMITS
            .iter()
            .position(|&l| l == config.time_limit)
            .unwrap_or(TIME_LIMITS.len() - 1);
        Self {
            config,
            theme,
            state,
            store,
            screen,
            menu: MenuState { limit_idx },
            quit_selected: QuitOption::Resume,
            cursor: (0, 0),
            popups: Vec::new(),
            bursts: Vec::new(),
            game_over_effect: None,
            effect_time: None,
            new_record: false,
            score_submitted: false,
            last_frame: Instant::now(),
        }
    }

    fn new_session(config: &GameConfig, time_limit: u32) -> GameState {
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        GameState::new(BoardConfig::default(), time_limit as f32, rng)
    }

    fn start_game(&mut self, time_limit: u32) {
        self.state = Self::new_session(&self.config, time_limit);
        self.screen = Screen::Playing;
        self.cursor = (0, 0);
        self.popups.clear();
        self.bursts.clear();
        self.game_over_effect = None;
        self.effect_time = None;
        self.new_record = false;
        self.score_submitted = false;
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal =
            DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            let dt = now
                .duration_since(self.last_frame)
                .as_secs_f32()
                .min(0.1);
            self.last_frame = now;

            if self.screen == Screen::Playing {
                self.state.tick(dt);
                self.collect_events();
                if !self.state.grid.is_consistent() {
                    error!("grid inconsistency detected");
                }
                if self.state.game_over {
                    self.finish_game();
                }
            }
            self.age_effects(dt);

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.cursor,
                    &self.popups,
                    &self.bursts,
                    &self.menu,
                    &self.store,
                    (self.screen == Screen::QuitMenu).then_some(self.quit_selected),
                    self.new_record,
                    &mut self.game_over_effect,
                    &mut self.effect_time,
                    now,
                    self.config.no_animation,
                );
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            if self.handle_key(key_to_action(key)) {
                                return Ok(());
                            }
                        }
                        Event::Mouse(m)
                            if m.kind == MouseEventKind::Down(MouseButton::Left) =>
                        {
                            self.handle_mouse(m.column, m.row)?;
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Move drained core events into aging visual state.
    fn collect_events(&mut self) {
        for ev in self.state.drain_events() {
            match ev {
                GameEvent::ScorePopup { x, y, amount } => self.popups.push(Popup {
                    x,
                    y,
                    amount,
                    age_ms: 0,
                }),
                GameEvent::MatchBurst { x, y, color, .. } => self.bursts.push(Burst {
                    x,
                    y,
                    color,
                    age_ms: 0,
                }),
            }
        }
    }

    fn age_effects(&mut self, dt: f32) {
        let ms = (dt * 1000.0) as u32;
        self.popups.retain_mut(|p| {
            p.age_ms += ms;
            p.age_ms < POPUP_LIFETIME_MS
        });
        self.bursts.retain_mut(|b| {
            b.age_ms += ms;
            b.age_ms < BURST_LIFETIME_MS
        });
    }

    /// Session ended; record the score once.
    fn finish_game(&mut self) {
        if !self.score_submitted {
            self.score_submitted = true;
            let limit = self.state.time_limit as u32;
            self.new_record = self
                .store
                .submit(limit, self.state.score, &self.config.player);
        }
        self.screen = Screen::GameOver;
    }

    fn handle_mouse(&mut self, col: u16, row: u16) -> Result<()> {
        if self.screen != Screen::Playing {
            return Ok(());
        }
        let (cols, rows) = crossterm::terminal::size()?;
        let area = Rect::new(0, 0, cols, rows);
        if let Some((px, py)) = crate::ui::mouse_to_pixel(area, &self.state.grid.cfg, col, row) {
            self.state.handle_pointer_down(px, py);
        }
        Ok(())
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, action: Action) -> bool {
        match self.screen {
            Screen::Menu => match action {
                Action::Quit | Action::Cancel => return true,
                Action::Left | Action::Up => {
                    self.menu.limit_idx =
                        (self.menu.limit_idx + TIME_LIMITS.len() - 1) % TIME_LIMITS.len();
                }
                Action::Right | Action::Down => {
                    self.menu.limit_idx = (self.menu.limit_idx + 1) % TIME_LIMITS.len();
                }
                Action::Confirm => self.start_game(TIME_LIMITS[self.menu.limit_idx]),
                _ => {}
            },
            Screen::Playing => match action {
                Action::Quit | Action::Pause => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                Action::Cancel => self.state.handle_escape(),
                Action::NewGame => self.start_game(self.state.time_limit as u32),
                Action::Up => self.cursor.0 = self.cursor.0.saturating_sub(1),
                Action::Down => {
                    self.cursor.0 = (self.cursor.0 + 1).min(self.state.grid.size() - 1);
                }
                Action::Left => self.cursor.1 = self.cursor.1.saturating_sub(1),
                Action::Right => {
                    self.cursor.1 = (self.cursor.1 + 1).min(self.state.grid.size() - 1);
                }
                Action::Confirm => self.state.handle_select(self.cursor.0, self.cursor.1),
                Action::Menu | Action::None => {}
            },
            Screen::QuitMenu => match action {
                Action::Down | Action::Right => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::MainMenu,
                        QuitOption::MainMenu => QuitOption::Exit,
                        QuitOption::Exit => QuitOption::Resume,
                    };
                }
                Action::Up | Action::Left => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Exit,
                        QuitOption::MainMenu => QuitOption::Resume,
                        QuitOption::Exit => QuitOption::MainMenu,
                    };
                }
                Action::Confirm => match self.quit_selected {
                    QuitOption::Resume => self.screen = Screen::Playing,
                    QuitOption::MainMenu => self.screen = Screen::Menu,
                    QuitOption::Exit => return true,
                },
                Action::Cancel | Action::Quit | Action::Pause => {
                    self.screen = Screen::Playing;
                }
                _ => {}
            },
            Screen::GameOver => match action {
                Action::Quit => return true,
                Action::NewGame | Action::Confirm => {
                    self.start_game(self.state.time_limit as u32);
                }
                Action::Menu | Action::Cancel => self.screen = Screen::Menu,
                _ => {}
            },
        }
        false
    }
}
