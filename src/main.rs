//! matchtui — match-3 tile puzzle game in the terminal: swap adjacent
//! tiles, match runs of three, chase cascades against the clock.

mod app;
mod game;
mod grid;
mod highscores;
mod input;
mod theme;
mod tile;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use highscores::HighScoreStore;
use std::sync::Arc;

/// Options derived from CLI that affect app behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub time_limit: u32,
    pub seed: Option<u64>,
    pub no_menu: bool,
    pub no_animation: bool,
    pub frame_rate: f64,
    pub player: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        time_limit: args.time_limit,
        seed: args.seed,
        no_menu: args.no_menu,
        no_animation: args.no_animation,
        frame_rate: args.frame_rate,
        player: args.player,
    };
    let store = HighScoreStore::open_default();
    let mut app = App::new(config, theme, store);
    app.run()?;
    Ok(())
}

/// Tracing goes to a file; stderr would corrupt the alternate screen.
/// Logging is off unless --log-file is given.
fn init_logging(path: Option<&std::path::Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("matchtui=debug")),
        )
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Match-3 puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "matchtui",
    version,
    about = "Match-3 tile puzzle in the terminal. Swap adjacent tiles to line up three of a colour; cascades score until the clock runs out.",
    long_about = "Matchtui is a terminal match-3 game on an 8x8 board.\n\n\
        Click a tile (or move the cursor and press Enter) to select it, then pick an \
        adjacent tile to swap. A swap that lines up three or more of a colour removes \
        them; tiles fall, fresh ones drop in, and chain reactions keep scoring.\n\n\
        CONTROLS:\n  Mouse       Click a tile to select / swap\n  Arrows/hjkl Move cursor   Enter/Space  Select\n  Esc         Deselect      R / N        New game\n  Q           Quit\n\n\
        Use --theme to load a btop-style theme file, --seed for a reproducible board."
)]
pub struct Args {
    /// Time limit in seconds (menu offers 30, 60, 180).
    #[arg(short = 'l', long, default_value = "180", value_name = "SECS")]
    pub time_limit: u32,

    /// Path to theme file (btop-style theme[key]=\"value\").
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Seed for the board generator (reproducible games).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Skip main menu and start playing immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the game-over fade effect.
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Player name recorded in the high-score table.
    #[arg(long, default_value = "Player", value_name = "NAME")]
    pub player: String,

    /// Write tracing output to this file (off when not set).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
