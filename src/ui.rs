//! Layout and drawing: menu, board with animated tile positions, sidebar,
//! popups, game over, quit menu.

use crate::app::{Burst, MenuState, Popup, QuitOption, Screen, TIME_LIMITS};
use crate::game::GameState;
use crate::grid::BoardConfig;
use crate::highscores::HighScoreStore;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each grid cell is 4 terminal columns by 2 rows.
const TILE_COLS: u16 = 4;
const TILE_ROWS: u16 = 2;

const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the game-over board fade, ms.
const GAME_OVER_FADE_MS: u32 = 600;

/// Board size in terminal cells including the border.
fn board_outer_size(cfg: &BoardConfig) -> (u16, u16) {
    let n = cfg.size as u16;
    (n * TILE_COLS + 2, n * TILE_ROWS + 2)
}

/// Board inner rect (tiles only, no border) for the centred game layout.
pub fn board_inner_rect(area: Rect, cfg: &BoardConfig) -> Rect {
    let (bw, bh) = board_outer_size(cfg);
    let total_w = bw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(bh) / 2;
    Rect {
        x: x + 1,
        y: y + 1,
        width: (bw - 2).min(area.width.saturating_sub(2)),
        height: (bh - 2).min(area.height.saturating_sub(2)),
    }
}

/// Map a terminal mouse position to board pixel coordinates, if it lands
/// on the board.
pub fn mouse_to_pixel(area: Rect, cfg: &BoardConfig, col: u16, row: u16) -> Option<(f32, f32)> {
    let inner = board_inner_rect(area, cfg);
    if col < inner.x
        || row < inner.y
        || col >= inner.x + inner.width
        || row >= inner.y + inner.height
    {
        return None;
    }
    let fx = f32::from(col - inner.x) / f32::from(TILE_COLS);
    let fy = f32::from(row - inner.y) / f32::from(TILE_ROWS);
    Some((
        cfg.offset_x + fx * cfg.cell_size,
        cfg.offset_y + fy * cfg.cell_size,
    ))
}

/// Blend a tile colour toward the background by alpha (255 = opaque).
fn blend(fg: Color, bg: Color, alpha: u8) -> Color {
    let (fr, fg_, fb) = rgb(fg);
    let (br, bg_, bb) = rgb(bg);
    let a = f32::from(alpha) / 255.0;
    let mix = |f: u8, b: u8| (f32::from(f) * a + f32::from(b) * (1.0 - a)).round() as u8;
    Color::Rgb(mix(fr, br), mix(fg_, bg_), mix(fb, bb))
}

fn rgb(c: Color) -> (u8, u8, u8) {
    match c {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::White => (255, 255, 255),
        Color::Black => (0, 0, 0),
        _ => (128, 128, 128),
    }
}

/// Draw the current screen. Game-over transitions own a tachyonfx fade
/// over the board; `game_over_effect` holds it between frames.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    cursor: (usize, usize),
    popups: &[Popup],
    bursts: &[Burst],
    menu: &MenuState,
    store: &HighScoreStore,
    quit_selected: Option<QuitOption>,
    new_record: bool,
    game_over_effect: &mut Option<Effect>,
    effect_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu, store, area),
        Screen::Playing => {
            draw_game(frame, state, theme, cursor, popups, bursts, store, area);
        }
        Screen::QuitMenu => {
            draw_game(frame, state, theme, cursor, popups, bursts, store, area);
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
        Screen::GameOver => {
            draw_game(frame, state, theme, cursor, popups, bursts, store, area);
            if !no_animation {
                apply_game_over_fade(frame, state, theme, area, game_over_effect, effect_time, now);
            }
            draw_game_over(frame, state, theme, store, new_record, area);
        }
    }
}

/// Fade the board toward the background when the session ends.
fn apply_game_over_fade(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    effect: &mut Option<Effect>,
    effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_inner_rect(area, &state.grid.cfg);
    let delta = effect_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    *effect_time = Some(now);

    if effect.is_none() {
        let cells: HashSet<(u16, u16)> = (board.y..board.y + board.height)
            .flat_map(|y| (board.x..board.x + board.width).map(move |x| (x, y)))
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            cells.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let fade = fx::fade_to(bg, bg, (GAME_OVER_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *effect = Some(fade);
    }
    if let Some(e) = effect {
        frame.render_effect(e, board, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_menu(
    frame: &mut Frame,
    theme: &Theme,
    menu: &MenuState,
    store: &HighScoreStore,
    area: Rect,
) {
    let popup_w = 44u16;
    let popup_h = 20u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" match ", Style::default().fg(theme.tile_color(0)).bold()),
        Span::styled(" tui ", Style::default().fg(theme.main_fg).bold()),
    ]);

    let highlight_style = Style::default().fg(Color::Black).bg(theme.title).bold();
    let normal_style = Style::default().fg(theme.main_fg);

    let limit = TIME_LIMITS[menu.limit_idx];
    let limit_spans: Vec<Span> = TIME_LIMITS
        .iter()
        .enumerate()
        .flat_map(|(i, &secs)| {
            let label = format!(" {secs}s ");
            let style = if i == menu.limit_idx {
                highlight_style
            } else {
                normal_style
            };
            vec![Span::styled(label, style), Span::from("  ")]
        })
        .collect();

    let mut lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(
            " ─ TIME LIMIT ─ ",
            Style::default().fg(theme.div_line),
        )),
        Line::from(limit_spans),
        Line::from(""),
        Line::from(Span::styled(
            " ─ BEST SCORES ─ ",
            Style::default().fg(theme.div_line),
        )),
    ];
    let top = store.top_n(limit, 5);
    if top.is_empty() {
        lines.push(Line::from(Span::styled(" no scores yet ", normal_style)));
    } else {
        for (i, entry) in top.iter().enumerate() {
            lines.push(Line::from(Span::styled(
                format!(" {}. {:<10} {:>6} ", i + 1, entry.player, entry.score),
                normal_style,
            )));
        }
    }
    lines.extend([
        Line::from(""),
        Line::from(Span::styled(" [ ENTER ] PLAY ", highlight_style)),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↔ ", Style::default().fg(theme.title)),
            Span::from("TIME LIMIT   "),
            Span::styled(" Q ", Style::default().fg(theme.title)),
            Span::from("QUIT"),
        ]),
    ]);

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

/// Board + sidebar, centred in the terminal.
fn draw_game(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    cursor: (usize, usize),
    popups: &[Popup],
    bursts: &[Burst],
    store: &HighScoreStore,
    area: Rect,
) {
    // Board placement is derived from board_inner_rect so rendering and
    // mouse mapping always agree.
    let (bw, bh) = board_outer_size(&state.grid.cfg);
    let inner = board_inner_rect(area, &state.grid.cfg);
    let board_area = Rect {
        x: inner.x.saturating_sub(1),
        y: inner.y.saturating_sub(1),
        width: bw.min(area.width),
        height: bh.min(area.height),
    };
    let sidebar_area = Rect {
        x: board_area.x + board_area.width,
        y: board_area.y,
        width: SIDEBAR_WIDTH.min(area.width.saturating_sub(board_area.width)),
        height: bh.min(area.height),
    };

    draw_board(frame, state, theme, cursor, popups, bursts, board_area);
    draw_sidebar(frame, state, theme, store, sidebar_area);
}

fn draw_board(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    cursor: (usize, usize),
    popups: &[Popup],
    bursts: &[Burst],
    board_area: Rect,
) {
    let mins = (state.time_left as u32) / 60;
    let secs = (state.time_left as u32) % 60;
    let title = format!(" matchtui  {mins:02}:{secs:02} ");
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)));
    let inner = block.inner(board_area);
    block.render(board_area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    for y in inner.y..inner.y + inner.height {
        for x in inner.x..inner.x + inner.width {
            buf[(x, y)].set_symbol(" ").set_bg(theme.bg);
        }
    }

    let cfg = state.grid.cfg;
    let highlight = state.highlighted();
    let blink_on = highlight.is_some_and(|(_, timer)| ((timer * 8.0) as u32) % 2 == 0);

    for row in 0..state.grid.size() {
        for col in 0..state.grid.size() {
            let Some(tile) = state.grid.get(row, col) else {
                continue;
            };
            // Animated sub-cell position: draw coords in pixels to
            // terminal cells via the tile scale.
            let tx = inner.x as f32 + tile.draw.0 / cfg.cell_size * f32::from(TILE_COLS);
            let ty = inner.y as f32 + tile.draw.1 / cfg.cell_size * f32::from(TILE_ROWS);

            let highlighted =
                highlight.is_some_and(|(cells, _)| cells.contains(&(row, col)));
            let color = if highlighted && blink_on {
                theme.highlight
            } else {
                blend(theme.tile_color(tile.kind.color_index()), theme.bg, tile.alpha)
            };

            for dy in 0..TILE_ROWS {
                for dx in 0..TILE_COLS {
                    let rx = (tx + f32::from(dx)).round();
                    let ry = (ty + f32::from(dy)).round();
                    if rx < f32::from(inner.x) || ry < f32::from(inner.y) {
                        continue;
                    }
                    let (rx, ry) = (rx as u16, ry as u16);
                    if rx < inner.x + inner.width && ry < inner.y + inner.height {
                        // Inner 2x1 core is solid, rim is dimmer, so
                        // adjacent same-coloured tiles stay separable.
                        let rim = dx == 0 || dx == TILE_COLS - 1;
                        let symbol = if rim { "▓" } else { "█" };
                        buf[(rx, ry)]
                            .set_symbol(symbol)
                            .set_style(Style::default().fg(color).bg(theme.bg));
                    }
                }
            }
        }
    }

    // Keyboard cursor: dim corner ticks.
    draw_cell_ring(buf, inner, cursor, theme.inactive_fg);
    // Selection ring wins over the cursor.
    if let Some(sel) = state.selected {
        draw_cell_ring(buf, inner, sel, theme.selection);
    }

    for burst in bursts {
        let (rx, ry) = pixel_to_terminal(inner, &cfg, burst.x, burst.y);
        if inner.contains(Position::new(rx, ry)) {
            let color = theme.tile_color(burst.color.color_index());
            buf[(rx, ry)]
                .set_symbol("✦")
                .set_style(Style::default().fg(color).bg(theme.bg));
        }
    }

    for popup in popups {
        let rise = (popup.age_ms / 150) as u16;
        let (rx, ry) = pixel_to_terminal(inner, &cfg, popup.x, popup.y);
        let ry = ry.saturating_sub(rise).max(inner.y);
        let label = format!("+{}", popup.amount);
        if inner.contains(Position::new(rx, ry)) {
            buf.set_string(
                rx.min(inner.x + inner.width.saturating_sub(label.len() as u16)),
                ry,
                label,
                Style::default().fg(theme.title).bg(theme.bg).bold(),
            );
        }
    }
}

fn pixel_to_terminal(inner: Rect, cfg: &BoardConfig, px: f32, py: f32) -> (u16, u16) {
    let fx = (px - cfg.offset_x) / cfg.cell_size * f32::from(TILE_COLS);
    let fy = (py - cfg.offset_y) / cfg.cell_size * f32::from(TILE_ROWS);
    (
        (f32::from(inner.x) + fx).round().max(0.0) as u16,
        (f32::from(inner.y) + fy).round().max(0.0) as u16,
    )
}

/// Corner ticks around one grid cell.
fn draw_cell_ring(
    buf: &mut ratatui::buffer::Buffer,
    inner: Rect,
    cell: (usize, usize),
    color: Color,
) {
    let (row, col) = cell;
    let x0 = inner.x + col as u16 * TILE_COLS;
    let y0 = inner.y + row as u16 * TILE_ROWS;
    let x1 = x0 + TILE_COLS - 1;
    let y1 = y0 + TILE_ROWS - 1;
    let style = Style::default().fg(color).bold();
    for (x, y, sym) in [(x0, y0, "┌"), (x1, y0, "┐"), (x0, y1, "└"), (x1, y1, "┘")] {
        if x < inner.x + inner.width && y < inner.y + inner.height {
            buf[(x, y)].set_symbol(sym).set_style(style);
        }
    }
}

fn draw_sidebar(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    store: &HighScoreStore,
    area: Rect,
) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // score + best
            Constraint::Length(1),
            Constraint::Length(4), // time gauge
            Constraint::Length(1),
            Constraint::Length(6), // controls
        ])
        .split(area);

    let best = store.best_score(state.time_limit as u32);
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best:  ", title_style),
            Span::styled(best.to_string(), fg_style),
        ]),
    ])
    .render(stats_inner, frame.buffer_mut());

    let time_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let time_inner = time_block.inner(chunks[2]);
    time_block.render(chunks[2], frame.buffer_mut());
    let ratio = if state.time_limit > 0.0 {
        f64::from(state.time_left / state.time_limit).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let bar_color = if ratio > 0.5 {
        Color::Green
    } else if ratio > 0.2 {
        Color::Yellow
    } else {
        Color::Red
    };
    let time_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(time_inner);
    Paragraph::new(Line::from(Span::styled("Time", title_style)))
        .render(time_layout[0], frame.buffer_mut());
    Gauge::default()
        .ratio(ratio)
        .label(format!("{:.0}s", state.time_left))
        .gauge_style(Style::default().fg(bar_color))
        .render(time_layout[1], frame.buffer_mut());

    let help_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let help_inner = help_block.inner(chunks[4]);
    help_block.render(chunks[4], frame.buffer_mut());
    Paragraph::new(vec![
        Line::from(Span::styled("click/enter: pick", fg_style)),
        Line::from(Span::styled("arrows/hjkl: move", fg_style)),
        Line::from(Span::styled("esc: deselect", fg_style)),
        Line::from(Span::styled("q: quit", fg_style)),
    ])
    .render(help_inner, frame.buffer_mut());
}

fn draw_game_over(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    store: &HighScoreStore,
    new_record: bool,
    area: Rect,
) {
    let popup_w = 32u16;
    let popup_h = 11u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let best = store.best_score(state.time_limit as u32);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Time's up! ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", state.score), Style::default().fg(theme.main_fg))),
        Line::from(Span::styled(format!(" Best:  {best} "), Style::default().fg(theme.main_fg))),
    ];
    if new_record {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R — Again   M — Menu   Q — Quit ",
        Style::default().fg(theme.main_fg),
    )));

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" matchtui ", Style::default().fg(theme.title))),
    );
    // Solid background so the faded board doesn't bleed through.
    for y in popup.y..popup.y + popup.height {
        for x in popup.x..popup.x + popup.width {
            frame.buffer_mut()[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }
    p.render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24;
    let qh = 8;
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw,
        height: qh,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    for y in quit_rect.y..quit_rect.y + quit_rect.height {
        for x in quit_rect.x..quit_rect.x + quit_rect.width {
            frame.buffer_mut()[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];
    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        frame.buffer_mut().set_string(rx, ry, label, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_to_pixel_roundtrip() {
        let cfg = BoardConfig::default();
        let area = Rect::new(0, 0, 120, 40);
        let inner = board_inner_rect(area, &cfg);
        // Terminal cell in the middle of grid cell (2, 3).
        let col = inner.x + 3 * TILE_COLS + 1;
        let row = inner.y + 2 * TILE_ROWS + 1;
        let (px, py) = mouse_to_pixel(area, &cfg, col, row).unwrap();
        let gx = ((px - cfg.offset_x) / cfg.cell_size) as usize;
        let gy = ((py - cfg.offset_y) / cfg.cell_size) as usize;
        assert_eq!((gy, gx), (2, 3));
    }

    #[test]
    fn test_mouse_outside_board_is_none() {
        let cfg = BoardConfig::default();
        let area = Rect::new(0, 0, 120, 40);
        assert!(mouse_to_pixel(area, &cfg, 0, 0).is_none());
    }

    #[test]
    fn test_blend_endpoints() {
        let fg = Color::Rgb(200, 100, 0);
        let bg = Color::Rgb(40, 44, 52);
        assert_eq!(blend(fg, bg, 255), fg);
        assert_eq!(blend(fg, bg, 0), bg);
    }
}
